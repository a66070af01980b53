//! Governance Pipeline Integration Tests
//!
//! End-to-end coverage of the hook chain around a mock executor: cache
//! short-circuiting, admission rejections, persisted-query substitution,
//! and quota refunds.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use gatewarden::{
    CacheConfig, CostConfig, Document, ExecutorReply, GovernanceConfig, GovernancePipeline,
    GovernanceRequest, PersistedQueryExtension, PersistedQueryRegistry, QueryExecutor,
    RateLimitConfig, ResolvedRequest, ResponseError, SchemaMeta, Selection,
};

/// Mock executor that counts invocations, remembers the last resolved
/// request, and replies with a configurable outcome.
struct MockExecutor {
    calls: AtomicUsize,
    last_request: Mutex<Option<ResolvedRequest>>,
    fail: bool,
}

impl MockExecutor {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            fail: true,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn last_request(&self) -> Option<ResolvedRequest> {
        self.last_request.lock().await.clone()
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn execute(&self, request: &ResolvedRequest) -> ExecutorReply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().await = Some(request.clone());

        if self.fail {
            ExecutorReply::failed(ResponseError::new("upstream unavailable"))
        } else {
            ExecutorReply::ok(json!({"users": [{"id": 1}]}))
        }
    }
}

fn pipeline(config: GovernanceConfig, executor: Arc<MockExecutor>) -> GovernancePipeline {
    GovernancePipeline::new(config, SchemaMeta::new().list_field("users"), executor)
}

fn read_request(query: &str) -> GovernanceRequest {
    GovernanceRequest::new()
        .with_query(query)
        .with_operation_name("ListUsers")
        .read_only()
        .with_header("x-real-ip", "203.0.113.9")
}

#[tokio::test]
async fn identical_read_requests_execute_once() -> Result<()> {
    let executor = MockExecutor::new();
    let pipeline = pipeline(GovernanceConfig::default(), executor.clone());

    let first = pipeline.handle(read_request("{ users { id } }")).await;
    let second = pipeline.handle(read_request("{ users { id } }")).await;

    assert!(first.is_success());
    assert!(second.is_success());
    assert_eq!(first.data, second.data);
    assert_eq!(executor.calls(), 1);

    // The cached reply carries cache metadata headers.
    assert_eq!(
        second.headers.get("cache-control").map(String::as_str),
        Some("max-age=300")
    );
    assert!(second.headers.contains_key("age"));

    let snapshot = pipeline.metrics().snapshot().await;
    assert_eq!(snapshot.cache_hits, 1);
    assert_eq!(snapshot.cache_misses, 1);
    Ok(())
}

#[tokio::test]
async fn expired_cache_entry_re_executes() -> Result<()> {
    let executor = MockExecutor::new();
    let config = GovernanceConfig {
        cache: CacheConfig {
            ttl_seconds: 1,
            max_size: 100,
        },
        ..GovernanceConfig::default()
    };
    let pipeline = pipeline(config, executor.clone());

    pipeline.handle(read_request("{ users { id } }")).await;
    pipeline.handle(read_request("{ users { id } }")).await;
    assert_eq!(executor.calls(), 1);

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    pipeline.handle(read_request("{ users { id } }")).await;
    assert_eq!(executor.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn distinct_variables_do_not_share_cache_entries() -> Result<()> {
    let executor = MockExecutor::new();
    let pipeline = pipeline(GovernanceConfig::default(), executor.clone());

    pipeline
        .handle(read_request("{ users { id } }").with_variables(json!({"page": 1})))
        .await;
    pipeline
        .handle(read_request("{ users { id } }").with_variables(json!({"page": 2})))
        .await;

    assert_eq!(executor.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn failed_executions_are_never_cached() -> Result<()> {
    let executor = MockExecutor::failing();
    let pipeline = pipeline(GovernanceConfig::default(), executor.clone());

    let response = pipeline.handle(read_request("{ users { id } }")).await;
    assert!(!response.is_success());
    assert!(pipeline.cache().is_empty().await);

    // Still a miss the second time: the failure re-executes.
    pipeline.handle(read_request("{ users { id } }")).await;
    assert_eq!(executor.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn fourth_request_in_window_is_rejected() -> Result<()> {
    let executor = MockExecutor::new();
    let config = GovernanceConfig {
        rate_limit: RateLimitConfig {
            max: 3,
            window_ms: 60_000,
            ..RateLimitConfig::default()
        },
        ..GovernanceConfig::default()
    };
    let pipeline = pipeline(config, executor.clone());

    let request = || {
        GovernanceRequest::new()
            .with_query("{ users { id } }")
            .with_header("x-forwarded-for", "1.2.3.4, 10.0.0.1")
    };

    for _ in 0..3 {
        assert!(pipeline.handle(request()).await.is_success());
    }

    let rejected = pipeline.handle(request()).await;
    assert!(!rejected.is_success());
    let error = &rejected.errors[0];
    assert_eq!(error.code(), "RATE_LIMIT_EXCEEDED");

    let retry_after = error.extensions["retryAfter"].as_u64().unwrap();
    assert!(retry_after <= 60);
    assert_eq!(error.extensions["limit"], json!(3));
    assert_eq!(error.extensions["windowMs"], json!(60_000));

    // The rejected request never reached the executor.
    assert_eq!(executor.calls(), 3);
    Ok(())
}

#[tokio::test]
async fn successful_requests_refund_quota_when_configured() -> Result<()> {
    let executor = MockExecutor::new();
    let config = GovernanceConfig {
        rate_limit: RateLimitConfig {
            max: 1,
            window_ms: 60_000,
            skip_successful_requests: true,
            ..RateLimitConfig::default()
        },
        ..GovernanceConfig::default()
    };
    let pipeline = pipeline(config, executor);

    // Each success refunds its admission, so the limit of 1 never trips.
    for _ in 0..5 {
        let response = pipeline
            .handle(GovernanceRequest::new().with_query("{ users { id } }"))
            .await;
        assert!(response.is_success());
    }
    Ok(())
}

#[tokio::test]
async fn costly_query_is_rejected_before_execution() -> Result<()> {
    let executor = MockExecutor::new();
    let config = GovernanceConfig {
        cost: CostConfig {
            maximum_cost: 20,
            ..CostConfig::default()
        },
        ..GovernanceConfig::default()
    };
    let strict = pipeline(config, executor.clone());

    // users is list-typed: 1 + 10*(1+1) = 21 > 20.
    let document = Document::new(vec![Selection::object(
        "users",
        vec![Selection::field("id"), Selection::field("name")],
    )]);
    let response = strict
        .handle(
            GovernanceRequest::new()
                .with_query("{ users { id name } }")
                .with_document(document.clone()),
        )
        .await;

    assert!(!response.is_success());
    let error = &response.errors[0];
    assert_eq!(error.code(), "QUERY_COST_EXCEEDED");
    assert_eq!(error.extensions["cost"], json!(21));
    assert_eq!(error.extensions["maximumCost"], json!(20));
    assert_eq!(executor.calls(), 0);

    // The same query clears a ceiling of 21.
    let config = GovernanceConfig {
        cost: CostConfig {
            maximum_cost: 21,
            ..CostConfig::default()
        },
        ..GovernanceConfig::default()
    };
    let lenient = pipeline(config, executor.clone());
    let response = lenient
        .handle(
            GovernanceRequest::new()
                .with_query("{ users { id name } }")
                .with_document(document),
        )
        .await;
    assert!(response.is_success());
    assert_eq!(executor.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn persisted_query_round_trip_substitutes_text() -> Result<()> {
    let executor = MockExecutor::new();
    let pipeline = pipeline(GovernanceConfig::default(), executor.clone());

    // Phase 1: a full-text request registers the query.
    let query = "{ users { id name } }";
    pipeline
        .handle(GovernanceRequest::new().with_query(query))
        .await;

    // Phase 2: a hash-only request resolves and executes the stored text.
    let hash = PersistedQueryRegistry::hash_query(query);
    let response = pipeline
        .handle(
            GovernanceRequest::new().with_persisted_query(PersistedQueryExtension {
                version: 1,
                sha256_hash: Some(hash),
            }),
        )
        .await;

    assert!(response.is_success());
    let resolved = executor.last_request().await.unwrap();
    assert!(resolved.was_substituted);
    assert_eq!(resolved.query.as_deref(), Some(query));
    Ok(())
}

#[tokio::test]
async fn unsupported_persisted_version_is_silent_noop() -> Result<()> {
    let executor = MockExecutor::new();
    let pipeline = pipeline(GovernanceConfig::default(), executor.clone());

    let query = "{ users { id } }";
    pipeline
        .handle(GovernanceRequest::new().with_query(query))
        .await;

    let hash = PersistedQueryRegistry::hash_query(query);
    pipeline
        .handle(
            GovernanceRequest::new().with_persisted_query(PersistedQueryExtension {
                version: 2,
                sha256_hash: Some(hash),
            }),
        )
        .await;

    // No substitution happened; the executor saw no query text.
    let resolved = executor.last_request().await.unwrap();
    assert!(!resolved.was_substituted);
    assert!(resolved.query.is_none());
    Ok(())
}

#[tokio::test]
async fn metrics_observe_the_whole_pipeline() -> Result<()> {
    let executor = MockExecutor::new();
    let pipeline = pipeline(GovernanceConfig::default(), executor);

    let document = Document::new(vec![Selection::object(
        "users",
        vec![Selection::field("id")],
    )]);
    pipeline
        .handle(read_request("{ users { id } }").with_document(document))
        .await;
    pipeline.handle(read_request("{ users { id } }")).await;

    let snapshot = pipeline.metrics().snapshot().await;
    assert_eq!(snapshot.total_requests, 2);
    assert_eq!(snapshot.successful_requests, 2);
    assert_eq!(snapshot.cache_hits, 1);
    assert_eq!(snapshot.operations["ListUsers"].count, 2);
    // One estimated request: users list at 1 + 10*1 = 11.
    assert!((snapshot.average_cost - 11.0).abs() < f64::EPSILON);
    Ok(())
}
