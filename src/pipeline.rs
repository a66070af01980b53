//! Governance Pipeline
//!
//! Orchestrates the governance components as an ordered chain of lifecycle
//! hooks around the external query executor. Ordering, front to back:
//! metrics start-time wrap, persisted-query source resolution, rate limiter
//! (reject before any cost is spent), cost estimator (reject before
//! execution), response-cache lookup (short-circuit before execution), the
//! executor, cache store, rate-limit success refund, metrics record.
//!
//! A rejection short-circuits all downstream hooks for that request.
//! Upstream side effects are not rolled back: a rejected request has still
//! consumed its rate-limit increment, and its source text has still been
//! registered with the persisted-query registry.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::cache::{ResponseCache, AGE_HEADER, CACHE_CONTROL_HEADER};
use crate::config::GovernanceConfig;
use crate::cost::{CostEstimator, CostResult, SchemaMeta};
use crate::error::GovernanceError;
use crate::executor::{QueryExecutor, ResolvedRequest};
use crate::metrics::MetricsAggregator;
use crate::persisted::{PersistedLookup, PersistedQueryRegistry};
use crate::rate_limit::RateLimiter;
use crate::request::{
    Document, GovernanceRequest, GovernanceResponse, PersistedQueryExtension,
};

/// The ordered governance hook chain around one query executor.
///
/// A `Clone` handle over shared component state; all tables live for the
/// process lifetime and are rebuilt empty on startup.
#[derive(Clone)]
pub struct GovernancePipeline {
    estimator: CostEstimator,
    schema: Arc<SchemaMeta>,
    limiter: RateLimiter,
    cache: ResponseCache,
    persisted: PersistedQueryRegistry,
    metrics: MetricsAggregator,
    executor: Arc<dyn QueryExecutor>,
}

impl GovernancePipeline {
    /// Create a pipeline with fresh component state
    pub fn new(
        config: GovernanceConfig,
        schema: SchemaMeta,
        executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        Self {
            estimator: CostEstimator::new(config.cost),
            schema: Arc::new(schema),
            limiter: RateLimiter::new(config.rate_limit),
            cache: ResponseCache::new(config.cache),
            persisted: PersistedQueryRegistry::new(config.persisted),
            metrics: MetricsAggregator::new(config.metrics),
            executor,
        }
    }

    /// The metrics aggregate
    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    /// The response cache
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// The rate limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The persisted-query registry
    pub fn persisted(&self) -> &PersistedQueryRegistry {
        &self.persisted
    }

    /// Run one request through the full hook chain.
    ///
    /// Admission rejections surface as the response's error list, carrying
    /// their code and diagnostic payload; they are never retried here.
    pub async fn handle(&self, request: GovernanceRequest) -> GovernanceResponse {
        let started = Instant::now();
        let identity = self.limiter.identity(&request.headers);
        let operation_name = request.operation_name.clone();

        // Source resolution: registration plus APQ lookup, before anything
        // downstream sees the text.
        let lookup = self
            .on_source_resolved(request.query.as_deref(), request.persisted_query())
            .await;
        let was_substituted = lookup.was_substituted;
        let query = if was_substituted {
            lookup.resolved_text
        } else {
            request.query.clone()
        };

        // Operation resolved: admit or reject before execution.
        if let Err(error) = self
            .on_operation_resolved(&identity, request.document.as_ref())
            .await
        {
            warn!(
                request_id = %request.id,
                code = error.code(),
                "request rejected"
            );
            let mut response = GovernanceResponse::from_error(error.into());
            self.on_response_ready(&identity, operation_name.as_deref(), started, None, &mut response)
                .await;
            return response;
        }

        let cache_key = request.read_only.then(|| {
            ResponseCache::key(
                query.as_deref(),
                request.variables.as_ref(),
                operation_name.as_deref(),
            )
        });

        // Response-for-operation: short-circuit from cache when possible.
        if let Some(mut response) = self.on_response_requested(cache_key.as_deref()).await {
            debug!(request_id = %request.id, "served from response cache");
            self.on_response_ready(&identity, operation_name.as_deref(), started, None, &mut response)
                .await;
            return response;
        }

        let resolved = ResolvedRequest {
            request_id: request.id,
            query,
            operation_name: operation_name.clone(),
            variables: request.variables.clone(),
            document: request.document.clone(),
            was_substituted,
        };
        let reply = self.executor.execute(&resolved).await;

        let mut response = GovernanceResponse {
            data: reply.data,
            errors: reply.errors,
            headers: HashMap::new(),
        };
        self.on_response_ready(
            &identity,
            operation_name.as_deref(),
            started,
            cache_key.as_deref(),
            &mut response,
        )
        .await;
        response
    }

    /// Source-resolution hook: register provided text, then resolve any
    /// APQ extension. Substitution of the resolved text into the request
    /// is the caller's (or [`Self::handle`]'s) responsibility.
    pub async fn on_source_resolved(
        &self,
        query: Option<&str>,
        extension: Option<&PersistedQueryExtension>,
    ) -> PersistedLookup {
        if let Some(text) = query {
            self.persisted.register(text).await;
        }
        self.persisted.lookup(extension, query).await
    }

    /// Operation-resolution hook: rate-limit admission, then cost
    /// enforcement over the parsed selection tree. Requests without a
    /// document (hash-only requests the transport has not re-parsed yet)
    /// skip estimation.
    pub async fn on_operation_resolved(
        &self,
        identity: &str,
        document: Option<&Document>,
    ) -> Result<Option<CostResult>, GovernanceError> {
        self.limiter.admit(identity).await?;

        let Some(document) = document else {
            return Ok(None);
        };
        let result = self.estimator.estimate(document, &self.schema);
        self.metrics.record_cost(result.cost).await;
        self.estimator.check(result)?;
        Ok(Some(result))
    }

    /// Response-requested hook: look the key up in the cache. A hit
    /// returns a complete short-circuit response carrying cache metadata
    /// headers; a miss (with a key present) records the miss and returns
    /// `None` so execution proceeds.
    pub async fn on_response_requested(
        &self,
        cache_key: Option<&str>,
    ) -> Option<GovernanceResponse> {
        let key = cache_key?;
        match self.cache.lookup(key).await {
            Some(hit) => {
                self.metrics.record_cache_outcome(true).await;
                let mut response = GovernanceResponse::ok(hit.data);
                response.headers.insert(
                    CACHE_CONTROL_HEADER.to_string(),
                    format!("max-age={}", self.cache.ttl_seconds()),
                );
                response
                    .headers
                    .insert(AGE_HEADER.to_string(), hit.age_seconds.to_string());
                Some(response)
            }
            None => {
                self.metrics.record_cache_outcome(false).await;
                None
            }
        }
    }

    /// Response-ready hook: store cacheable results, refund quota for
    /// error-free responses when configured, and record the request's
    /// metrics. Results accompanied by a non-empty error list are never
    /// stored. `cache_key` is `None` for responses that must not be
    /// (re-)stored: rejections and cache hits.
    pub async fn on_response_ready(
        &self,
        identity: &str,
        operation_name: Option<&str>,
        started: Instant,
        cache_key: Option<&str>,
        response: &mut GovernanceResponse,
    ) {
        if response.is_success() {
            if let Some(key) = cache_key {
                let data = response.data.clone().unwrap_or(Value::Null);
                self.cache.store(key.to_string(), data).await;
                response.headers.insert(
                    CACHE_CONTROL_HEADER.to_string(),
                    format!("max-age={}", self.cache.ttl_seconds()),
                );
            }
            self.limiter.release_on_success(identity).await;
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        self.metrics
            .record_request(
                operation_name,
                duration_ms,
                response.is_success(),
                &response.errors,
            )
            .await;
    }
}
