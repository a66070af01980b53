//! Metrics Aggregator
//!
//! A single shared aggregate, updated incrementally as requests complete
//! and read through deep-copied snapshots so callers can never mutate
//! aggregator-internal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

use crate::request::ResponseError;

/// Metrics configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Interval between logged reports in milliseconds; 0 disables the
    /// reporter entirely (embedded/serverless deployments)
    pub log_interval_ms: u64,
}

/// Per-operation running statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationStats {
    /// Requests seen for this operation
    pub count: u64,

    /// Cumulative duration in milliseconds
    pub total_duration_ms: u64,
}

impl OperationStats {
    /// Derived average duration in milliseconds
    pub fn average_duration_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_duration_ms as f64 / self.count as f64
        }
    }
}

#[derive(Debug, Default)]
struct MetricsInner {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    total_duration_ms: u64,
    cache_hits: u64,
    cache_misses: u64,
    cost_sum: u64,
    cost_count: u64,
    operations: HashMap<String, OperationStats>,
    errors_by_code: HashMap<String, u64>,
}

/// Point-in-time copy of the aggregate
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Total requests recorded
    pub total_requests: u64,

    /// Requests that completed without errors
    pub successful_requests: u64,

    /// Requests that completed with errors (including rejections)
    pub failed_requests: u64,

    /// Cumulative request duration in milliseconds
    pub total_duration_ms: u64,

    /// Derived average duration in milliseconds
    pub average_duration_ms: f64,

    /// Cache hits recorded
    pub cache_hits: u64,

    /// Cache misses recorded
    pub cache_misses: u64,

    /// Derived average declared query cost
    pub average_cost: f64,

    /// Per-operation statistics, keyed by operation name
    pub operations: HashMap<String, OperationStats>,

    /// Error counts bucketed by extension code
    pub errors_by_code: HashMap<String, u64>,

    /// When this aggregator started observing
    pub started_at: DateTime<Utc>,
}

impl MetricsSnapshot {
    /// Cache hit rate in percent, 0 when nothing was recorded
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64 * 100.0
        }
    }
}

/// Shared request-metrics aggregate
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    config: MetricsConfig,
    inner: Arc<RwLock<MetricsInner>>,
    started_at: DateTime<Utc>,
}

impl MetricsAggregator {
    /// Create an aggregator with the given configuration
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            inner: Arc::new(RwLock::new(MetricsInner::default())),
            started_at: Utc::now(),
        }
    }

    /// Create an aggregator with defaults (reporter disabled)
    pub fn default_config() -> Self {
        Self::new(MetricsConfig::default())
    }

    /// Record one completed request.
    ///
    /// Unnamed operations count in the totals but are not tracked
    /// per-operation. Errors are bucketed by their extension code,
    /// `UNKNOWN` when absent.
    pub async fn record_request(
        &self,
        operation_name: Option<&str>,
        duration_ms: u64,
        succeeded: bool,
        errors: &[ResponseError],
    ) {
        let mut inner = self.inner.write().await;

        inner.total_requests += 1;
        inner.total_duration_ms += duration_ms;
        if succeeded {
            inner.successful_requests += 1;
        } else {
            inner.failed_requests += 1;
        }

        if let Some(name) = operation_name {
            let stats = inner.operations.entry(name.to_string()).or_default();
            stats.count += 1;
            stats.total_duration_ms += duration_ms;
        }

        for error in errors {
            *inner
                .errors_by_code
                .entry(error.code().to_string())
                .or_insert(0) += 1;
        }
    }

    /// Record a cache hit or miss
    pub async fn record_cache_outcome(&self, hit: bool) {
        let mut inner = self.inner.write().await;
        if hit {
            inner.cache_hits += 1;
        } else {
            inner.cache_misses += 1;
        }
    }

    /// Record one declared query cost
    pub async fn record_cost(&self, cost: u64) {
        let mut inner = self.inner.write().await;
        inner.cost_sum += cost;
        inner.cost_count += 1;
    }

    /// Deep-copied point-in-time snapshot
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read().await;

        let average_duration_ms = if inner.total_requests == 0 {
            0.0
        } else {
            inner.total_duration_ms as f64 / inner.total_requests as f64
        };
        let average_cost = if inner.cost_count == 0 {
            0.0
        } else {
            inner.cost_sum as f64 / inner.cost_count as f64
        };

        MetricsSnapshot {
            total_requests: inner.total_requests,
            successful_requests: inner.successful_requests,
            failed_requests: inner.failed_requests,
            total_duration_ms: inner.total_duration_ms,
            average_duration_ms,
            cache_hits: inner.cache_hits,
            cache_misses: inner.cache_misses,
            average_cost,
            operations: inner.operations.clone(),
            errors_by_code: inner.errors_by_code.clone(),
            started_at: self.started_at,
        }
    }

    /// Human-readable report: uptime, totals, hit rate, average cost, the
    /// five busiest operations, and error buckets.
    pub async fn formatted_report(&self) -> String {
        let snapshot = self.snapshot().await;
        let uptime_seconds = (Utc::now() - snapshot.started_at).num_seconds().max(0);

        let mut top: Vec<(&String, &OperationStats)> = snapshot.operations.iter().collect();
        top.sort_by(|a, b| b.1.count.cmp(&a.1.count));

        let mut report = String::new();
        let _ = writeln!(report, "request governance metrics");
        let _ = writeln!(report, "  uptime: {uptime_seconds}s");
        let _ = writeln!(report, "  total requests: {}", snapshot.total_requests);
        let _ = writeln!(report, "  successful: {}", snapshot.successful_requests);
        let _ = writeln!(report, "  failed: {}", snapshot.failed_requests);
        let _ = writeln!(
            report,
            "  avg duration: {:.2}ms",
            snapshot.average_duration_ms
        );
        let _ = writeln!(
            report,
            "  cache hit rate: {:.2}%",
            snapshot.cache_hit_rate()
        );
        let _ = writeln!(report, "  avg query cost: {:.2}", snapshot.average_cost);

        let _ = writeln!(report, "  top operations:");
        if top.is_empty() {
            let _ = writeln!(report, "    (none)");
        }
        for (name, stats) in top.into_iter().take(5) {
            let _ = writeln!(
                report,
                "    {name}: {} requests (avg {:.2}ms)",
                stats.count,
                stats.average_duration_ms()
            );
        }

        let _ = writeln!(report, "  errors by code:");
        if snapshot.errors_by_code.is_empty() {
            let _ = writeln!(report, "    (none)");
        }
        for (code, count) in &snapshot.errors_by_code {
            let _ = writeln!(report, "    {code}: {count}");
        }

        report
    }

    /// Spawn the periodic reporter task, when configured.
    ///
    /// Returns `None` with `log_interval_ms == 0`. The returned handle
    /// aborts the task when dropped by the caller via `JoinHandle::abort`.
    pub fn spawn_reporter(&self) -> Option<JoinHandle<()>> {
        if self.config.log_interval_ms == 0 {
            return None;
        }

        let aggregator = self.clone();
        let interval = Duration::from_millis(self.config.log_interval_ms);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so reports start
            // one interval in.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let report = aggregator.formatted_report().await;
                info!("{report}");
            }
        }))
    }

    /// Restore the zero state
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        *inner = MetricsInner::default();
    }
}
