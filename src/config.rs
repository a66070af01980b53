//! Governance Configuration
//!
//! Aggregated configuration for every pipeline component, with environment
//! variable overrides under the `GATEWARDEN_` prefix. Unparseable or
//! missing variables fall back to defaults silently.

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::cost::CostConfig;
use crate::metrics::MetricsConfig;
use crate::persisted::PersistedQueryConfig;
use crate::rate_limit::RateLimitConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Cost estimator configuration
    pub cost: CostConfig,

    /// Rate limiter configuration
    pub rate_limit: RateLimitConfig,

    /// Response cache configuration
    pub cache: CacheConfig,

    /// Persisted-query registry configuration
    pub persisted: PersistedQueryConfig,

    /// Metrics aggregator configuration
    pub metrics: MetricsConfig,
}

impl GovernanceConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        read_env("GATEWARDEN_MAXIMUM_COST", &mut config.cost.maximum_cost);
        read_env("GATEWARDEN_DEFAULT_COST", &mut config.cost.default_cost);
        read_env("GATEWARDEN_SCALAR_COST", &mut config.cost.scalar_cost);
        read_env("GATEWARDEN_OBJECT_COST", &mut config.cost.object_cost);
        read_env(
            "GATEWARDEN_LIST_MULTIPLIER",
            &mut config.cost.list_multiplier,
        );

        read_env("GATEWARDEN_RATE_LIMIT_MAX", &mut config.rate_limit.max);
        read_env(
            "GATEWARDEN_RATE_LIMIT_WINDOW_MS",
            &mut config.rate_limit.window_ms,
        );
        read_env(
            "GATEWARDEN_RATE_LIMIT_SKIP_SUCCESSFUL",
            &mut config.rate_limit.skip_successful_requests,
        );

        read_env("GATEWARDEN_CACHE_TTL_SECS", &mut config.cache.ttl_seconds);
        read_env("GATEWARDEN_CACHE_MAX_SIZE", &mut config.cache.max_size);

        read_env(
            "GATEWARDEN_PERSISTED_TTL_SECS",
            &mut config.persisted.ttl_seconds,
        );

        read_env(
            "GATEWARDEN_METRICS_LOG_INTERVAL_MS",
            &mut config.metrics.log_interval_ms,
        );

        config
    }
}

fn read_env<T: std::str::FromStr>(name: &str, target: &mut T) {
    if let Ok(value) = std::env::var(name) {
        if let Ok(parsed) = value.parse() {
            *target = parsed;
        }
    }
}
