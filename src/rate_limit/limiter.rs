//! Rate Limiter
//!
//! Admission decisions for one configured limit over the shared window
//! store. A `Clone` handle over shared interior state; tests construct
//! fresh isolated instances per case.

use tracing::warn;

use super::config::RateLimitConfig;
use super::identity::client_identity;
use super::store::{Admission, RateLimitStore};
use crate::error::GovernanceError;

/// Fixed-window rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    store: RateLimitStore,
}

impl RateLimiter {
    /// Create a limiter with the given configuration and a fresh store
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            store: RateLimitStore::new(),
        }
    }

    /// Create a limiter with defaults
    pub fn default_config() -> Self {
        Self::new(RateLimitConfig::default())
    }

    /// Derive the client identity for a request from its headers
    pub fn identity(&self, headers: &std::collections::HashMap<String, String>) -> String {
        client_identity(headers, &self.config.identity_headers)
    }

    /// Admit or reject one request for `identity`.
    ///
    /// Returns the requests remaining in the window on admission.
    /// Rejection carries `retry_after`, the configured limit, and the
    /// window length; the rejected attempt does not consume quota, but
    /// quota already consumed by earlier admits is not rolled back.
    pub async fn admit(&self, identity: &str) -> Result<u32, GovernanceError> {
        match self
            .store
            .try_acquire(identity, self.config.max, self.config.window_ms)
            .await
        {
            Admission::Admitted { remaining } => Ok(remaining),
            Admission::Rejected { retry_after_secs } => {
                warn!(identity, retry_after_secs, "rate limit exceeded");
                Err(GovernanceError::RateLimited {
                    retry_after: retry_after_secs,
                    limit: self.config.max,
                    window_ms: self.config.window_ms,
                })
            }
        }
    }

    /// Refund one admission for an error-free response.
    ///
    /// Only active with `skip_successful_requests`. This is a best-effort
    /// adjustment applied at the final lifecycle hook, not atomic with the
    /// admission increment; concurrent requests from the same identity can
    /// observe the counter between the two writes. A known
    /// weak-consistency property of the refund.
    pub async fn release_on_success(&self, identity: &str) {
        if self.config.skip_successful_requests {
            self.store.release(identity).await;
        }
    }

    /// The underlying window store (for inspection in tests)
    pub fn store(&self) -> &RateLimitStore {
        &self.store
    }
}
