//! Rate Limit Configuration
//!
//! Configuration for fixed-window admission control.

use serde::{Deserialize, Serialize};

/// Default maximum requests per window
pub const DEFAULT_MAX_REQUESTS: u32 = 100;

/// Default window length in milliseconds
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Default ordered precedence of identity headers. Trust terminates at the
/// deployment's proxy layer; unless the proxy strips or overwrites these
/// headers, a client can spoof its identity. Deployments configure this
/// list to match their actual trusted boundary.
pub const DEFAULT_IDENTITY_HEADERS: [&str; 3] =
    ["cf-connecting-ip", "x-real-ip", "x-forwarded-for"];

/// Rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests admitted per window, per client identity
    pub max: u32,

    /// Window length in milliseconds
    pub window_ms: u64,

    /// Refund quota for error-free responses (best-effort, applied after
    /// the fact at the final lifecycle hook)
    pub skip_successful_requests: bool,

    /// Ordered header names consulted for client identity, most trusted
    /// first
    #[serde(default = "default_identity_headers")]
    pub identity_headers: Vec<String>,
}

fn default_identity_headers() -> Vec<String> {
    DEFAULT_IDENTITY_HEADERS
        .iter()
        .map(|h| h.to_string())
        .collect()
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max: DEFAULT_MAX_REQUESTS,
            window_ms: DEFAULT_WINDOW_MS,
            skip_successful_requests: false,
            identity_headers: default_identity_headers(),
        }
    }
}

impl RateLimitConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }
}
