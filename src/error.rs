//! Governance Error Types
//!
//! Admission rejections raised by the governance pipeline. These are
//! expected, per-request, recoverable-by-client conditions: they abort the
//! pipeline for one request and surface verbatim with a machine-readable
//! code plus diagnostic payload. Nothing here is fatal to the process.

use serde_json::{json, Value};

use crate::request::ResponseError;

/// Rejection code for queries whose estimated cost exceeds the ceiling
pub const CODE_QUERY_COST_EXCEEDED: &str = "QUERY_COST_EXCEEDED";

/// Rejection code for clients over their admission window
pub const CODE_RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";

/// Error types for governance admission decisions
#[derive(Debug, Clone, thiserror::Error)]
pub enum GovernanceError {
    /// Estimated query cost exceeds the configured ceiling
    #[error("Query cost of {cost} exceeds maximum allowed cost of {maximum_cost}")]
    CostExceeded {
        /// Computed cost of the rejected query
        cost: u64,
        /// Configured ceiling
        maximum_cost: u64,
    },

    /// Client identity has exhausted its admission window
    #[error("Too many requests, please try again in {retry_after} seconds")]
    RateLimited {
        /// Seconds until the window resets
        retry_after: u64,
        /// Configured request limit per window
        limit: u32,
        /// Configured window length in milliseconds
        window_ms: u64,
    },
}

impl GovernanceError {
    /// Machine-readable rejection code
    pub fn code(&self) -> &'static str {
        match self {
            GovernanceError::CostExceeded { .. } => CODE_QUERY_COST_EXCEEDED,
            GovernanceError::RateLimited { .. } => CODE_RATE_LIMIT_EXCEEDED,
        }
    }

    /// Diagnostic payload carried alongside the code
    pub fn diagnostics(&self) -> Value {
        match self {
            GovernanceError::CostExceeded { cost, maximum_cost } => json!({
                "cost": cost,
                "maximumCost": maximum_cost,
            }),
            GovernanceError::RateLimited {
                retry_after,
                limit,
                window_ms,
            } => json!({
                "retryAfter": retry_after,
                "limit": limit,
                "windowMs": window_ms,
            }),
        }
    }
}

impl From<GovernanceError> for ResponseError {
    fn from(error: GovernanceError) -> Self {
        let mut extensions = serde_json::Map::new();
        extensions.insert("code".to_string(), Value::String(error.code().to_string()));
        if let Value::Object(fields) = error.diagnostics() {
            extensions.extend(fields);
        }
        ResponseError {
            message: error.to_string(),
            extensions,
        }
    }
}
