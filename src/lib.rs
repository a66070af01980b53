//! Gatewarden: Request Governance for Graph-Shaped Query APIs
//!
//! This library decides, before execution, whether to admit, rate-limit,
//! short-circuit-with-cache, or reject a structured query — cheaply and
//! without touching any backing data source. Parsing/validation and the
//! execution engine itself are external collaborators reached through the
//! [`executor::QueryExecutor`] seam.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Governance Pipeline                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │ metrics start → persisted queries → rate limiter →           │
//! │ cost estimator → cache lookup → [executor] → cache store →   │
//! │ quota refund → metrics record                                │
//! ├──────────────────────────────────────────────────────────────┤
//! │  shared tables: windows │ cache │ query registry │ metrics   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All shared tables are explicitly owned, process-lifetime, in-memory
//! state constructed once at startup and passed by handle into each
//! component, so tests run against fresh isolated instances.

pub mod cache;
pub mod config;
pub mod cost;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod persisted;
pub mod pipeline;
pub mod rate_limit;
pub mod request;

pub use cache::{CacheConfig, ResponseCache};
pub use config::GovernanceConfig;
pub use cost::{CostConfig, CostEstimator, CostResult, SchemaMeta};
pub use error::GovernanceError;
pub use executor::{ExecutorReply, QueryExecutor, ResolvedRequest};
pub use metrics::{MetricsAggregator, MetricsConfig, MetricsSnapshot};
pub use persisted::{PersistedLookup, PersistedQueryConfig, PersistedQueryRegistry};
pub use pipeline::GovernancePipeline;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use request::{
    Document, Fragment, GovernanceRequest, GovernanceResponse, PersistedQueryExtension,
    RequestExtensions, ResponseError, Selection,
};
