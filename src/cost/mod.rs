//! Query Cost Estimation Module
//!
//! Static analysis over a parsed selection tree, bounding resource usage
//! before execution without touching any backing data source.
//!
//! # Features
//!
//! - Bottom-up cost per selection with list-cardinality amplification
//! - Maximum-nesting-depth tracking
//! - Fragment spreads costed once per reference site (matching actual
//!   execution, where a fragment spread twice resolves twice)
//! - Introspection fields excluded from cost

pub mod estimator;
pub mod schema;

pub use estimator::{CostConfig, CostEstimator, CostResult};
pub use schema::{FieldMeta, SchemaMeta};
