//! Metrics Module
//!
//! Running statistics over completed requests: outcome counts, latency,
//! cache hit rate, declared query cost, per-operation counters, and error
//! buckets. Read via point-in-time snapshot copies; optionally reported on
//! a fixed interval through the logging layer.

pub mod aggregator;

pub use aggregator::{MetricsAggregator, MetricsConfig, MetricsSnapshot, OperationStats};
