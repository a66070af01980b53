//! Response Cache Module
//!
//! TTL-bounded memoization of full query results for read-only operations,
//! keyed by a canonical serialization of query text, variables, and
//! operation name.
//!
//! # Features
//!
//! - Lazy TTL expiry checked on lookup, no timers
//! - Insertion-order bounding at `max_size` (earliest-inserted evicted
//!   first — deliberately not access-order LRU)
//! - `cache-control`/`age` response metadata on hits and fresh stores

pub mod store;

pub use store::{CacheConfig, CacheHit, ResponseCache, AGE_HEADER, CACHE_CONTROL_HEADER};
