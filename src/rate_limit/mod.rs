//! Rate Limiting Module
//!
//! Fixed-window admission control keyed by client identity, deciding
//! whether to run a request before any execution cost is incurred.
//!
//! # Features
//!
//! - Fixed-window counters reset wholesale at window boundaries
//! - Client identity from a configured, ordered header precedence list
//! - Optional quota refund for error-free responses
//! - Deterministic opportunistic sweep of expired windows
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  Rate Limiter                    │
//! ├─────────────────────────────────────────────────┤
//! │  identity derivation   │   admission decision    │
//! ├─────────────────────────────────────────────────┤
//! │  ┌───────────────────────────────────────────┐  │
//! │  │   Window Store (identity -> count/reset)  │  │
//! │  └───────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod identity;
pub mod limiter;
pub mod store;

pub use config::RateLimitConfig;
pub use identity::{client_identity, UNKNOWN_IDENTITY};
pub use limiter::RateLimiter;
pub use store::{RateLimitStore, WindowEntry};
