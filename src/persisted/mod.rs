//! Persisted Queries Module
//!
//! Hash -> query-text registry implementing the APQ-style two-phase
//! protocol: requests carrying full text register it under its content
//! hash; later requests may send only the hash and have the stored text
//! substituted for execution.
//!
//! Protocol anomalies (wrong version, missing hash) are silent no-ops by
//! design, keeping the full-query-text fallback path always available.

pub mod registry;

pub use registry::{
    PersistedLookup, PersistedQueryConfig, PersistedQueryRegistry, APQ_PROTOCOL_VERSION,
};
