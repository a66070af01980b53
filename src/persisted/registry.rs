//! Persisted Query Registry
//!
//! Content-addressed query store. Keys are always recomputed server-side as
//! the SHA-256 of the stored text, never taken from the client at store
//! time, so a key can always be reproduced by re-hashing its entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::rate_limit::store::SWEEP_INTERVAL;
use crate::request::PersistedQueryExtension;

/// The only recognized APQ protocol version
pub const APQ_PROTOCOL_VERSION: u32 = 1;

/// Default entry TTL in seconds (24 hours)
pub const DEFAULT_TTL_SECONDS: u64 = 86_400;

/// Persisted query registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedQueryConfig {
    /// Seconds a registered query stays resolvable
    pub ttl_seconds: u64,
}

impl Default for PersistedQueryConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

#[derive(Debug, Clone)]
struct PersistedQueryEntry {
    query: String,
    stored_at: DateTime<Utc>,
}

/// Outcome of the lookup phase, consumed by the pipeline.
///
/// `was_substituted` is only set when a hash-only request resolved to
/// stored text; the registry's responsibility ends here, and the pipeline
/// performs the actual substitution.
#[derive(Debug, Clone, Default)]
pub struct PersistedLookup {
    /// Stored query text, when the lookup resolved one
    pub resolved_text: Option<String>,

    /// True when `resolved_text` should replace the request's (absent) text
    pub was_substituted: bool,
}

/// Hash -> query-text store
#[derive(Debug, Clone)]
pub struct PersistedQueryRegistry {
    config: PersistedQueryConfig,
    entries: Arc<RwLock<HashMap<String, PersistedQueryEntry>>>,
    registrations: Arc<AtomicU64>,
}

impl PersistedQueryRegistry {
    /// Create a registry with the given configuration
    pub fn new(config: PersistedQueryConfig) -> Self {
        Self {
            config,
            entries: Arc::new(RwLock::new(HashMap::new())),
            registrations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a registry with defaults
    pub fn default_config() -> Self {
        Self::new(PersistedQueryConfig::default())
    }

    /// Lowercase-hex SHA-256 of a query text
    pub fn hash_query(query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Phase 1: register query text under its recomputed content hash,
    /// overwriting any prior entry. Returns the hash.
    pub async fn register(&self, query: &str) -> String {
        let hash = Self::hash_query(query);

        let mut entries = self.entries.write().await;
        entries.insert(
            hash.clone(),
            PersistedQueryEntry {
                query: query.to_string(),
                stored_at: Utc::now(),
            },
        );
        drop(entries);

        let registrations = self.registrations.fetch_add(1, Ordering::Relaxed) + 1;
        if registrations % SWEEP_INTERVAL == 0 {
            let swept = self.sweep_expired().await;
            if swept > 0 {
                debug!(swept, "swept expired persisted queries");
            }
        }

        hash
    }

    /// Phase 2: resolve an APQ extension against the registry.
    ///
    /// Substitution only happens for a version-1 extension carrying a hash
    /// on a request with no query text of its own; every other combination
    /// is a silent no-op and execution proceeds with whatever text the
    /// request actually carried.
    pub async fn lookup(
        &self,
        extension: Option<&PersistedQueryExtension>,
        provided_query: Option<&str>,
    ) -> PersistedLookup {
        let Some(extension) = extension else {
            return PersistedLookup::default();
        };
        if extension.version != APQ_PROTOCOL_VERSION || provided_query.is_some() {
            return PersistedLookup::default();
        }
        let Some(hash) = extension.sha256_hash.as_deref() else {
            return PersistedLookup::default();
        };

        match self.get(hash).await {
            Some(query) => {
                debug!(hash, "persisted query hit");
                PersistedLookup {
                    resolved_text: Some(query),
                    was_substituted: true,
                }
            }
            None => PersistedLookup::default(),
        }
    }

    /// Stored text for a hash, if present and unexpired
    pub async fn get(&self, hash: &str) -> Option<String> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        let entry = entries.get(hash)?;
        if (now - entry.stored_at).num_seconds() >= self.config.ttl_seconds as i64 {
            return None;
        }
        Some(entry.query.clone())
    }

    /// Remove expired entries, returning how many
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| {
            (now - entry.stored_at).num_seconds() < self.config.ttl_seconds as i64
        });
        before - entries.len()
    }

    /// Number of registered queries (including unexpired-swept ones)
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    /// True when nothing is registered
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop all entries
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extension(version: u32, hash: Option<&str>) -> PersistedQueryExtension {
        PersistedQueryExtension {
            version,
            sha256_hash: hash.map(str::to_string),
        }
    }

    #[test]
    fn test_hash_is_deterministic_sha256() {
        let a = PersistedQueryRegistry::hash_query("{ users { id } }");
        let b = PersistedQueryRegistry::hash_query("{ users { id } }");

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, PersistedQueryRegistry::hash_query("{ users { name } }"));
    }

    #[tokio::test]
    async fn test_register_then_lookup_roundtrip() {
        let registry = PersistedQueryRegistry::default_config();
        let hash = registry.register("{ users { id } }").await;

        let lookup = registry
            .lookup(Some(&extension(1, Some(&hash))), None)
            .await;

        assert!(lookup.was_substituted);
        assert_eq!(lookup.resolved_text.as_deref(), Some("{ users { id } }"));
    }

    #[tokio::test]
    async fn test_register_overwrites_and_key_is_reproducible() {
        let registry = PersistedQueryRegistry::default_config();
        let hash = registry.register("{ version }").await;
        let again = registry.register("{ version }").await;

        assert_eq!(hash, again);
        assert_eq!(hash, PersistedQueryRegistry::hash_query("{ version }"));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_wrong_version_is_silent_noop() {
        let registry = PersistedQueryRegistry::default_config();
        let hash = registry.register("{ version }").await;

        let lookup = registry
            .lookup(Some(&extension(2, Some(&hash))), None)
            .await;

        assert!(!lookup.was_substituted);
        assert!(lookup.resolved_text.is_none());
    }

    #[tokio::test]
    async fn test_missing_hash_is_silent_noop() {
        let registry = PersistedQueryRegistry::default_config();

        let lookup = registry.lookup(Some(&extension(1, None)), None).await;
        assert!(!lookup.was_substituted);
    }

    #[tokio::test]
    async fn test_provided_text_skips_substitution() {
        let registry = PersistedQueryRegistry::default_config();
        let hash = registry.register("{ version }").await;

        let lookup = registry
            .lookup(Some(&extension(1, Some(&hash))), Some("{ other }"))
            .await;

        assert!(!lookup.was_substituted);
    }

    #[tokio::test]
    async fn test_unknown_hash_is_noop() {
        let registry = PersistedQueryRegistry::default_config();

        let lookup = registry
            .lookup(Some(&extension(1, Some("deadbeef"))), None)
            .await;

        assert!(!lookup.was_substituted);
    }

    #[tokio::test]
    async fn test_expired_entry_is_not_found() {
        let registry = PersistedQueryRegistry::new(PersistedQueryConfig { ttl_seconds: 0 });
        let hash = registry.register("{ version }").await;

        assert!(registry.get(&hash).await.is_none());

        let lookup = registry
            .lookup(Some(&extension(1, Some(&hash))), None)
            .await;
        assert!(!lookup.was_substituted);
    }

    #[tokio::test]
    async fn test_sweep_removes_expired() {
        let registry = PersistedQueryRegistry::new(PersistedQueryConfig { ttl_seconds: 0 });
        registry.register("{ a }").await;
        registry.register("{ b }").await;

        let swept = registry.sweep_expired().await;
        assert_eq!(swept, 2);
        assert!(registry.is_empty().await);
    }
}
