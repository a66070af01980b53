//! Response Cache Store
//!
//! Shared in-memory result table with lazy TTL expiry and insertion-order
//! size bounding. Only successful, read-only results are ever stored; the
//! pipeline enforces that invariant at the store call site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Response header carrying the cache TTL
pub const CACHE_CONTROL_HEADER: &str = "cache-control";

/// Response header carrying seconds since the entry was stored
pub const AGE_HEADER: &str = "age";

/// Default entry TTL in seconds (5 minutes)
pub const DEFAULT_TTL_SECONDS: u64 = 300;

/// Default maximum number of cached entries
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds an entry stays fresh after storage
    pub ttl_seconds: u64,

    /// Maximum number of entries kept
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    stored_at: DateTime<Utc>,
}

/// A cache hit: the stored result plus its age
#[derive(Debug, Clone)]
pub struct CacheHit {
    /// The memoized result data
    pub data: Value,

    /// Whole seconds since the entry was stored
    pub age_seconds: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    // Keys in insertion order; eviction pops from the front. Overwriting
    // an existing key keeps its original position.
    insertion_order: VecDeque<String>,
}

/// TTL-bounded response cache
#[derive(Debug, Clone)]
pub struct ResponseCache {
    config: CacheConfig,
    inner: Arc<RwLock<CacheInner>>,
}

impl ResponseCache {
    /// Create a cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Arc::new(RwLock::new(CacheInner::default())),
        }
    }

    /// Create a cache with defaults
    pub fn default_config() -> Self {
        Self::new(CacheConfig::default())
    }

    /// The configured TTL, for `cache-control` headers
    pub fn ttl_seconds(&self) -> u64 {
        self.config.ttl_seconds
    }

    /// Canonical cache key for a request triple. Field order is fixed by
    /// the serializer, so identical triples always produce identical keys.
    pub fn key(
        query: Option<&str>,
        variables: Option<&Value>,
        operation_name: Option<&str>,
    ) -> String {
        json!({
            "query": query,
            "variables": variables,
            "operationName": operation_name,
        })
        .to_string()
    }

    /// Look up a key, sweeping expired entries first.
    pub async fn lookup(&self, key: &str) -> Option<CacheHit> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        Self::sweep_expired_locked(&mut inner, now, self.config.ttl_seconds);

        let entry = inner.entries.get(key)?;
        let age_seconds = (now - entry.stored_at).num_seconds().max(0) as u64;
        debug!(age_seconds, "response cache hit");
        Some(CacheHit {
            data: entry.data.clone(),
            age_seconds,
        })
    }

    /// Store a result under a key, then bound the table to `max_size` by
    /// evicting the earliest-inserted keys.
    pub async fn store(&self, key: String, data: Value) {
        let mut inner = self.inner.write().await;

        if inner.entries.contains_key(&key) {
            // Overwrite in place; insertion position is unchanged.
            inner.entries.insert(
                key,
                CacheEntry {
                    data,
                    stored_at: Utc::now(),
                },
            );
            return;
        }

        inner.entries.insert(
            key.clone(),
            CacheEntry {
                data,
                stored_at: Utc::now(),
            },
        );
        inner.insertion_order.push_back(key);

        while inner.entries.len() > self.config.max_size {
            match inner.insertion_order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Remove expired entries, returning how many
    pub async fn sweep_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        Self::sweep_expired_locked(&mut inner, Utc::now(), self.config.ttl_seconds)
    }

    fn sweep_expired_locked(inner: &mut CacheInner, now: DateTime<Utc>, ttl_seconds: u64) -> usize {
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, entry| (now - entry.stored_at).num_seconds() < ttl_seconds as i64);
        let swept = before - inner.entries.len();
        if swept > 0 {
            let entries = &inner.entries;
            inner
                .insertion_order
                .retain(|key| entries.contains_key(key));
        }
        swept
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.entries.len()
    }

    /// True when the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop all entries
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.insertion_order.clear();
    }
}
