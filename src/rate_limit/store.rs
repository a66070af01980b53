//! Fixed-Window Store
//!
//! Shared in-memory table of admission windows, keyed by client identity.
//! Entries live for the process lifetime only and are swept lazily on a
//! deterministic operation-count cadence.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Sweep expired windows once every this many admission checks
pub const SWEEP_INTERVAL: u64 = 64;

/// One client identity's admission window. Mutated in place while the
/// window is live; replaced wholesale once it expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowEntry {
    /// Requests admitted (or attempted) in the current window
    pub count: u32,

    /// When the current window resets
    pub window_reset_at: DateTime<Utc>,
}

/// Outcome of one admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request admitted; counter incremented
    Admitted {
        /// Requests left in the window after this one
        remaining: u32,
    },

    /// Window exhausted; counter untouched
    Rejected {
        /// Whole seconds until the window resets, rounded up
        retry_after_secs: u64,
    },
}

/// Shared fixed-window table
#[derive(Debug, Clone, Default)]
pub struct RateLimitStore {
    entries: Arc<RwLock<HashMap<String, WindowEntry>>>,
    checks: Arc<AtomicU64>,
}

impl RateLimitStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to admit one request for `identity`.
    ///
    /// The check and increment happen under a single write guard, so
    /// admission is atomic per table. Missing or expired entries are
    /// replaced with a fresh window before the check.
    pub async fn try_acquire(&self, identity: &str, max: u32, window_ms: u64) -> Admission {
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        let entry = entries
            .entry(identity.to_string())
            .and_modify(|entry| {
                if now > entry.window_reset_at {
                    entry.count = 0;
                    entry.window_reset_at = now + Duration::milliseconds(window_ms as i64);
                }
            })
            .or_insert_with(|| WindowEntry {
                count: 0,
                window_reset_at: now + Duration::milliseconds(window_ms as i64),
            });

        let admission = if entry.count >= max {
            let remaining_ms = (entry.window_reset_at - now).num_milliseconds().max(0) as u64;
            Admission::Rejected {
                retry_after_secs: remaining_ms.div_ceil(1000),
            }
        } else {
            entry.count += 1;
            Admission::Admitted {
                remaining: max - entry.count,
            }
        };
        drop(entries);

        let checks = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        if checks % SWEEP_INTERVAL == 0 {
            let swept = self.sweep_expired().await;
            if swept > 0 {
                debug!(swept, "swept expired rate-limit windows");
            }
        }

        admission
    }

    /// Decrement the counter for `identity` by one.
    ///
    /// Applied after the fact for error-free responses; a separate later
    /// write, not atomic with the admission increment.
    pub async fn release(&self, identity: &str) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(identity) {
            entry.count = entry.count.saturating_sub(1);
        }
    }

    /// Remove entries whose window has expired, returning how many
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now <= entry.window_reset_at);
        before - entries.len()
    }

    /// Snapshot of one identity's entry, if present
    pub async fn get(&self, identity: &str) -> Option<WindowEntry> {
        let entries = self.entries.read().await;
        entries.get(identity).cloned()
    }

    /// Number of tracked identities
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    /// True when no identities are tracked
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

    #[tokio::test]
    async fn test_window_admits_until_max() {
        let store = RateLimitStore::new();

        for expected_remaining in (0..3).rev() {
            let admission = store.try_acquire("1.2.3.4", 3, 60_000).await;
            assert_eq!(
                admission,
                Admission::Admitted {
                    remaining: expected_remaining
                }
            );
        }

        match store.try_acquire("1.2.3.4", 3, 60_000).await {
            Admission::Rejected { retry_after_secs } => {
                assert!(retry_after_secs <= 60);
                assert!(retry_after_secs >= 1);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_identities_are_independent() {
        let store = RateLimitStore::new();

        store.try_acquire("1.1.1.1", 1, 60_000).await;
        let other = store.try_acquire("2.2.2.2", 1, 60_000).await;

        assert_eq!(other, Admission::Admitted { remaining: 0 });
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_expired_window_is_replaced() {
        let store = RateLimitStore::new();

        // 1ms window; exhaust it, then wait for expiry.
        store.try_acquire("1.2.3.4", 1, 1).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let admission = store.try_acquire("1.2.3.4", 1, 1).await;
        assert_eq!(admission, Admission::Admitted { remaining: 0 });
    }

    #[tokio::test]
    async fn test_release_refunds_one() {
        let store = RateLimitStore::new();

        store.try_acquire("1.2.3.4", 2, 60_000).await;
        store.try_acquire("1.2.3.4", 2, 60_000).await;
        store.release("1.2.3.4").await;

        let admission = store.try_acquire("1.2.3.4", 2, 60_000).await;
        assert_eq!(admission, Admission::Admitted { remaining: 0 });
    }

    #[tokio::test]
    async fn test_release_unknown_identity_is_noop() {
        let store = RateLimitStore::new();
        store.release("nobody").await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let store = RateLimitStore::new();

        store.try_acquire("fresh", 10, 60_000).await;
        store.try_acquire("stale", 10, 1).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let swept = store.sweep_expired().await;
        assert_eq!(swept, 1);
        assert!(store.get("fresh").await.is_some());
        assert!(store.get("stale").await.is_none());
    }

    #[tokio::test]
    async fn test_rejection_does_not_consume() {
        let store = RateLimitStore::new();

        store.try_acquire("1.2.3.4", 1, 60_000).await;
        store.try_acquire("1.2.3.4", 1, 60_000).await;

        let entry = store.get("1.2.3.4").await.unwrap();
        assert_eq!(entry.count, 1);
    }
}
