//! In-memory TTL caches for third-party lookups.
//!
//! One `TtlCache` per resource kind, owned by the gateway. Failed lookups are
//! stored as `None` under a shorter TTL so a failing provider is not called
//! on every request. Expired entries are purged whenever the gateway misses.
//! Writes are last-writer-wins: two concurrent misses for
//! the same key both reach the provider and the later write sticks.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// Lifetime of a successful lookup.
pub const POSITIVE_TTL: Duration = Duration::from_secs(15 * 60);
/// Lifetime of a failed lookup.
pub const NEGATIVE_TTL: Duration = Duration::from_secs(60);

/// A cached lookup result; `value` is `None` for a cached failure.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: Option<V>,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Thread-safe TTL map with separate lifetimes for hits and failures.
#[derive(Debug)]
pub struct TtlCache<K: Eq + Hash, V> {
    entries: DashMap<K, CacheEntry<V>>,
    positive_ttl: Duration,
    negative_ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new() -> Self {
        Self::with_ttls(POSITIVE_TTL, NEGATIVE_TTL)
    }

    pub fn with_ttls(positive_ttl: Duration, negative_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            positive_ttl,
            negative_ttl,
        }
    }

    /// `Some(value)` for a live entry (the value may itself be a cached
    /// failure), `None` when absent or expired.
    pub fn get(&self, key: &K) -> Option<Option<V>> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if entry.is_live(now) {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Store a lookup result and hand it back.
    pub fn store(&self, key: K, value: Option<V>) -> Option<V> {
        let ttl = if value.is_some() {
            self.positive_ttl
        } else {
            self.negative_ttl
        };
        self.entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        value
    }

    /// Drop expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
