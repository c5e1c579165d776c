//! TTL store
//!
//! A concurrent map of string keys to values with per-entry expiration.
//! Entries expire lazily (checked on read) and can be swept periodically by
//! a background task the owner spawns.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Entry lifetime control for [`TtlStore::set_with_expiration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Use the store's default TTL.
    Default,
    /// The entry never expires.
    Never,
    /// Expire after the given duration.
    After(Duration),
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(at) => at <= now,
            None => false,
        }
    }
}

/// Concurrent TTL map. Safe for concurrent read/write from multiple workers;
/// callers never need external locking. `set` is replace-or-insert and
/// last-writer-wins.
#[derive(Debug)]
pub struct TtlStore<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> TtlStore<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Replace-or-insert with the store's default TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_expiration(key, value, Expiration::Default);
    }

    /// Replace-or-insert with explicit lifetime control.
    pub fn set_with_expiration(&self, key: impl Into<String>, value: V, expiration: Expiration) {
        let expires_at = match expiration {
            Expiration::Default => Some(Instant::now() + self.default_ttl),
            Expiration::Never => None,
            Expiration::After(ttl) => Some(Instant::now() + ttl),
        };
        self.entries
            .write()
            .insert(key.into(), Entry { value, expires_at });
    }

    /// Get a value. Returns `None` if absent or past expiry.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_with_expiration(key).map(|(value, _)| value)
    }

    /// Get a value together with its expiration instant (`None` = never
    /// expires). Returns `None` if absent or past expiry.
    pub fn get_with_expiration(&self, key: &str) -> Option<(V, Option<Instant>)> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        Some((entry.value.clone(), entry.expires_at))
    }

    /// Explicit invalidation of a single key.
    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Clear all entries.
    pub fn flush(&self) {
        self.entries.write().clear();
    }

    /// Remove all expired entries.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.entries.write().retain(|_, e| !e.is_expired(now));
    }

    /// Number of entries, including not-yet-swept expired ones.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Spawn a background task that sweeps expired entries on an interval.
/// The returned handle can be aborted when the owner is dropped.
pub fn spawn_sweeper<V>(store: Arc<TtlStore<V>>, every: Duration) -> tokio::task::JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately; skip it.
        interval.tick().await;
        loop {
            interval.tick().await;
            store.sweep();
        }
    })
}
