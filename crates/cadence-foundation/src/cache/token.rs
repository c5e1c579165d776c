//! Token store
//!
//! In-memory TTL map for exactly two long-lived keys (`accessToken`,
//! `refreshToken`) with a disk-backed fallback for the refresh token.
//! Persistence is best-effort: the in-memory copy stays authoritative for
//! the process lifetime and disk write failures are logged, never surfaced.

use crate::cache::disk::SecretStore;
use crate::cache::store::{Expiration, TtlStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Well-known key for the short-lived bearer credential.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Well-known key for the long-lived refresh credential.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Credential cache for one tenant: TTL map plus durable refresh-token
/// fallback.
#[derive(Debug)]
pub struct TokenStore {
    mem: Arc<TtlStore<String>>,
    disk: SecretStore,
}

impl TokenStore {
    pub fn new(default_ttl: Duration, disk: SecretStore) -> Self {
        Self {
            mem: Arc::new(TtlStore::new(default_ttl)),
            disk,
        }
    }

    pub fn set(&self, key: &str, value: String) {
        self.mem.set(key, value);
    }

    pub fn set_with_expiration(&self, key: &str, value: String, expiration: Expiration) {
        self.mem.set_with_expiration(key, value, expiration);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.mem.get(key)
    }

    pub fn get_with_expiration(&self, key: &str) -> Option<(String, Option<Instant>)> {
        self.mem.get_with_expiration(key)
    }

    pub fn delete(&self, key: &str) {
        self.mem.delete(key);
    }

    pub fn flush(&self) {
        self.mem.flush();
    }

    /// Best-effort disk persistence. A write failure is logged and swallowed;
    /// a future successful refresh self-corrects.
    pub fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.disk.save(key, value) {
            warn!(key, error = %e, "failed to persist token to disk");
        }
    }

    /// Load a key from disk. On success the in-memory store is re-populated
    /// with no expiration, so subsequent reads hit memory. Disk errors
    /// surface as `None` (credential absent), never as a failure.
    pub fn load(&self, key: &str) -> Option<String> {
        match self.disk.load(key) {
            Ok(value) => {
                self.mem
                    .set_with_expiration(key, value.clone(), Expiration::Never);
                Some(value)
            }
            Err(e) => {
                debug!(key, error = %e, "token not loadable from disk");
                None
            }
        }
    }

    /// Shared handle to the underlying map, used by the owner to run the
    /// periodic sweep.
    pub fn mem(&self) -> Arc<TtlStore<String>> {
        Arc::clone(&self.mem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> TokenStore {
        TokenStore::new(
            Duration::from_secs(60),
            SecretStore::new(dir.path(), "tenant-1"),
        )
    }

    #[test]
    fn test_persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = store(&dir);
        tokens.persist(REFRESH_TOKEN_KEY, "R1");
        assert_eq!(tokens.load(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));
    }

    #[test]
    fn test_load_repopulates_memory_without_expiration() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = store(&dir);
        tokens.persist(REFRESH_TOKEN_KEY, "R1");
        tokens.load(REFRESH_TOKEN_KEY).unwrap();

        // The memory copy must be found on subsequent reads and never expire.
        let (value, expires_at) = tokens.get_with_expiration(REFRESH_TOKEN_KEY).unwrap();
        assert_eq!(value, "R1");
        assert!(expires_at.is_none());
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = store(&dir);
        assert_eq!(tokens.load(REFRESH_TOKEN_KEY), None);
        assert_eq!(tokens.get(REFRESH_TOKEN_KEY), None);
    }

    #[test]
    fn test_flush_clears_memory_not_disk() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = store(&dir);
        tokens.set_with_expiration(REFRESH_TOKEN_KEY, "R1".to_string(), Expiration::Never);
        tokens.persist(REFRESH_TOKEN_KEY, "R1");
        tokens.flush();
        assert_eq!(tokens.get(REFRESH_TOKEN_KEY), None);
        // Disk fallback still works after an administrative flush.
        assert_eq!(tokens.load(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));
    }
}
