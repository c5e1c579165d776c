//! Disk-backed secret storage
//!
//! One file per tenant per well-known key, named `<tenantId>-<key>`, stored
//! under a shared data directory. File contents are the raw secret as plain
//! text. Tenants may share the directory; the tenant-scoped filename avoids
//! collisions.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Durable fallback store for long-lived secrets.
#[derive(Debug, Clone)]
pub struct SecretStore {
    data_dir: PathBuf,
    tenant_id: String,
}

impl SecretStore {
    pub fn new(data_dir: impl Into<PathBuf>, tenant_id: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            tenant_id: tenant_id.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}-{}", self.tenant_id, key))
    }

    /// Persist a secret. The parent directory is created if missing.
    pub fn save(&self, key: &str, value: &str) -> Result<()> {
        let path = self.file_path(key);
        debug!(key, path = %path.display(), "saving key to file");
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .map_err(|e| Error::Persistence(format!("cannot create data dir: {}", e)))?;
        }
        std::fs::write(&path, value)
            .map_err(|e| Error::Persistence(format!("cannot write {}: {}", path.display(), e)))
    }

    /// Load a secret. A missing or unreadable file is a [`Error::Persistence`];
    /// callers treat it as "not found".
    pub fn load(&self, key: &str) -> Result<String> {
        let path = self.file_path(key);
        debug!(key, path = %path.display(), "loading key from file");
        std::fs::read_to_string(&path)
            .map_err(|e| Error::Persistence(format!("cannot read {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecretStore::new(dir.path(), "tenant-1");
        store.save("refreshToken", "R1").unwrap();
        assert_eq!(store.load("refreshToken").unwrap(), "R1");
    }

    #[test]
    fn test_tenant_scoped_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let a = SecretStore::new(dir.path(), "tenant-a");
        let b = SecretStore::new(dir.path(), "tenant-b");
        a.save("refreshToken", "RA").unwrap();
        b.save("refreshToken", "RB").unwrap();
        assert_eq!(a.load("refreshToken").unwrap(), "RA");
        assert_eq!(b.load("refreshToken").unwrap(), "RB");
        assert!(dir.path().join("tenant-a-refreshToken").exists());
    }

    #[test]
    fn test_missing_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecretStore::new(dir.path(), "tenant-1");
        let err = store.load("refreshToken").unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[test]
    fn test_save_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("cadence").join("secrets");
        let store = SecretStore::new(&nested, "tenant-1");
        store.save("refreshToken", "R1").unwrap();
        assert_eq!(store.load("refreshToken").unwrap(), "R1");
    }
}
