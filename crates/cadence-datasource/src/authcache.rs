//! Cross-instance refresh-token cache
//!
//! When tenant settings are updated the host re-creates the instance, and any
//! state the old instance held is gone. The registry lives for the process
//! lifetime and is injected at instance construction, so a rotated refresh
//! token survives instance churn without a disk round-trip.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Process-lifetime registry of per-tenant auth caches, keyed by tenant id.
/// Owned by the host; instances receive a shared handle at construction.
#[derive(Debug, Default)]
pub struct AuthRegistry {
    tenants: Mutex<HashMap<String, Arc<TenantAuthCache>>>,
}

impl AuthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the auth cache for a tenant.
    pub fn tenant(&self, tenant_id: &str) -> Arc<TenantAuthCache> {
        let mut tenants = self.tenants.lock();
        Arc::clone(
            tenants
                .entry(tenant_id.to_string())
                .or_insert_with(|| Arc::new(TenantAuthCache::default())),
        )
    }
}

/// Auth state for one tenant that must outlive any single instance.
#[derive(Debug, Default)]
pub struct TenantAuthCache {
    refresh_token: Mutex<Option<String>>,
}

impl TenantAuthCache {
    pub fn refresh_token(&self) -> Option<String> {
        self.refresh_token.lock().clone()
    }

    pub fn set_refresh_token(&self, token: impl Into<String>) {
        *self.refresh_token.lock() = Some(token.into());
    }
}
