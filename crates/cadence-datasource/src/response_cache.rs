//! Fingerprint-keyed response cache
//!
//! Sits in front of the upstream client for endpoints whose payloads are
//! immutable or slow-changing. Eligibility is decided from the endpoint path
//! alone; everything else passes straight through to the live fetch.

use crate::models::ApiResponse;
use cadence_foundation::{Error, Result, TtlStore};
use regex::Regex;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Endpoint paths worth caching: individual activities, athlete-scoped
/// resources and segments. List endpoints with moving windows stay live
/// except where the path also names an athlete resource.
const CACHEABLE_ENDPOINTS: &str = r"activities/\d+|athlete|segments/\d";

/// Read-through cache over upstream responses, keyed by request fingerprint.
pub struct ResponseCache {
    store: Arc<TtlStore<ApiResponse>>,
    eligible: Regex,
}

impl ResponseCache {
    pub fn new(store: Arc<TtlStore<ApiResponse>>) -> Result<Self> {
        let eligible = Regex::new(CACHEABLE_ENDPOINTS)
            .map_err(|e| Error::Config(format!("invalid cache eligibility pattern: {}", e)))?;
        Ok(Self { store, eligible })
    }

    pub fn is_cacheable(&self, endpoint: &str) -> bool {
        self.eligible.is_match(endpoint)
    }

    /// Serve from cache when the endpoint is eligible and a fresh entry
    /// exists; otherwise run `fetch` and cache an eligible result under the
    /// fingerprint. Ineligible endpoints always fetch and never populate.
    pub async fn query_with_cache<F, Fut>(
        &self,
        fingerprint: &str,
        endpoint: &str,
        fetch: F,
    ) -> Result<ApiResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ApiResponse>>,
    {
        if !self.is_cacheable(endpoint) {
            return fetch().await;
        }

        if let Some(cached) = self.store.get(fingerprint) {
            debug!(endpoint, fingerprint, "request found in cache");
            return Ok(cached);
        }

        let response = fetch().await?;
        self.store.set(fingerprint, response.clone());
        Ok(response)
    }

    /// Drop every cached response (administrative reset).
    pub fn flush(&self) {
        self.store.flush();
    }
}
