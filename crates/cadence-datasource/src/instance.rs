//! Tenant instance
//!
//! One instance per configured tenant, created on activation and re-created
//! whenever settings change. Owns the credential manager, the response
//! cache, the upstream client and the background tasks; the host routes
//! queries and admin calls here.

use crate::auth::{CredentialManager, TokenEndpoint};
use crate::authcache::AuthRegistry;
use crate::client::UpstreamClient;
use crate::models::{ApiRequest, ApiResponse, TokenExchangeResponse};
use crate::prefetcher::{PrefetchHandle, PrefetchTarget, Prefetcher};
use crate::response_cache::ResponseCache;
use async_trait::async_trait;
use cadence_foundation::cache::spawn_sweeper;
use cadence_foundation::{Error, Result, SecretStore, TenantContext, TokenStore, TtlStore};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub const API_URL: &str = "https://www.strava.com/api/v3";
pub const TOKEN_URL: &str = "https://www.strava.com/api/v3/oauth/token";

/// How often expired entries are physically removed from the in-memory
/// stores. Reads already ignore expired entries; the sweep only bounds
/// memory growth.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// A fully wired tenant: credentials, caches, client and background tasks.
pub struct TenantInstance {
    ctx: Arc<TenantContext>,
    client: Arc<UpstreamClient>,
    credentials: CredentialManager,
    responses: ResponseCache,
    response_store: Arc<TtlStore<ApiResponse>>,
    prefetch: Mutex<Option<PrefetchHandle>>,
    sweepers: Mutex<Vec<JoinHandle<()>>>,
}

impl TenantInstance {
    /// Create an instance against the production upstream. Must be called
    /// from within a tokio runtime; background tasks start immediately.
    pub fn new(
        ctx: TenantContext,
        data_dir: impl AsRef<Path>,
        registry: &AuthRegistry,
    ) -> Result<Arc<Self>> {
        Self::with_urls(ctx, data_dir, registry, API_URL, TOKEN_URL)
    }

    /// Create an instance against explicit upstream URLs.
    pub fn with_urls(
        ctx: TenantContext,
        data_dir: impl AsRef<Path>,
        registry: &AuthRegistry,
        base_url: &str,
        token_url: &str,
    ) -> Result<Arc<Self>> {
        let ctx = Arc::new(ctx);
        let client = Arc::new(UpstreamClient::new(base_url, token_url)?);
        let tokens = TokenStore::new(
            ctx.settings.cache_ttl,
            SecretStore::new(data_dir.as_ref(), &ctx.id),
        );
        let endpoint: Arc<dyn TokenEndpoint> = client.clone();
        let credentials =
            CredentialManager::new(Arc::clone(&ctx), tokens, registry.tenant(&ctx.id), endpoint);
        let response_store = Arc::new(TtlStore::new(ctx.settings.cache_ttl));
        let responses = ResponseCache::new(Arc::clone(&response_store))?;

        info!(tenant = %ctx.id, pass_thru = ctx.settings.oauth_pass_thru, "tenant instance created");

        let instance = Arc::new(Self {
            ctx,
            client,
            credentials,
            responses,
            response_store,
            prefetch: Mutex::new(None),
            sweepers: Mutex::new(Vec::new()),
        });
        instance.start_background_tasks();
        Ok(instance)
    }

    fn start_background_tasks(self: &Arc<Self>) {
        {
            let mut sweepers = self.sweepers.lock();
            sweepers.push(spawn_sweeper(
                self.credentials.token_mem(),
                CACHE_SWEEP_INTERVAL,
            ));
            sweepers.push(spawn_sweeper(
                Arc::clone(&self.response_store),
                CACHE_SWEEP_INTERVAL,
            ));
        }

        // In pass-through mode the instance has no credential of its own to
        // prefetch with.
        if !self.ctx.settings.oauth_pass_thru {
            let prefetcher =
                Prefetcher::new(self.ctx.settings.prefetch_depth, Arc::clone(self));
            *self.prefetch.lock() = Some(prefetcher.spawn());
        }
    }

    pub fn ctx(&self) -> &TenantContext {
        &self.ctx
    }

    /// Current access token for this tenant, refreshing it if needed.
    pub async fn access_token(&self) -> Result<String> {
        self.credentials.access_token().await
    }

    /// Live upstream query. Uses the caller-supplied token in pass-through
    /// mode, the managed credential otherwise.
    pub async fn api_query(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let access_token = match &request.access_token {
            Some(token) => token.clone(),
            None if self.ctx.settings.oauth_pass_thru => {
                return Err(Error::NotAuthorized(
                    "pass-through mode requires a caller-supplied access token".to_string(),
                ))
            }
            None => self.credentials.access_token().await?,
        };

        let body = self
            .client
            .query(&request.endpoint, &request.params, &access_token)
            .await?;
        let result: Value = serde_json::from_slice(&body)?;
        Ok(ApiResponse::new(result))
    }

    /// Cached upstream query, the main read path for dashboard queries.
    pub async fn api_query_with_cache(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let fingerprint = request.fingerprint(&self.ctx.id);
        self.responses
            .query_with_cache(&fingerprint, &request.endpoint, || self.api_query(request))
            .await
    }

    /// One-time authorization-code exchange, invoked from the tenant's
    /// configuration flow.
    pub async fn exchange_token(&self, auth_code: &str) -> Result<TokenExchangeResponse> {
        self.credentials.exchange_token(auth_code).await
    }

    /// Admin: drop the cached access token so the next query refreshes.
    pub fn reset_access_token(&self) {
        self.credentials.reset_access_token();
    }

    /// Admin: clear the response cache and the token cache. The refresh
    /// token survives in the registry and on disk.
    pub fn reset_cache(&self) {
        self.responses.flush();
        self.credentials.flush();
        debug!(tenant = %self.ctx.id, "caches flushed");
    }

    /// Stop a prefetch that is still running. Normally the run is left to
    /// finish; it only fills the cache.
    pub fn abort_prefetch(&self) {
        if let Some(handle) = self.prefetch.lock().as_ref() {
            handle.abort();
        }
    }

    pub fn prefetch_started(&self) -> bool {
        self.prefetch.lock().is_some()
    }
}

#[async_trait]
impl PrefetchTarget for TenantInstance {
    async fn query(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.api_query(request).await
    }

    async fn query_with_cache(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.api_query_with_cache(request).await
    }
}

impl Drop for TenantInstance {
    /// Sweepers would otherwise tick forever on their shared store handles.
    /// A running prefetch holds its own `Arc` to the instance and is left
    /// to finish.
    fn drop(&mut self) {
        for sweeper in self.sweepers.lock().drain(..) {
            sweeper.abort();
        }
        debug!(tenant = %self.ctx.id, "tenant instance disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_foundation::{TenantSettings, TenantSettingsDto};
    use serde_json::json;

    fn context(pass_thru: bool) -> TenantContext {
        let settings = TenantSettings::from_dto(TenantSettingsDto {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            oauth_pass_thru: pass_thru,
            ..Default::default()
        })
        .unwrap();
        TenantContext::new("tenant-1", settings)
    }

    fn instance(pass_thru: bool, dir: &tempfile::TempDir) -> Arc<TenantInstance> {
        // Unroutable upstream; these tests never complete a network call.
        TenantInstance::with_urls(
            context(pass_thru),
            dir.path(),
            &AuthRegistry::new(),
            "http://127.0.0.1:9",
            "http://127.0.0.1:9/oauth/token",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_pass_thru_skips_prefetch() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!instance(true, &dir).prefetch_started());
        assert!(instance(false, &dir).prefetch_started());
    }

    #[tokio::test]
    async fn test_pass_thru_requires_caller_token() {
        let dir = tempfile::tempdir().unwrap();
        let instance = instance(true, &dir);

        let err = instance
            .api_query(&ApiRequest::new("athlete"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn test_unauthorized_tenant_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let instance = instance(false, &dir);

        // No refresh token anywhere; the query must fail without attempting
        // the upstream call.
        let err = instance
            .api_query(&ApiRequest::new("athlete"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn test_cached_query_does_not_mask_auth_errors() {
        let dir = tempfile::tempdir().unwrap();
        let instance = instance(false, &dir);

        let request = ApiRequest::new("activities/111").with_param("include_all_efforts", true);
        let err = instance.api_query_with_cache(&request).await.unwrap_err();
        assert!(matches!(err, Error::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn test_settings_reject_bad_config_before_instance() {
        let err = TenantSettings::from_json(&json!({"clientSecret": "only"})).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
