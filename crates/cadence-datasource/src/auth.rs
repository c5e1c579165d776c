//! Credential manager
//!
//! Serves access tokens from the token store while they are valid, and
//! otherwise resolves a refresh token and performs a grant exchange against
//! the upstream token endpoint. Two concurrent callers observing an expired
//! token may both refresh; the token endpoint tolerates concurrent refreshes
//! with the same refresh token, so the duplicate call is harmless.

use crate::authcache::TenantAuthCache;
use crate::client::UpstreamClient;
use crate::models::TokenExchangeResponse;
use async_trait::async_trait;
use cadence_foundation::cache::{Expiration, TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use cadence_foundation::{AuthMode, Error, Result, TenantContext, TtlStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Upstream token endpoint operations. Implemented by [`UpstreamClient`];
/// the seam keeps credential logic testable without a network.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        auth_code: &str,
    ) -> Result<TokenExchangeResponse>;

    async fn refresh_access_token(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenExchangeResponse>;
}

#[async_trait]
impl TokenEndpoint for UpstreamClient {
    async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        auth_code: &str,
    ) -> Result<TokenExchangeResponse> {
        UpstreamClient::exchange_code(self, client_id, client_secret, auth_code).await
    }

    async fn refresh_access_token(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenExchangeResponse> {
        UpstreamClient::refresh_access_token(self, client_id, client_secret, refresh_token).await
    }
}

/// Where a missing refresh token may be resolved from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenSource {
    /// Statically configured token (tenant uses [`AuthMode::RefreshToken`]).
    Static,
    /// Cross-instance registry, survives instance re-creation.
    Registry,
    /// In-memory token store, falling back to the on-disk copy.
    Disk,
}

/// Default resolution priority: static config wins, then the process
/// registry, then disk.
pub const DEFAULT_REFRESH_TOKEN_SOURCES: [RefreshTokenSource; 3] = [
    RefreshTokenSource::Static,
    RefreshTokenSource::Registry,
    RefreshTokenSource::Disk,
];

/// Per-tenant access-token acquisition and refresh-token bookkeeping.
pub struct CredentialManager {
    ctx: Arc<TenantContext>,
    tokens: TokenStore,
    auth_cache: Arc<TenantAuthCache>,
    endpoint: Arc<dyn TokenEndpoint>,
    sources: Vec<RefreshTokenSource>,
}

impl CredentialManager {
    pub fn new(
        ctx: Arc<TenantContext>,
        tokens: TokenStore,
        auth_cache: Arc<TenantAuthCache>,
        endpoint: Arc<dyn TokenEndpoint>,
    ) -> Self {
        Self::with_sources(
            ctx,
            tokens,
            auth_cache,
            endpoint,
            DEFAULT_REFRESH_TOKEN_SOURCES.to_vec(),
        )
    }

    /// Construct with a custom refresh-token resolution order.
    pub fn with_sources(
        ctx: Arc<TenantContext>,
        tokens: TokenStore,
        auth_cache: Arc<TenantAuthCache>,
        endpoint: Arc<dyn TokenEndpoint>,
        sources: Vec<RefreshTokenSource>,
    ) -> Self {
        Self {
            ctx,
            tokens,
            auth_cache,
            endpoint,
            sources,
        }
    }

    /// Get a valid access token, refreshing it if the cached one is absent
    /// or expired. Never returns a token past its reported expiry.
    pub async fn access_token(&self) -> Result<String> {
        if let Some((token, _)) = self.tokens.get_with_expiration(ACCESS_TOKEN_KEY) {
            return Ok(token);
        }
        debug!(tenant = %self.ctx.id, "access token missing or expired, obtaining new one");

        let refresh_token = self.resolve_refresh_token().ok_or_else(|| {
            Error::NotAuthorized("refresh token not found, authorize the tenant first".to_string())
        })?;

        let grant = self
            .endpoint
            .refresh_access_token(
                &self.ctx.settings.client_id,
                &self.ctx.settings.client_secret,
                &refresh_token,
            )
            .await?;

        self.store_grant(&grant, Some(&refresh_token))?;
        Ok(grant.access_token)
    }

    /// One-time authorization-code exchange. Same persistence contract as a
    /// refresh; used only during initial authorization.
    pub async fn exchange_token(&self, auth_code: &str) -> Result<TokenExchangeResponse> {
        let grant = self
            .endpoint
            .exchange_code(
                &self.ctx.settings.client_id,
                &self.ctx.settings.client_secret,
                auth_code,
            )
            .await?;

        self.store_grant(&grant, None)?;
        Ok(grant)
    }

    /// Delete the cached access token, forcing a refresh on the next call.
    /// The refresh token is untouched.
    pub fn reset_access_token(&self) {
        self.tokens.delete(ACCESS_TOKEN_KEY);
        debug!(tenant = %self.ctx.id, "access token removed from cache");
    }

    /// Clear the whole token store (administrative reset).
    pub fn flush(&self) {
        self.tokens.flush();
    }

    /// Shared handle to the in-memory token map, for the owner's sweep task.
    pub fn token_mem(&self) -> Arc<TtlStore<String>> {
        self.tokens.mem()
    }

    /// Try each configured source in order; first hit wins.
    fn resolve_refresh_token(&self) -> Option<String> {
        for source in &self.sources {
            let token = match source {
                RefreshTokenSource::Static => {
                    if self.ctx.settings.auth_mode == AuthMode::RefreshToken {
                        self.ctx.settings.refresh_token.clone()
                    } else {
                        None
                    }
                }
                RefreshTokenSource::Registry => self.auth_cache.refresh_token(),
                RefreshTokenSource::Disk => self
                    .tokens
                    .get(REFRESH_TOKEN_KEY)
                    .or_else(|| self.tokens.load(REFRESH_TOKEN_KEY)),
            };
            if let Some(token) = token.filter(|t| !t.is_empty()) {
                debug!(tenant = %self.ctx.id, source = ?source, "resolved refresh token");
                return Some(token);
            }
        }
        None
    }

    /// Persist a token grant. The access token is cached with a TTL equal to
    /// the time remaining until its reported expiry; a grant that is already
    /// expired on arrival is an upstream-auth failure, never served. A
    /// changed refresh token replaces the prior one everywhere before the
    /// old value is discarded: registry first, then the store, then
    /// best-effort disk. Rotation is recorded even for a rejected grant so
    /// the only usable refresh token is never lost.
    fn store_grant(&self, grant: &TokenExchangeResponse, prior_refresh: Option<&str>) -> Result<()> {
        if prior_refresh != Some(grant.refresh_token.as_str()) {
            debug!(tenant = %self.ctx.id, "got new refresh token");
            self.auth_cache.set_refresh_token(&grant.refresh_token);
            self.tokens.set_with_expiration(
                REFRESH_TOKEN_KEY,
                grant.refresh_token.clone(),
                Expiration::Never,
            );
            self.tokens.persist(REFRESH_TOKEN_KEY, &grant.refresh_token);
        }

        let remaining = grant.expires_at - chrono::Utc::now().timestamp();
        if remaining <= 0 {
            warn!(tenant = %self.ctx.id, expires_at = grant.expires_at,
                "token endpoint reported an already-expired access token");
            return Err(Error::UpstreamAuth(format!(
                "token endpoint reported an already-expired access token (expires_at: {})",
                grant.expires_at
            )));
        }

        self.tokens.set_with_expiration(
            ACCESS_TOKEN_KEY,
            grant.access_token.clone(),
            Expiration::After(Duration::from_secs(remaining as u64)),
        );
        Ok(())
    }
}
