//! Tenant settings
//!
//! Settings arrive from the host as a raw JSON blob. They are parsed into a
//! typed structure eagerly, with explicit defaults, so downstream code never
//! reads loose JSON fields.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default response cache TTL when none is configured.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default number of recent activities to prefetch.
pub const DEFAULT_PREFETCH_DEPTH: usize = 5;

/// How the tenant obtains its long-lived credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// One-time authorization-code exchange mints the refresh token.
    AuthorizationCode,
    /// A pre-provisioned refresh token is part of the settings.
    RefreshToken,
}

/// Raw settings shape as sent by the host. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantSettingsDto {
    pub client_id: String,
    pub client_secret: String,
    pub auth_mode: Option<AuthMode>,
    pub refresh_token: Option<String>,
    pub cache_ttl: Option<String>,
    pub oauth_pass_thru: bool,
    pub prefetch_depth: Option<usize>,
}

/// Validated per-tenant configuration. Immutable for the instance lifetime.
#[derive(Debug, Clone)]
pub struct TenantSettings {
    pub client_id: String,
    pub client_secret: String,
    pub auth_mode: AuthMode,
    /// Statically configured refresh token, only meaningful with
    /// [`AuthMode::RefreshToken`].
    pub refresh_token: Option<String>,
    pub cache_ttl: Duration,
    /// Callers supply their own access token per request; the instance holds
    /// no credential of its own and the prefetcher is skipped.
    pub oauth_pass_thru: bool,
    pub prefetch_depth: usize,
}

impl TenantSettings {
    /// Parse and validate settings from the host-provided JSON blob.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self> {
        let dto: TenantSettingsDto = serde_json::from_value(raw.clone())
            .map_err(|e| Error::Config(format!("cannot read tenant settings: {}", e)))?;
        Self::from_dto(dto)
    }

    pub fn from_dto(dto: TenantSettingsDto) -> Result<Self> {
        if dto.client_id.is_empty() {
            return Err(Error::Config("clientId is required".to_string()));
        }

        let auth_mode = dto.auth_mode.unwrap_or(AuthMode::AuthorizationCode);
        let refresh_token = dto.refresh_token.filter(|t| !t.is_empty());

        if auth_mode == AuthMode::RefreshToken && refresh_token.is_none() {
            return Err(Error::Config(
                "authMode is refresh_token but no refreshToken is configured".to_string(),
            ));
        }

        let cache_ttl = match dto.cache_ttl.as_deref() {
            Some(s) if !s.is_empty() => parse_interval(s)?,
            _ => DEFAULT_CACHE_TTL,
        };

        Ok(Self {
            client_id: dto.client_id,
            client_secret: dto.client_secret,
            auth_mode,
            refresh_token,
            cache_ttl,
            oauth_pass_thru: dto.oauth_pass_thru,
            prefetch_depth: dto.prefetch_depth.unwrap_or(DEFAULT_PREFETCH_DEPTH),
        })
    }
}

/// Identifies one upstream account/integration. Created once per instance
/// activation and owned exclusively by that instance.
#[derive(Debug, Clone)]
pub struct TenantContext {
    /// Stable tenant id, assigned by the host.
    pub id: String,
    pub settings: TenantSettings,
}

impl TenantContext {
    pub fn new(id: impl Into<String>, settings: TenantSettings) -> Self {
        Self {
            id: id.into(),
            settings,
        }
    }
}

/// Parse an interval string like `"90s"`, `"30m"`, `"1h"` or `"7d"`.
/// A bare number is taken as seconds.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (num, unit) = s.split_at(split);

    let value: u64 = num
        .parse()
        .map_err(|_| Error::Config(format!("invalid interval: {:?}", s)))?;

    let secs = match unit {
        "" | "s" => value,
        "m" => value * 60,
        "h" => value * 3600,
        "d" => value * 86400,
        _ => return Err(Error::Config(format!("invalid interval unit: {:?}", s))),
    };

    Ok(Duration::from_secs(secs))
}
