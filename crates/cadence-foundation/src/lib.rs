//! # cadence-foundation
//!
//! Foundation layer for Cadence:
//! - Error: central error taxonomy shared across the workspace
//! - Config: validated per-tenant settings
//! - Cache: TTL store, request fingerprinting, disk-backed token store

pub mod cache;
pub mod config;
pub mod error;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    parse_interval, AuthMode, TenantContext, TenantSettings, TenantSettingsDto,
    DEFAULT_CACHE_TTL, DEFAULT_PREFETCH_DEPTH,
};

// ============================================================================
// Cache
// ============================================================================
pub use cache::{
    canonical_json, fingerprint, hash_bytes, hash_str, spawn_sweeper, Expiration, SecretStore,
    TokenStore, TtlStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY,
};
