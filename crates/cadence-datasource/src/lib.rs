//! # cadence-datasource
//!
//! Per-tenant front end for a rate-limited upstream REST API:
//! - Auth: managed access tokens with refresh-token resolution and rotation
//! - Cache: fingerprint-keyed read-through response cache
//! - Prefetch: background cache warming under a concurrency gate
//! - Instance: one wired facade per tenant, owned by the host

pub mod auth;
pub mod authcache;
pub mod client;
pub mod instance;
pub mod models;
pub mod prefetcher;
pub mod response_cache;

// ============================================================================
// Auth
// ============================================================================
pub use auth::{CredentialManager, RefreshTokenSource, TokenEndpoint};
pub use authcache::{AuthRegistry, TenantAuthCache};

// ============================================================================
// Client & Models
// ============================================================================
pub use client::UpstreamClient;
pub use models::{ApiRequest, ApiResponse, TokenExchangeResponse};

// ============================================================================
// Caching & Prefetch
// ============================================================================
pub use prefetcher::{PrefetchHandle, PrefetchTarget, Prefetcher};
pub use response_cache::ResponseCache;

// ============================================================================
// Instance
// ============================================================================
pub use instance::{TenantInstance, API_URL, TOKEN_URL};
