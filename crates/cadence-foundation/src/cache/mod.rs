//! Caching primitives
//!
//! - [`hash`] - request fingerprinting (canonical JSON + SHA-256)
//! - [`store`] - concurrent TTL map with lazy expiry and periodic sweep
//! - [`disk`] - tenant-scoped plaintext secret files
//! - [`token`] - credential cache combining the TTL map with disk fallback

pub mod disk;
pub mod hash;
pub mod store;
pub mod token;

pub use disk::SecretStore;
pub use hash::{canonical_json, fingerprint, hash_bytes, hash_str};
pub use store::{spawn_sweeper, Expiration, TtlStore};
pub use token::{TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
