//! Error types for Cadence
//!
//! All core errors live in one central enum so the datasource layer and the
//! host boundary share a single taxonomy.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Cadence error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Credentials
    // ========================================================================
    /// No usable refresh token could be resolved. Recoverable only by the
    /// user completing the authorization flow again.
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// The upstream token endpoint rejected an exchange or refresh.
    #[error("Upstream auth error: {0}")]
    UpstreamAuth(String),

    // ========================================================================
    // Upstream resource calls
    // ========================================================================
    /// Non-2xx status on a resource call, carrying status text and body.
    #[error("Upstream call failed: {status} {message}")]
    UpstreamCall { status: u16, message: String },

    /// Transport-level failure (connection, DNS, timeout, cancelled).
    #[error("Request failed: {0}")]
    RequestFailed(String),

    // ========================================================================
    // Local state
    // ========================================================================
    /// Disk read/write failure. Always non-fatal; in-memory state stays
    /// authoritative.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Parse error: {0}")]
    Parse(String),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors that the user can act on directly (re-authorize, fix settings).
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::NotAuthorized(_) | Error::UpstreamAuth(_)
        )
    }

    /// Errors that are absorbed locally and only logged.
    pub fn is_absorbable(&self) -> bool {
        matches!(self, Error::Persistence(_))
    }

    /// Upstream call error helper
    pub fn upstream_call(status: u16, message: impl Into<String>) -> Self {
        Error::UpstreamCall {
            status,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::NotAuthorized("no token".into()).is_user_facing());
        assert!(Error::Config("bad ttl".into()).is_user_facing());
        assert!(!Error::Persistence("disk full".into()).is_user_facing());
        assert!(Error::Persistence("disk full".into()).is_absorbable());
        assert!(!Error::upstream_call(500, "boom").is_absorbable());
    }

    #[test]
    fn test_display() {
        let err = Error::upstream_call(404, "Not Found");
        assert_eq!(err.to_string(), "Upstream call failed: 404 Not Found");
    }
}
