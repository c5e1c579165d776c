//! Request and response payloads exchanged with the host and the upstream API

use cadence_foundation::cache::hash;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One upstream API request: endpoint path plus a parameter bag.
///
/// Parameter values keep their JSON shape; scalars are normalized into plain
/// query values at request-build time. `access_token` is set only in
/// pass-through mode and never participates in the fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    #[serde(skip)]
    pub access_token: Option<String>,
}

impl ApiRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Map::new(),
            access_token: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Content hash identifying this request for one tenant. Identical for
    /// semantically identical requests regardless of who issues them or the
    /// parameter insertion order.
    pub fn fingerprint(&self, tenant_id: &str) -> String {
        let payload = serde_json::json!({
            "tenantId": tenant_id,
            "endpoint": self.endpoint,
            "params": Value::Object(self.params.clone()),
        });
        hash::fingerprint(&payload)
    }
}

/// Parsed body of a successful upstream resource call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub result: Value,
}

impl ApiResponse {
    pub fn new(result: Value) -> Self {
        Self { result }
    }
}

/// Result of an authorization-code exchange or a token refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    /// Absolute expiry as unix seconds, as reported by the token endpoint.
    pub expires_at: i64,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_param_order_independent() {
        let a = ApiRequest::new("athlete/activities")
            .with_param("per_page", 50)
            .with_param("page", 1);
        let b = ApiRequest::new("athlete/activities")
            .with_param("page", 1)
            .with_param("per_page", 50);
        assert_eq!(a.fingerprint("t1"), b.fingerprint("t1"));
    }

    #[test]
    fn test_fingerprint_scoped_by_tenant() {
        let req = ApiRequest::new("athlete");
        assert_ne!(req.fingerprint("t1"), req.fingerprint("t2"));
    }

    #[test]
    fn test_fingerprint_ignores_access_token() {
        let mut a = ApiRequest::new("athlete");
        let b = ApiRequest::new("athlete");
        a.access_token = Some("tok".to_string());
        assert_eq!(a.fingerprint("t1"), b.fingerprint("t1"));
    }

    #[test]
    fn test_request_deserializes_from_host_payload() {
        let req: ApiRequest = serde_json::from_str(
            r#"{"endpoint":"activities/111","params":{"include_all_efforts":true}}"#,
        )
        .unwrap();
        assert_eq!(req.endpoint, "activities/111");
        assert_eq!(req.params["include_all_efforts"], true);
        assert!(req.access_token.is_none());
    }
}
