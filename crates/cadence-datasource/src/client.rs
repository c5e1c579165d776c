//! Upstream HTTP client
//!
//! Two fixed upstream surfaces: the token endpoint (POST, form-encoded
//! grants) and the resource base URL (GET, bearer auth, arbitrary path and
//! query parameters). Any HTTP status >= 400 is terminal; retry policy, if
//! any, belongs to the caller.

use crate::models::TokenExchangeResponse;
use cadence_foundation::{Error, Result};
use reqwest::Url;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the upstream REST API. One per tenant instance; the inner
/// `reqwest::Client` pools connections across all calls.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
}

impl UpstreamClient {
    pub fn new(base_url: impl Into<String>, token_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("cannot build http client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            token_url: token_url.into(),
        })
    }

    /// GET a resource endpoint with bearer auth. Returns the raw response
    /// body; result-shape parsing is the caller's concern. Dropping the
    /// returned future aborts the in-flight call.
    pub async fn query(
        &self,
        endpoint: &str,
        params: &Map<String, Value>,
        access_token: &str,
    ) -> Result<Vec<u8>> {
        let url = build_request_url(&self.base_url, endpoint, params)?;
        debug!(url = %url, "upstream API query");

        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let reason = status.canonical_reason().unwrap_or("unknown").to_string();
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                reason
            } else {
                format!("{}: {}", reason, body)
            };
            return Err(Error::upstream_call(status.as_u16(), message));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::RequestFailed(e.to_string()))?;
        Ok(body.to_vec())
    }

    /// One-time authorization-code exchange.
    pub async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        auth_code: &str,
    ) -> Result<TokenExchangeResponse> {
        self.token_grant(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", auth_code),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Mint a new access token from a refresh token.
    pub async fn refresh_access_token(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenExchangeResponse> {
        self.token_grant(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn token_grant(&self, form: &[(&str, &str)]) -> Result<TokenExchangeResponse> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamAuth(format!(
                "token exchange failed, status: {}",
                status
            )));
        }

        response
            .json::<TokenExchangeResponse>()
            .await
            .map_err(|e| Error::Parse(format!("cannot parse token response: {}", e)))
    }
}

/// Join the base URL with the endpoint path and URL-encoded parameters.
/// JSON string values are rendered unquoted; other scalars use their JSON
/// rendering.
fn build_request_url(base_url: &str, endpoint: &str, params: &Map<String, Value>) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );
    let mut url =
        Url::parse(&joined).map_err(|e| Error::Parse(format!("invalid request url: {}", e)))?;

    // The query serializer leaves a bare `?` behind for an empty map.
    if !params.is_empty() {
        let mut query = url.query_pairs_mut();
        for (param, value) in params {
            query.append_pair(param, &normalize_param_value(value));
        }
    }
    Ok(url)
}

fn normalize_param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
