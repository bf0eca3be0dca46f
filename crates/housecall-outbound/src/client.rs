//! Authenticating proxy client for the voice-agent provider API.
//!
//! The dashboard calls the provider through us so the API key stays
//! server-side. Requests are forwarded nearly verbatim: caller picks
//! method, path, and body; we attach credentials and pass the
//! provider's answer back.

use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{OutboundError, Result};

/// Configuration for the call provider client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallProviderConfig {
    /// Provider API base URL.
    pub base_url: String,
    /// Bearer token for the provider API. Empty means unconfigured.
    pub api_key: String,
    /// Timeout for proxied requests.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for CallProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.retellai.com".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(30),
            user_agent: "Housecall/0.2".to_string(),
        }
    }
}

/// Response passed back to the proxy caller.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    /// HTTP status the provider returned (always 2xx here).
    pub status: u16,
    /// Provider response body, verbatim.
    pub body: String,
}

/// HTTP client that forwards dashboard requests to the provider API.
#[derive(Debug, Clone)]
pub struct CallProviderClient {
    client: reqwest::Client,
    config: CallProviderConfig,
}

impl CallProviderClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `OutboundError::Configuration` if the HTTP client cannot
    /// be built.
    pub fn new(config: CallProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                OutboundError::configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// Forwards one request to the provider API.
    ///
    /// # Errors
    ///
    /// - `Configuration` when no API key is set
    /// - `InvalidRequest` for methods we refuse to forward
    /// - `UpstreamStatus` when the provider answers outside 2xx
    /// - `Http` for transport failures
    pub async fn forward(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ProxyResponse> {
        if self.config.api_key.is_empty() {
            return Err(OutboundError::configuration("call provider API key not set"));
        }

        let method = parse_method(method)?;
        let url = join_url(&self.config.base_url, path);
        debug!(%method, %url, "forwarding request to call provider");

        let mut request = self.client.request(method, &url).bearer_auth(&self.config.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if !(200..300).contains(&status) {
            return Err(OutboundError::UpstreamStatus { status, body });
        }

        Ok(ProxyResponse { status, body })
    }
}

/// Parses and whitelists the HTTP method to forward.
fn parse_method(method: &str) -> Result<Method> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        other => Err(OutboundError::invalid_request(format!("method {other} not allowed"))),
    }
}

/// Joins base URL and path without doubling slashes.
fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> CallProviderClient {
        CallProviderClient::new(CallProviderConfig {
            base_url: server.uri(),
            api_key: "test-key".to_string(),
            ..CallProviderConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn forwards_request_with_bearer_auth() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/v2/get-call/call_123"))
            .and(matchers::header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"call_id":"call_123"}"#))
            .mount(&server)
            .await;

        let response = client_for(&server).forward("GET", "/v2/get-call/call_123", None).await;
        let response = response.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"call_id":"call_123"}"#);
    }

    #[tokio::test]
    async fn forwards_json_body() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v2/create-phone-call"))
            .and(matchers::body_json(serde_json::json!({"to_number": "+15551234567"})))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .mount(&server)
            .await;

        let body = serde_json::json!({"to_number": "+15551234567"});
        let response =
            client_for(&server).forward("POST", "v2/create-phone-call", Some(&body)).await.unwrap();
        assert_eq!(response.status, 201);
    }

    #[tokio::test]
    async fn non_success_status_is_wrapped() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such call"))
            .mount(&server)
            .await;

        let err = client_for(&server).forward("GET", "/v2/get-call/nope", None).await.unwrap_err();
        let OutboundError::UpstreamStatus { status, body } = err else {
            panic!("expected upstream status error");
        };
        assert_eq!(status, 404);
        assert_eq!(body, "no such call");
    }

    #[tokio::test]
    async fn missing_api_key_is_configuration_error() {
        let client = CallProviderClient::new(CallProviderConfig::default()).unwrap();
        let err = client.forward("GET", "/v2/get-call/c1", None).await.unwrap_err();
        assert!(matches!(err, OutboundError::Configuration(_)));
    }

    #[tokio::test]
    async fn disallowed_method_is_rejected() {
        let server = MockServer::start().await;
        let err = client_for(&server).forward("TRACE", "/anything", None).await.unwrap_err();
        assert!(matches!(err, OutboundError::InvalidRequest(_)));
    }

    #[test]
    fn url_join_avoids_double_slashes() {
        assert_eq!(join_url("http://api.test/", "/v2/call"), "http://api.test/v2/call");
        assert_eq!(join_url("http://api.test", "v2/call"), "http://api.test/v2/call");
    }
}
