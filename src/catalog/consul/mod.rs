//! # Consul Catalog Client
//!
//! Native REST implementation of [`CatalogClient`](crate::catalog::CatalogClient)
//! for Consul's HTTP API. Uses reqwest with rustls, which also lets it run
//! directly against Pact mock servers.
//!
//! All synced registrations live on one synthetic node. When namespaces are
//! disabled the `ns` query parameter and `Namespace` body fields are never
//! sent, and every registration is reported in the `default` namespace.
//!
//! References:
//! - [Catalog API](https://developer.hashicorp.com/consul/api-docs/catalog)
//! - [Namespaces API](https://developer.hashicorp.com/consul/api-docs/namespaces)

mod operations;
mod requests;
mod responses;

pub use requests::*;
pub use responses::*;

use crate::error::CatalogError;
use crate::observability::metrics;
use reqwest::{Client, Method};
use std::time::{Duration, Instant};
use tracing::debug;

/// Header carrying the ACL token
const TOKEN_HEADER: &str = "X-Consul-Token";

/// Connection settings for [`ConsulCatalog`]
#[derive(Clone)]
pub struct ConsulClientConfig {
    /// Base URL of the Consul HTTP API, e.g. `http://127.0.0.1:8500`
    pub address: String,
    pub token: Option<String>,
    /// Synthetic node owning every synced registration
    pub node_name: String,
    pub node_address: String,
    pub namespaces_enabled: bool,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for ConsulClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsulClientConfig")
            .field("address", &self.address)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("node_name", &self.node_name)
            .field("node_address", &self.node_address)
            .field("namespaces_enabled", &self.namespaces_enabled)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Consul catalog REST client
pub struct ConsulCatalog {
    http_client: Client,
    base_url: String,
    token: Option<String>,
    node_name: String,
    node_address: String,
    namespaces_enabled: bool,
}

impl std::fmt::Debug for ConsulCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsulCatalog")
            .field("base_url", &self.base_url)
            .field("node_name", &self.node_name)
            .field("namespaces_enabled", &self.namespaces_enabled)
            .finish_non_exhaustive()
    }
}

impl ConsulCatalog {
    /// Create a new Consul client
    ///
    /// # Errors
    /// Returns an error if the address is empty or the HTTP client cannot be built
    pub fn new(config: ConsulClientConfig) -> Result<Self, CatalogError> {
        let base_url = config.address.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(CatalogError::invalid_request("consul address is empty"));
        }

        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CatalogError::transport(format!("failed to create HTTP client: {e}")))?;

        debug!(
            "Initialized Consul client for {} (node: {}, namespaces: {})",
            base_url, config.node_name, config.namespaces_enabled
        );

        Ok(Self {
            http_client,
            base_url,
            token: config.token.filter(|t| !t.is_empty()),
            node_name: config.node_name,
            node_address: config.node_address,
            namespaces_enabled: config.namespaces_enabled,
        })
    }

    /// Build an HTTP request against `/v1/{path}` with the ACL token attached
    pub(crate) fn make_request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/{}", self.base_url, path);
        let mut request = self.http_client.request(method, &url);
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }
        request
    }

    /// Attach `?ns=` when namespaces are enabled
    pub(crate) fn with_namespace(
        &self,
        request: reqwest::RequestBuilder,
        namespace: &str,
    ) -> reqwest::RequestBuilder {
        if self.namespaces_enabled {
            request.query(&[("ns", namespace)])
        } else {
            request
        }
    }

    /// Send a request, timing it and turning non-success statuses into errors
    pub(crate) async fn execute(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, CatalogError> {
        let start = Instant::now();
        let result = request.send().await;
        metrics::observe_catalog_request_duration(operation, start.elapsed().as_secs_f64());

        let response = result?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::handle_error_response(status, body))
    }

    /// Map a Consul error response to a [`CatalogError`]
    pub(crate) fn handle_error_response(status: reqwest::StatusCode, body: String) -> CatalogError {
        match status {
            reqwest::StatusCode::BAD_REQUEST => CatalogError::InvalidRequest(body),
            _ => CatalogError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            },
        }
    }

    pub(crate) fn node_name(&self) -> &str {
        &self.node_name
    }

    pub(crate) fn node_address(&self) -> &str {
        &self.node_address
    }

    pub(crate) fn namespaces_enabled(&self) -> bool {
        self.namespaces_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(address: &str) -> ConsulClientConfig {
        ConsulClientConfig {
            address: address.to_string(),
            token: Some("secret-token".to_string()),
            node_name: "k8s-sync".to_string(),
            node_address: "127.0.0.1".to_string(),
            namespaces_enabled: true,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_empty_address_is_rejected() {
        let err = ConsulCatalog::new(config("")).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = ConsulCatalog::new(config("http://consul:8500/")).unwrap();
        let request = client
            .make_request(Method::GET, "namespaces")
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "http://consul:8500/v1/namespaces");
        assert_eq!(
            request.headers().get(TOKEN_HEADER).unwrap(),
            "secret-token"
        );
    }

    #[test]
    fn test_namespace_query_only_when_enabled() {
        let client = ConsulCatalog::new(config("http://consul:8500")).unwrap();
        let request = client
            .with_namespace(client.make_request(Method::GET, "catalog/node-services/k8s-sync"), "dest")
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("ns=dest"));

        let mut disabled = config("http://consul:8500");
        disabled.namespaces_enabled = false;
        let client = ConsulCatalog::new(disabled).unwrap();
        let request = client
            .with_namespace(client.make_request(Method::GET, "catalog/node-services/k8s-sync"), "dest")
            .build()
            .unwrap();
        assert_eq!(request.url().query(), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", config("http://consul:8500"));
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_bad_request_is_not_retryable() {
        let err = ConsulCatalog::handle_error_response(
            reqwest::StatusCode::BAD_REQUEST,
            "Invalid service address".to_string(),
        );
        assert!(!err.is_retryable());

        let err = ConsulCatalog::handle_error_response(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "rpc error\n".to_string(),
        );
        assert!(err.is_retryable());
        assert!(err.to_string().ends_with("rpc error"));
    }
}
