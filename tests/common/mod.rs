//! Common test utilities for Pact integration tests
//!
//! Provides rustls crypto provider setup and a Consul client pointed at a
//! Pact mock server.

use catalog_sync_controller::catalog::consul::{ConsulCatalog, ConsulClientConfig};
use std::sync::Once;
use std::time::Duration;

static RUSTLS_INIT: Once = Once::new();

/// Node name every contract expects registrations on
pub const NODE_NAME: &str = "k8s-sync";

/// ACL token every contract expects
pub const TOKEN: &str = "test-token";

/// Initialize rustls crypto provider for tests
///
/// Must run before any async operation that uses rustls. Safe to call from
/// every test.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // ring matches the main application
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// Base URL of a mock server without the trailing slash
pub fn base_url(url: impl std::fmt::Display) -> String {
    url.to_string().trim_end_matches('/').to_string()
}

/// Consul client for the mock server at `address`
pub fn consul_catalog(address: &str, namespaces_enabled: bool) -> ConsulCatalog {
    ConsulCatalog::new(ConsulClientConfig {
        address: address.to_string(),
        token: Some(TOKEN.to_string()),
        node_name: NODE_NAME.to_string(),
        node_address: "127.0.0.1".to_string(),
        namespaces_enabled,
        request_timeout: Duration::from_secs(5),
    })
    .expect("Failed to create Consul client")
}
