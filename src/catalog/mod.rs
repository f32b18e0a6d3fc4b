//! # Catalog
//!
//! Interface to the external service catalog the controller writes into.
//!
//! The reconciler only talks to the catalog through [`CatalogClient`], which
//! keeps the diff/apply logic independent of the HTTP layer:
//! - [`consul::ConsulCatalog`] speaks Consul's HTTP API
//! - [`memory::InMemoryCatalog`] keeps everything in process

use crate::constants::{EXTERNAL_SOURCE_KUBERNETES, META_KEY_EXTERNAL_SOURCE};
use crate::error::CatalogError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

pub mod consul;
pub mod memory;

pub use consul::ConsulCatalog;
pub use memory::InMemoryCatalog;

/// Resolved catalog placement of a source service: (namespace, service name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceTarget {
    pub namespace: String,
    pub service: String,
}

impl fmt::Display for ServiceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.service)
    }
}

/// Identity of a single catalog registration
///
/// Two registrations with the same key are the same catalog entry; everything
/// else about a registration (tags, metadata) is an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationKey {
    pub namespace: String,
    pub service: String,
    pub address: String,
    pub port: u16,
}

impl RegistrationKey {
    /// Service instance ID on the sync node, unique per (service, address, port)
    #[must_use]
    pub fn service_id(&self) -> String {
        format!("{}-{}-{}", self.service, self.address, self.port)
    }

    #[must_use]
    pub fn target(&self) -> ServiceTarget {
        ServiceTarget {
            namespace: self.namespace.clone(),
            service: self.service.clone(),
        }
    }
}

impl fmt::Display for RegistrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}:{}",
            self.namespace, self.service, self.address, self.port
        )
    }
}

/// A service instance entry in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRegistration {
    pub key: RegistrationKey,
    pub tags: Vec<String>,
    pub meta: BTreeMap<String, String>,
}

impl CatalogRegistration {
    /// Whether this entry carries the ownership marker
    #[must_use]
    pub fn is_owned(&self) -> bool {
        self.meta
            .get(META_KEY_EXTERNAL_SOURCE)
            .is_some_and(|v| v == EXTERNAL_SOURCE_KUBERNETES)
    }
}

/// A catalog namespace, as created or as read back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogNamespace {
    pub name: String,
    pub description: String,
    pub meta: BTreeMap<String, String>,
    /// Names of ACL policies attached as namespace defaults
    pub policy_defaults: Vec<String>,
}

impl CatalogNamespace {
    /// Whether this namespace carries the ownership marker
    #[must_use]
    pub fn is_owned(&self) -> bool {
        self.meta
            .get(META_KEY_EXTERNAL_SOURCE)
            .is_some_and(|v| v == EXTERNAL_SOURCE_KUBERNETES)
    }
}

/// Client for the external catalog
///
/// All operations are synchronous from the caller's point of view and are
/// expected to be idempotent on the catalog side: registering an existing
/// entry overwrites it, deregistering a missing one succeeds.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Create or overwrite a registration
    async fn register(&self, registration: &CatalogRegistration) -> Result<(), CatalogError>;

    /// Remove a registration
    async fn deregister(&self, key: &RegistrationKey) -> Result<(), CatalogError>;

    /// List registrations in `namespace` that carry the ownership marker
    async fn list_owned(&self, namespace: &str) -> Result<Vec<CatalogRegistration>, CatalogError>;

    /// List the names of all namespaces the catalog knows about
    async fn list_namespaces(&self) -> Result<Vec<String>, CatalogError>;

    /// Create a namespace
    async fn namespace_create(&self, namespace: &CatalogNamespace) -> Result<(), CatalogError>;

    /// Read a namespace, `None` if it does not exist
    async fn namespace_read(&self, name: &str) -> Result<Option<CatalogNamespace>, CatalogError>;

    /// Attach an ACL policy as a default policy of an existing namespace
    async fn policy_attach(&self, namespace: &str, policy: &str) -> Result<(), CatalogError>;
}
