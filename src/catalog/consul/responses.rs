//! # Response Types
//!
//! Consul HTTP API response bodies. Consul returns `null` for empty
//! collections in several places, so most collections are optional.

use crate::catalog::{CatalogNamespace, CatalogRegistration, RegistrationKey};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Body of `GET /v1/catalog/node-services/{node}`
///
/// The whole body is `null` when the node does not exist.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeServicesResponse {
    #[serde(default)]
    pub services: Option<Vec<ServiceEntry>>,
}

/// A service instance registered on a node
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceEntry {
    #[serde(rename = "ID")]
    pub id: String,
    pub service: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub meta: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl ServiceEntry {
    /// Convert to a registration, placing it in `namespace` when Consul omits it
    pub fn into_registration(self, namespace: &str) -> CatalogRegistration {
        CatalogRegistration {
            key: RegistrationKey {
                namespace: self.namespace.unwrap_or_else(|| namespace.to_string()),
                service: self.service,
                address: self.address,
                port: self.port,
            },
            tags: self.tags.unwrap_or_default(),
            meta: self.meta.unwrap_or_default(),
        }
    }
}

/// Namespace as returned by `GET /v1/namespace/{name}` and `GET /v1/namespaces`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamespaceResponse {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub meta: Option<BTreeMap<String, String>>,
    #[serde(default, rename = "ACLs")]
    pub acls: Option<NamespaceAclsResponse>,
    /// Set while the namespace is being deleted
    #[serde(default)]
    pub deleted_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamespaceAclsResponse {
    #[serde(default)]
    pub policy_defaults: Option<Vec<PolicyLinkResponse>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyLinkResponse {
    #[serde(default, rename = "ID")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

impl NamespaceResponse {
    pub fn is_deleting(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl From<NamespaceResponse> for CatalogNamespace {
    fn from(response: NamespaceResponse) -> Self {
        Self {
            name: response.name,
            description: response.description,
            meta: response.meta.unwrap_or_default(),
            policy_defaults: response
                .acls
                .and_then(|acls| acls.policy_defaults)
                .unwrap_or_default()
                .into_iter()
                .map(|link| link.name)
                .collect(),
        }
    }
}
