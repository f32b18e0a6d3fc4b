//! # Request Types
//!
//! Consul HTTP API request bodies.
//!
//! Field names follow Consul's PascalCase JSON schema:
//! https://developer.hashicorp.com/consul/api-docs/catalog
//! https://developer.hashicorp.com/consul/api-docs/namespaces

use crate::catalog::{CatalogNamespace, CatalogRegistration, RegistrationKey};
use crate::constants::{EXTERNAL_SOURCE_KUBERNETES, META_KEY_EXTERNAL_SOURCE};
use serde::Serialize;
use std::collections::BTreeMap;

/// Body of `PUT /v1/catalog/register`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterRequest {
    pub node: String,
    pub address: String,
    pub node_meta: BTreeMap<String, String>,
    pub service: ServiceDefinition,
    /// Leaves node-level data untouched when the node already exists
    pub skip_node_update: bool,
}

/// Service section of a catalog registration
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceDefinition {
    #[serde(rename = "ID")]
    pub id: String,
    pub service: String,
    pub tags: Vec<String>,
    pub meta: BTreeMap<String, String>,
    pub port: u16,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl RegisterRequest {
    /// Build the request for `registration` on the sync node
    ///
    /// `Namespace` is only sent when the catalog has namespaces enabled.
    pub fn new(
        node: &str,
        node_address: &str,
        registration: &CatalogRegistration,
        namespaces_enabled: bool,
    ) -> Self {
        let mut node_meta = BTreeMap::new();
        node_meta.insert(
            META_KEY_EXTERNAL_SOURCE.to_string(),
            EXTERNAL_SOURCE_KUBERNETES.to_string(),
        );

        let key = &registration.key;
        Self {
            node: node.to_string(),
            address: node_address.to_string(),
            node_meta,
            service: ServiceDefinition {
                id: key.service_id(),
                service: key.service.clone(),
                tags: registration.tags.clone(),
                meta: registration.meta.clone(),
                port: key.port,
                address: key.address.clone(),
                namespace: namespaces_enabled.then(|| key.namespace.clone()),
            },
            skip_node_update: true,
        }
    }
}

/// Body of `PUT /v1/catalog/deregister`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeregisterRequest {
    pub node: String,
    #[serde(rename = "ServiceID")]
    pub service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl DeregisterRequest {
    pub fn new(node: &str, key: &RegistrationKey, namespaces_enabled: bool) -> Self {
        Self {
            node: node.to_string(),
            service_id: key.service_id(),
            namespace: namespaces_enabled.then(|| key.namespace.clone()),
        }
    }
}

/// Body of `PUT /v1/namespace` and `PUT /v1/namespace/{name}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamespaceRequest {
    pub name: String,
    pub description: String,
    pub meta: BTreeMap<String, String>,
    #[serde(rename = "ACLs")]
    pub acls: NamespaceAcls,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamespaceAcls {
    pub policy_defaults: Vec<PolicyLink>,
}

/// Reference to an ACL policy by name
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyLink {
    pub name: String,
}

impl From<&CatalogNamespace> for NamespaceRequest {
    fn from(namespace: &CatalogNamespace) -> Self {
        Self {
            name: namespace.name.clone(),
            description: namespace.description.clone(),
            meta: namespace.meta.clone(),
            acls: NamespaceAcls {
                policy_defaults: namespace
                    .policy_defaults
                    .iter()
                    .map(|name| PolicyLink { name: name.clone() })
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registration() -> CatalogRegistration {
        let mut meta = BTreeMap::new();
        meta.insert("external-source".to_string(), "kubernetes".to_string());
        CatalogRegistration {
            key: RegistrationKey {
                namespace: "dest".to_string(),
                service: "foo".to_string(),
                address: "1.1.1.1".to_string(),
                port: 80,
            },
            tags: vec!["k8s".to_string()],
            meta,
        }
    }

    #[test]
    fn test_register_request_with_namespaces() {
        let request = RegisterRequest::new("k8s-sync", "127.0.0.1", &registration(), true);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "Node": "k8s-sync",
                "Address": "127.0.0.1",
                "NodeMeta": {"external-source": "kubernetes"},
                "Service": {
                    "ID": "foo-1.1.1.1-80",
                    "Service": "foo",
                    "Tags": ["k8s"],
                    "Meta": {"external-source": "kubernetes"},
                    "Port": 80,
                    "Address": "1.1.1.1",
                    "Namespace": "dest"
                },
                "SkipNodeUpdate": true
            })
        );
    }

    #[test]
    fn test_register_request_omits_namespace_when_disabled() {
        let request = RegisterRequest::new("k8s-sync", "127.0.0.1", &registration(), false);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value["Service"].get("Namespace").is_none());
    }

    #[test]
    fn test_namespace_request_policy_defaults() {
        let namespace = CatalogNamespace {
            name: "dest".to_string(),
            description: "Auto-generated by consul-k8s".to_string(),
            meta: BTreeMap::new(),
            policy_defaults: vec!["cross-ns".to_string()],
        };
        let value = serde_json::to_value(NamespaceRequest::from(&namespace)).unwrap();
        assert_eq!(value["ACLs"], json!({"PolicyDefaults": [{"Name": "cross-ns"}]}));
    }
}
