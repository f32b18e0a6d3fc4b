//! Pact contract tests for the Consul catalog and namespace APIs
//!
//! These tests define the contract between the Catalog Sync Controller and
//! Consul. Each one drives the real `ConsulCatalog` client against a Pact mock
//! server, so the recorded requests are exactly what the controller sends.

#[cfg(test)]
mod common;

use catalog_sync_controller::catalog::{
    CatalogClient, CatalogNamespace, CatalogRegistration, RegistrationKey,
};
use catalog_sync_controller::error::CatalogError;
use common::{base_url, consul_catalog, init_rustls, NODE_NAME, TOKEN};
use pact_consumer::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;

const CONSUMER: &str = "Catalog-Sync-Controller";
const PROVIDER: &str = "Consul";

fn registration(namespace: &str) -> CatalogRegistration {
    CatalogRegistration {
        key: RegistrationKey {
            namespace: namespace.to_string(),
            service: "web".to_string(),
            address: "1.1.1.1".to_string(),
            port: 8080,
        },
        tags: vec!["k8s".to_string()],
        meta: BTreeMap::from([
            ("external-source".to_string(), "kubernetes".to_string()),
            ("external-k8s-ns".to_string(), "foo".to_string()),
            ("external-k8s-name".to_string(), "web".to_string()),
        ]),
    }
}

#[tokio::test]
async fn test_consul_register_service_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("register a service instance on the sync node", "", |mut i| {
        i.given("namespace dest exists");
        i.request
            .method("PUT")
            .path("/v1/catalog/register")
            .header("X-Consul-Token", TOKEN)
            .json_body(json!({
                "Node": NODE_NAME,
                "Address": "127.0.0.1",
                "NodeMeta": {"external-source": "kubernetes"},
                "Service": {
                    "ID": "web-1.1.1.1-8080",
                    "Service": "web",
                    "Tags": ["k8s"],
                    "Meta": {
                        "external-source": "kubernetes",
                        "external-k8s-ns": "foo",
                        "external-k8s-name": "web"
                    },
                    "Port": 8080,
                    "Address": "1.1.1.1",
                    "Namespace": "dest"
                },
                "SkipNodeUpdate": true
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!(true));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let catalog = consul_catalog(&base_url(mock_server.url()), true);

    catalog
        .register(&registration("dest"))
        .await
        .expect("register should succeed");
}

#[tokio::test]
async fn test_consul_register_without_namespaces_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("register a service instance without namespaces", "", |mut i| {
        i.given("namespaces are not supported");
        i.request
            .method("PUT")
            .path("/v1/catalog/register")
            .header("X-Consul-Token", TOKEN)
            .json_body(json!({
                "Node": NODE_NAME,
                "Address": "127.0.0.1",
                "NodeMeta": {"external-source": "kubernetes"},
                "Service": {
                    "ID": "web-1.1.1.1-8080",
                    "Service": "web",
                    "Tags": ["k8s"],
                    "Meta": {
                        "external-source": "kubernetes",
                        "external-k8s-ns": "foo",
                        "external-k8s-name": "web"
                    },
                    "Port": 8080,
                    "Address": "1.1.1.1"
                },
                "SkipNodeUpdate": true
            }));
        i.response.status(200).json_body(json!(true));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let catalog = consul_catalog(&base_url(mock_server.url()), false);

    catalog
        .register(&registration("default"))
        .await
        .expect("register should succeed");
}

#[tokio::test]
async fn test_consul_register_rejected_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("register a service instance into a missing namespace", "", |mut i| {
        i.given("namespace missing does not exist");
        i.request
            .method("PUT")
            .path("/v1/catalog/register")
            .header("X-Consul-Token", TOKEN);
        i.response
            .status(400)
            .header("content-type", "text/plain")
            .body("Invalid namespace \"missing\"");
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let catalog = consul_catalog(&base_url(mock_server.url()), true);

    let err = catalog
        .register(&registration("missing"))
        .await
        .expect_err("register should be rejected");
    assert!(matches!(err, CatalogError::InvalidRequest(ref body) if body.contains("missing")));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_consul_deregister_service_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("deregister a service instance from the sync node", "", |mut i| {
        i.given("service web-1.1.1.1-8080 is registered in namespace dest");
        i.request
            .method("PUT")
            .path("/v1/catalog/deregister")
            .header("X-Consul-Token", TOKEN)
            .json_body(json!({
                "Node": NODE_NAME,
                "ServiceID": "web-1.1.1.1-8080",
                "Namespace": "dest"
            }));
        i.response.status(200).json_body(json!(true));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let catalog = consul_catalog(&base_url(mock_server.url()), true);

    catalog
        .deregister(&registration("dest").key)
        .await
        .expect("deregister should succeed");
}

#[tokio::test]
async fn test_consul_list_node_services_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("list services on the sync node in a namespace", "", |mut i| {
        i.given("the sync node has one synced and one foreign service in namespace dest");
        i.request
            .method("GET")
            .path(format!("/v1/catalog/node-services/{NODE_NAME}"))
            .query_param("ns", "dest")
            .header("X-Consul-Token", TOKEN);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "Node": {"Node": NODE_NAME, "Address": "127.0.0.1"},
                "Services": [
                    {
                        "ID": "web-1.1.1.1-8080",
                        "Service": "web",
                        "Tags": ["k8s"],
                        "Meta": {
                            "external-source": "kubernetes",
                            "external-k8s-ns": "foo",
                            "external-k8s-name": "web"
                        },
                        "Port": 8080,
                        "Address": "1.1.1.1",
                        "Namespace": "dest"
                    },
                    {
                        "ID": "legacy",
                        "Service": "legacy",
                        "Tags": null,
                        "Meta": null,
                        "Port": 9090,
                        "Address": "3.3.3.3",
                        "Namespace": "dest"
                    }
                ]
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let catalog = consul_catalog(&base_url(mock_server.url()), true);

    let owned = catalog
        .list_owned("dest")
        .await
        .expect("list should succeed");
    assert_eq!(owned, vec![registration("dest")]);
}

#[tokio::test]
async fn test_consul_list_missing_node_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("list services before the sync node exists", "", |mut i| {
        i.given("the sync node does not exist");
        i.request
            .method("GET")
            .path(format!("/v1/catalog/node-services/{NODE_NAME}"))
            .header("X-Consul-Token", TOKEN);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .body("null");
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let catalog = consul_catalog(&base_url(mock_server.url()), false);

    let owned = catalog
        .list_owned("default")
        .await
        .expect("list should succeed");
    assert!(owned.is_empty());
}

#[tokio::test]
async fn test_consul_list_namespaces_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("list namespaces", "", |mut i| {
        i.given("namespaces default, dest and leaving exist, leaving is being deleted");
        i.request
            .method("GET")
            .path("/v1/namespaces")
            .header("X-Consul-Token", TOKEN);
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([
                {"Name": "default", "Description": "Builtin Default Namespace"},
                {"Name": "dest", "Description": "Auto-generated by consul-k8s"},
                {"Name": "leaving", "DeletedAt": "2024-01-01T00:00:00Z"}
            ]));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let catalog = consul_catalog(&base_url(mock_server.url()), true);

    let namespaces = catalog
        .list_namespaces()
        .await
        .expect("list should succeed");
    assert_eq!(namespaces, vec!["default", "dest"]);
}

#[tokio::test]
async fn test_consul_create_namespace_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("create a namespace with a default ACL policy", "", |mut i| {
        i.given("namespace prefix-foo does not exist");
        i.request
            .method("PUT")
            .path("/v1/namespace")
            .header("X-Consul-Token", TOKEN)
            .json_body(json!({
                "Name": "prefix-foo",
                "Description": "Auto-generated by consul-k8s",
                "Meta": {"external-source": "kubernetes"},
                "ACLs": {"PolicyDefaults": [{"Name": "cross-namespace-policy"}]}
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "Name": "prefix-foo",
                "Description": "Auto-generated by consul-k8s",
                "Meta": {"external-source": "kubernetes"},
                "ACLs": {"PolicyDefaults": [{"ID": "1b5a7c9e", "Name": "cross-namespace-policy"}]}
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let catalog = consul_catalog(&base_url(mock_server.url()), true);

    let namespace = CatalogNamespace {
        name: "prefix-foo".to_string(),
        description: "Auto-generated by consul-k8s".to_string(),
        meta: BTreeMap::from([("external-source".to_string(), "kubernetes".to_string())]),
        policy_defaults: vec!["cross-namespace-policy".to_string()],
    };
    catalog
        .namespace_create(&namespace)
        .await
        .expect("create should succeed");
}

#[tokio::test]
async fn test_consul_read_missing_namespace_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("read a namespace that does not exist", "", |mut i| {
        i.given("namespace missing does not exist");
        i.request
            .method("GET")
            .path("/v1/namespace/missing")
            .header("X-Consul-Token", TOKEN);
        i.response
            .status(404)
            .header("content-type", "text/plain")
            .body("Namespace not found");
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let catalog = consul_catalog(&base_url(mock_server.url()), true);

    let namespace = catalog
        .namespace_read("missing")
        .await
        .expect("a missing namespace is not an error");
    assert!(namespace.is_none());
}

#[tokio::test]
async fn test_consul_attach_policy_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder
        .interaction("read a synced namespace without a default policy", "", |mut i| {
            i.given("namespace dest was created by the sync without an ACL policy");
            i.request
                .method("GET")
                .path("/v1/namespace/dest")
                .header("X-Consul-Token", TOKEN);
            i.response
                .status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "Name": "dest",
                    "Description": "Auto-generated by consul-k8s",
                    "Meta": {"external-source": "kubernetes"},
                    "ACLs": {"PolicyDefaults": null}
                }));
            i
        })
        .interaction("update a namespace with a default ACL policy", "", |mut i| {
            i.given("namespace dest was created by the sync without an ACL policy");
            i.request
                .method("PUT")
                .path("/v1/namespace/dest")
                .header("X-Consul-Token", TOKEN)
                .json_body(json!({
                    "Name": "dest",
                    "Description": "Auto-generated by consul-k8s",
                    "Meta": {"external-source": "kubernetes"},
                    "ACLs": {"PolicyDefaults": [{"Name": "cross-namespace-policy"}]}
                }));
            i.response
                .status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "Name": "dest",
                    "ACLs": {"PolicyDefaults": [{"ID": "1b5a7c9e", "Name": "cross-namespace-policy"}]}
                }));
            i
        });

    let mock_server = pact_builder.start_mock_server(None, None);
    let catalog = consul_catalog(&base_url(mock_server.url()), true);

    catalog
        .policy_attach("dest", "cross-namespace-policy")
        .await
        .expect("policy attach should succeed");
}
