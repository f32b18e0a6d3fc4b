//! # Catalog Operations
//!
//! Implementation of [`CatalogClient`] for the Consul REST API.

use super::requests::{DeregisterRequest, NamespaceRequest, RegisterRequest};
use super::responses::{NamespaceResponse, NodeServicesResponse};
use super::ConsulCatalog;
use crate::catalog::{CatalogClient, CatalogNamespace, CatalogRegistration, RegistrationKey};
use crate::constants::DEFAULT_NAMESPACE;
use crate::error::CatalogError;
use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, debug_span, info_span, Instrument};

#[async_trait]
impl CatalogClient for ConsulCatalog {
    async fn register(&self, registration: &CatalogRegistration) -> Result<(), CatalogError> {
        let span = info_span!(
            "consul.catalog.register",
            service.id = %registration.key.service_id(),
            namespace = %registration.key.namespace
        );
        async move {
            let body = RegisterRequest::new(
                self.node_name(),
                self.node_address(),
                registration,
                self.namespaces_enabled(),
            );
            let request = self.make_request(Method::PUT, "catalog/register").json(&body);
            self.execute("register", request).await?;
            debug!("Registered {}", registration.key);
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn deregister(&self, key: &RegistrationKey) -> Result<(), CatalogError> {
        let span = info_span!(
            "consul.catalog.deregister",
            service.id = %key.service_id(),
            namespace = %key.namespace
        );
        async move {
            let body = DeregisterRequest::new(self.node_name(), key, self.namespaces_enabled());
            let request = self
                .make_request(Method::PUT, "catalog/deregister")
                .json(&body);
            self.execute("deregister", request).await?;
            debug!("Deregistered {}", key);
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn list_owned(&self, namespace: &str) -> Result<Vec<CatalogRegistration>, CatalogError> {
        let span = debug_span!("consul.catalog.list_owned", namespace = %namespace);
        async move {
            let path = format!("catalog/node-services/{}", self.node_name());
            let request = self.with_namespace(self.make_request(Method::GET, &path), namespace);
            let response = self.execute("list_owned", request).await?;

            // `null` when the sync node has not been created yet
            let body: Option<NodeServicesResponse> = response.json().await?;
            let registrations: Vec<CatalogRegistration> = body
                .and_then(|b| b.services)
                .unwrap_or_default()
                .into_iter()
                .map(|entry| entry.into_registration(namespace))
                .filter(CatalogRegistration::is_owned)
                .collect();

            debug!(
                "Found {} owned registration(s) in namespace {}",
                registrations.len(),
                namespace
            );
            Ok(registrations)
        }
        .instrument(span)
        .await
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, CatalogError> {
        if !self.namespaces_enabled() {
            return Ok(vec![DEFAULT_NAMESPACE.to_string()]);
        }

        let request = self.make_request(Method::GET, "namespaces");
        let response = self.execute("list_namespaces", request).await?;
        let namespaces: Option<Vec<NamespaceResponse>> = response.json().await?;

        Ok(namespaces
            .unwrap_or_default()
            .into_iter()
            .filter(|ns| !ns.is_deleting())
            .map(|ns| ns.name)
            .collect())
    }

    async fn namespace_create(&self, namespace: &CatalogNamespace) -> Result<(), CatalogError> {
        if !self.namespaces_enabled() {
            return Err(CatalogError::invalid_request(format!(
                "cannot create namespace '{}' with namespaces disabled",
                namespace.name
            )));
        }

        let span = info_span!("consul.namespace.create", namespace = %namespace.name);
        async move {
            let request = self
                .make_request(Method::PUT, "namespace")
                .json(&NamespaceRequest::from(namespace));
            self.execute("namespace_create", request).await?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn namespace_read(&self, name: &str) -> Result<Option<CatalogNamespace>, CatalogError> {
        if !self.namespaces_enabled() {
            return Ok((name == DEFAULT_NAMESPACE).then(|| CatalogNamespace {
                name: DEFAULT_NAMESPACE.to_string(),
                ..CatalogNamespace::default()
            }));
        }

        let request = self.make_request(Method::GET, &format!("namespace/{name}"));
        let response = match self.execute("namespace_read", request).await {
            Ok(response) => response,
            Err(CatalogError::Status { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let namespace: Option<NamespaceResponse> = response.json().await?;
        Ok(namespace
            .filter(|ns| {
                if ns.is_deleting() {
                    debug!("Namespace {} is being deleted", ns.name);
                }
                !ns.is_deleting()
            })
            .map(CatalogNamespace::from))
    }

    async fn policy_attach(&self, namespace: &str, policy: &str) -> Result<(), CatalogError> {
        let span = info_span!("consul.namespace.policy_attach", namespace = %namespace, policy = %policy);
        async move {
            // Namespace updates replace the whole object, so merge into what is there
            let mut current =
                self.namespace_read(namespace)
                    .await?
                    .ok_or_else(|| CatalogError::NotFound {
                        kind: "namespace",
                        name: namespace.to_string(),
                    })?;

            if current.policy_defaults.iter().any(|p| p == policy) {
                return Ok(());
            }
            current.policy_defaults.push(policy.to_string());

            let request = self
                .make_request(Method::PUT, &format!("namespace/{namespace}"))
                .json(&NamespaceRequest::from(&current));
            self.execute("policy_attach", request).await?;
            Ok(())
        }
        .instrument(span)
        .await
    }
}
