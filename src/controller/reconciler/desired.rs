//! # Desired State
//!
//! Turns a snapshot of observed source services into the catalog
//! registrations that should exist under the active configuration.
//!
//! Every source that passes the namespace filter and is syncable appears in
//! the result, including sources with no endpoints. Those carry an empty
//! registration set so that a later endpoint is an add to a tracked source.

use crate::catalog::{CatalogRegistration, RegistrationKey, ServiceTarget};
use crate::config::SyncConfig;
use crate::constants::{
    EXTERNAL_SOURCE_KUBERNETES, META_KEY_EXTERNAL_SOURCE, META_KEY_K8S_NAME,
    META_KEY_K8S_NAMESPACE,
};
use crate::controller::reconciler::namespace::effective_namespace;
use crate::controller::reconciler::naming::resolve_service_name;
use crate::source::{SourceKey, SourceService};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Registrations wanted for one source service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredSource {
    pub target: ServiceTarget,
    pub registrations: BTreeMap<RegistrationKey, CatalogRegistration>,
}

/// Registrations wanted for every synced source service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    pub sources: BTreeMap<SourceKey, DesiredSource>,
}

impl DesiredState {
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.sources.values().map(|s| s.registrations.len()).sum()
    }

    /// Catalog namespaces referenced by at least one desired registration
    #[must_use]
    pub fn namespaces(&self) -> BTreeSet<String> {
        self.sources
            .values()
            .filter(|s| !s.registrations.is_empty())
            .map(|s| s.target.namespace.clone())
            .collect()
    }
}

/// Catalog placement of a source service under `config`
#[must_use]
pub fn resolve_target(service: &SourceService, config: &SyncConfig) -> ServiceTarget {
    let namespace = effective_namespace(&service.key.namespace, &config.policy);
    let name = match &service.name_override {
        Some(name) => name.clone(),
        None => format!(
            "{}{}",
            config.service_prefix,
            resolve_service_name(
                &service.key.namespace,
                &service.key.name,
                config.add_namespace_suffix
            )
        ),
    };
    ServiceTarget {
        namespace,
        service: name,
    }
}

/// Build the desired registration set from a point-in-time snapshot
///
/// Registration keys are unique across sources. When two sources resolve to
/// the same key, the first in source-key order keeps it.
#[must_use]
pub fn build_desired(snapshot: &[SourceService], config: &SyncConfig) -> DesiredState {
    let mut claimed: BTreeMap<RegistrationKey, SourceKey> = BTreeMap::new();
    let mut sources = BTreeMap::new();

    let mut ordered: Vec<&SourceService> = snapshot
        .iter()
        .filter(|s| s.syncable && config.namespace_filter.allows(&s.key.namespace))
        .collect();
    ordered.sort_by(|a, b| a.key.cmp(&b.key));

    for service in ordered {
        let target = resolve_target(service, config);
        let tags = registration_tags(service, &config.k8s_tag);
        let meta = registration_meta(service);

        let mut registrations = BTreeMap::new();
        for endpoint in &service.endpoints {
            let key = RegistrationKey {
                namespace: target.namespace.clone(),
                service: target.service.clone(),
                address: endpoint.address.clone(),
                port: endpoint.port,
            };
            if let Some(owner) = claimed.get(&key) {
                warn!(
                    "Registration {} from {} already claimed by {}, skipping",
                    key, service.key, owner
                );
                continue;
            }
            claimed.insert(key.clone(), service.key.clone());
            registrations.insert(
                key.clone(),
                CatalogRegistration {
                    key,
                    tags: tags.clone(),
                    meta: meta.clone(),
                },
            );
        }

        sources.insert(
            service.key.clone(),
            DesiredSource {
                target,
                registrations,
            },
        );
    }

    DesiredState { sources }
}

/// Registration tag set: the configured tag first, then source tags, without duplicates
fn registration_tags(service: &SourceService, k8s_tag: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    std::iter::once(k8s_tag)
        .chain(service.tags.iter().map(String::as_str))
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && seen.insert(tag.to_string()))
        .map(ToString::to_string)
        .collect()
}

/// Source metadata plus the ownership marker and provenance keys
///
/// The reserved keys always win over source metadata with the same name.
fn registration_meta(service: &SourceService) -> BTreeMap<String, String> {
    let mut meta = service.meta.clone();
    meta.insert(
        META_KEY_EXTERNAL_SOURCE.to_string(),
        EXTERNAL_SOURCE_KUBERNETES.to_string(),
    );
    meta.insert(
        META_KEY_K8S_NAMESPACE.to_string(),
        service.key.namespace.clone(),
    );
    meta.insert(META_KEY_K8S_NAME.to_string(), service.key.name.clone());
    meta
}
