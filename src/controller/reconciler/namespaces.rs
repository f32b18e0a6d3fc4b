//! # Namespace & Policy Manager
//!
//! Makes sure a catalog namespace exists before registrations are written
//! into it. Namespaces are created with the ownership description and
//! metadata, and with the cross-namespace ACL policy as a default policy when
//! one is configured. Namespaces are never deleted.

use crate::catalog::{CatalogClient, CatalogNamespace};
use crate::constants::{
    DEFAULT_NAMESPACE, EXTERNAL_SOURCE_KUBERNETES, META_KEY_EXTERNAL_SOURCE, NAMESPACE_DESCRIPTION,
};
use crate::error::CatalogError;
use crate::observability::metrics;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// A namespace as this controller creates it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedNamespace {
    pub name: String,
    pub acl_policy: Option<String>,
}

impl ManagedNamespace {
    /// Catalog representation with the ownership marker
    #[must_use]
    pub fn spec(&self) -> CatalogNamespace {
        CatalogNamespace {
            name: self.name.clone(),
            description: NAMESPACE_DESCRIPTION.to_string(),
            meta: BTreeMap::from([(
                META_KEY_EXTERNAL_SOURCE.to_string(),
                EXTERNAL_SOURCE_KUBERNETES.to_string(),
            )]),
            policy_defaults: self.acl_policy.iter().cloned().collect(),
        }
    }
}

/// What [`NamespaceManager::ensure`] had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// Nothing: default namespace, or already ensured
    Unchanged,
    Created,
    /// An owned namespace existed without the configured policy
    PolicyAttached,
}

impl EnsureOutcome {
    #[must_use]
    pub fn changed(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Creates namespaces on demand and remembers the ones already ensured
#[derive(Debug, Default)]
pub struct NamespaceManager {
    acl_policy: Option<String>,
    known: BTreeSet<String>,
}

impl NamespaceManager {
    #[must_use]
    pub fn new(acl_policy: Option<String>) -> Self {
        Self {
            acl_policy: acl_policy.filter(|p| !p.trim().is_empty()),
            known: BTreeSet::new(),
        }
    }

    /// Ensure `name` exists, creating it if needed
    ///
    /// Cheap once a namespace is known: no catalog call is made.
    ///
    /// # Errors
    /// Returns the catalog error if the namespace could not be read, created
    /// or updated. The namespace stays unknown and is retried on the next call.
    pub async fn ensure<C>(&mut self, client: &C, name: &str) -> Result<EnsureOutcome, CatalogError>
    where
        C: CatalogClient + ?Sized,
    {
        if name == DEFAULT_NAMESPACE || self.known.contains(name) {
            return Ok(EnsureOutcome::Unchanged);
        }

        let outcome = match client.namespace_read(name).await? {
            None => {
                let managed = ManagedNamespace {
                    name: name.to_string(),
                    acl_policy: self.acl_policy.clone(),
                };
                client.namespace_create(&managed.spec()).await?;
                metrics::increment_namespaces_created();
                info!("📁 Created catalog namespace {}", name);
                EnsureOutcome::Created
            }
            Some(existing) => match &self.acl_policy {
                Some(policy)
                    if existing.is_owned()
                        && !existing.policy_defaults.iter().any(|p| p == policy) =>
                {
                    client.policy_attach(name, policy).await?;
                    info!("🔐 Attached ACL policy {} to namespace {}", policy, name);
                    EnsureOutcome::PolicyAttached
                }
                _ => {
                    debug!("Catalog namespace {} already exists", name);
                    EnsureOutcome::Unchanged
                }
            },
        };

        self.known.insert(name.to_string());
        Ok(outcome)
    }

    /// Forget `name`, so the next ensure checks the catalog again
    pub fn forget(&mut self, name: &str) {
        self.known.remove(name);
    }

    /// Forget every namespace
    pub fn clear(&mut self) {
        self.known.clear();
    }

    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        self.known.contains(name)
    }
}
