//! # In-Memory Catalog
//!
//! A [`CatalogClient`] that keeps namespaces and registrations in process.
//!
//! Behaves like a namespace-enabled catalog: `default` always exists,
//! registering into a missing namespace fails, and deregistering a missing
//! entry succeeds. Every mutating call is appended to a write log so callers
//! can assert on ordering and on the absence of writes. Failures can be
//! injected per namespace.

use crate::catalog::{CatalogClient, CatalogNamespace, CatalogRegistration, RegistrationKey};
use crate::constants::DEFAULT_NAMESPACE;
use crate::error::CatalogError;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A mutating call recorded by [`InMemoryCatalog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogWrite {
    Register(RegistrationKey),
    Deregister(RegistrationKey),
    NamespaceCreate(String),
    PolicyAttach { namespace: String, policy: String },
}

impl CatalogWrite {
    #[must_use]
    pub fn is_deregister(&self) -> bool {
        matches!(self, Self::Deregister(_))
    }

    #[must_use]
    pub fn is_register(&self) -> bool {
        matches!(self, Self::Register(_))
    }
}

#[derive(Debug, Default)]
struct Inner {
    namespaces: BTreeMap<String, CatalogNamespace>,
    registrations: BTreeMap<RegistrationKey, CatalogRegistration>,
    writes: Vec<CatalogWrite>,
    failing_namespaces: BTreeSet<String>,
    failing_namespace_creates: BTreeSet<String>,
    failing_reads: bool,
}

/// In-process catalog
#[derive(Debug)]
pub struct InMemoryCatalog {
    inner: Mutex<Inner>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    /// Create a catalog containing only the `default` namespace
    #[must_use]
    pub fn new() -> Self {
        let mut inner = Inner::default();
        inner.namespaces.insert(
            DEFAULT_NAMESPACE.to_string(),
            CatalogNamespace {
                name: DEFAULT_NAMESPACE.to_string(),
                ..CatalogNamespace::default()
            },
        );
        Self {
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a namespace without recording a write
    pub fn insert_namespace(&self, namespace: CatalogNamespace) {
        self.lock()
            .namespaces
            .insert(namespace.name.clone(), namespace);
    }

    /// Add or replace a registration without recording a write
    ///
    /// The namespace is created on the fly if needed.
    pub fn insert_registration(&self, registration: CatalogRegistration) {
        let mut inner = self.lock();
        let namespace = registration.key.namespace.clone();
        inner
            .namespaces
            .entry(namespace.clone())
            .or_insert_with(|| CatalogNamespace {
                name: namespace,
                ..CatalogNamespace::default()
            });
        inner
            .registrations
            .insert(registration.key.clone(), registration);
    }

    /// All registrations, owned or not, in key order
    #[must_use]
    pub fn registrations(&self) -> Vec<CatalogRegistration> {
        self.lock().registrations.values().cloned().collect()
    }

    /// Registrations in one namespace, in key order
    #[must_use]
    pub fn registrations_in(&self, namespace: &str) -> Vec<CatalogRegistration> {
        self.lock()
            .registrations
            .values()
            .filter(|r| r.key.namespace == namespace)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn contains(&self, key: &RegistrationKey) -> bool {
        self.lock().registrations.contains_key(key)
    }

    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<CatalogNamespace> {
        self.lock().namespaces.get(name).cloned()
    }

    #[must_use]
    pub fn namespace_names(&self) -> Vec<String> {
        self.lock().namespaces.keys().cloned().collect()
    }

    /// Mutating calls since creation or the last [`Self::clear_writes`]
    #[must_use]
    pub fn writes(&self) -> Vec<CatalogWrite> {
        self.lock().writes.clone()
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Make registrations and deregistrations in `namespace` fail
    pub fn fail_writes_in(&self, namespace: &str) {
        self.lock()
            .failing_namespaces
            .insert(namespace.to_string());
    }

    /// Make creation of namespace `name` fail
    pub fn fail_namespace_create(&self, name: &str) {
        self.lock()
            .failing_namespace_creates
            .insert(name.to_string());
    }

    /// Make every read fail
    pub fn fail_reads(&self, fail: bool) {
        self.lock().failing_reads = fail;
    }

    pub fn clear_failures(&self) {
        let mut inner = self.lock();
        inner.failing_namespaces.clear();
        inner.failing_namespace_creates.clear();
        inner.failing_reads = false;
    }
}

fn injected(what: &str) -> CatalogError {
    CatalogError::transport(format!("injected failure: {what}"))
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn register(&self, registration: &CatalogRegistration) -> Result<(), CatalogError> {
        let mut inner = self.lock();
        let key = &registration.key;
        if inner.failing_namespaces.contains(&key.namespace) {
            return Err(injected(&format!("register {key}")));
        }
        if !inner.namespaces.contains_key(&key.namespace) {
            return Err(CatalogError::NotFound {
                kind: "namespace",
                name: key.namespace.clone(),
            });
        }
        inner
            .registrations
            .insert(key.clone(), registration.clone());
        inner.writes.push(CatalogWrite::Register(key.clone()));
        Ok(())
    }

    async fn deregister(&self, key: &RegistrationKey) -> Result<(), CatalogError> {
        let mut inner = self.lock();
        if inner.failing_namespaces.contains(&key.namespace) {
            return Err(injected(&format!("deregister {key}")));
        }
        inner.registrations.remove(key);
        inner.writes.push(CatalogWrite::Deregister(key.clone()));
        Ok(())
    }

    async fn list_owned(&self, namespace: &str) -> Result<Vec<CatalogRegistration>, CatalogError> {
        let inner = self.lock();
        if inner.failing_reads {
            return Err(injected("list_owned"));
        }
        Ok(inner
            .registrations
            .values()
            .filter(|r| r.key.namespace == namespace && r.is_owned())
            .cloned()
            .collect())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, CatalogError> {
        let inner = self.lock();
        if inner.failing_reads {
            return Err(injected("list_namespaces"));
        }
        Ok(inner.namespaces.keys().cloned().collect())
    }

    async fn namespace_create(&self, namespace: &CatalogNamespace) -> Result<(), CatalogError> {
        let mut inner = self.lock();
        if inner.failing_namespace_creates.contains(&namespace.name) {
            return Err(injected(&format!("namespace_create {}", namespace.name)));
        }
        if inner.namespaces.contains_key(&namespace.name) {
            return Err(CatalogError::invalid_request(format!(
                "namespace '{}' already exists",
                namespace.name
            )));
        }
        inner
            .namespaces
            .insert(namespace.name.clone(), namespace.clone());
        inner
            .writes
            .push(CatalogWrite::NamespaceCreate(namespace.name.clone()));
        Ok(())
    }

    async fn namespace_read(&self, name: &str) -> Result<Option<CatalogNamespace>, CatalogError> {
        let inner = self.lock();
        if inner.failing_reads {
            return Err(injected("namespace_read"));
        }
        Ok(inner.namespaces.get(name).cloned())
    }

    async fn policy_attach(&self, namespace: &str, policy: &str) -> Result<(), CatalogError> {
        let mut inner = self.lock();
        let Some(existing) = inner.namespaces.get_mut(namespace) else {
            return Err(CatalogError::NotFound {
                kind: "namespace",
                name: namespace.to_string(),
            });
        };
        if !existing.policy_defaults.iter().any(|p| p == policy) {
            existing.policy_defaults.push(policy.to_string());
        }
        inner.writes.push(CatalogWrite::PolicyAttach {
            namespace: namespace.to_string(),
            policy: policy.to_string(),
        });
        Ok(())
    }
}

/// [`InMemoryCatalog`] whose registrations take `delay` to complete
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct SlowRegisterCatalog {
    pub(crate) inner: InMemoryCatalog,
    delay: std::time::Duration,
}

#[cfg(test)]
impl SlowRegisterCatalog {
    pub(crate) fn new(delay: std::time::Duration) -> Self {
        Self {
            inner: InMemoryCatalog::new(),
            delay,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl CatalogClient for SlowRegisterCatalog {
    async fn register(&self, registration: &CatalogRegistration) -> Result<(), CatalogError> {
        tokio::time::sleep(self.delay).await;
        self.inner.register(registration).await
    }

    async fn deregister(&self, key: &RegistrationKey) -> Result<(), CatalogError> {
        self.inner.deregister(key).await
    }

    async fn list_owned(&self, namespace: &str) -> Result<Vec<CatalogRegistration>, CatalogError> {
        self.inner.list_owned(namespace).await
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, CatalogError> {
        self.inner.list_namespaces().await
    }

    async fn namespace_create(&self, namespace: &CatalogNamespace) -> Result<(), CatalogError> {
        self.inner.namespace_create(namespace).await
    }

    async fn namespace_read(&self, name: &str) -> Result<Option<CatalogNamespace>, CatalogError> {
        self.inner.namespace_read(name).await
    }

    async fn policy_attach(&self, namespace: &str, policy: &str) -> Result<(), CatalogError> {
        self.inner.policy_attach(namespace, policy).await
    }
}
