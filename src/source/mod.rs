//! # Source
//!
//! Observed orchestrator-side services and the snapshot the reconciler reads.
//!
//! Watchers never touch the snapshot directly. They send [`SourceEvent`]s
//! into a bounded channel, and [`run_consumer`] is the only task applying
//! them to the [`SourceStore`]. A pass takes a point-in-time copy with
//! [`SourceStore::snapshot`] and never sees a moving target.

pub mod filter;
pub mod kubernetes;

pub use filter::NamespaceFilter;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, info};

/// Identity of a source service: (namespace, name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey {
    pub namespace: String,
    pub name: String,
}

impl SourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A reachable (address, port) pair of a source service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

/// An observed orchestrator service
///
/// The controller only ever reads these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceService {
    pub key: SourceKey,
    pub endpoints: BTreeSet<Endpoint>,
    /// Extra tags requested on the source object
    pub tags: Vec<String>,
    /// Extra registration metadata requested on the source object
    pub meta: BTreeMap<String, String>,
    /// Whether the source object asks to be synced
    pub syncable: bool,
    /// Explicit catalog service name, bypassing prefix and suffix rules
    pub name_override: Option<String>,
}

impl SourceService {
    /// A syncable service with no endpoints, tags or metadata
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: SourceKey::new(namespace, name),
            endpoints: BTreeSet::new(),
            tags: Vec::new(),
            meta: BTreeMap::new(),
            syncable: true,
            name_override: None,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, address: impl Into<String>, port: u16) -> Self {
        self.endpoints.insert(Endpoint::new(address, port));
        self
    }
}

/// A change notification produced by a watcher
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A service was added or updated
    Applied(SourceService),
    /// A service was removed
    Deleted(SourceKey),
    /// The watch (re)listed everything; replaces the whole snapshot
    Restarted(Vec<SourceService>),
}

/// Shared, synchronized view of all observed source services
#[derive(Debug)]
pub struct SourceStore {
    services: RwLock<BTreeMap<SourceKey, SourceService>>,
    ready: watch::Sender<bool>,
}

impl Default for SourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceStore {
    #[must_use]
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            services: RwLock::new(BTreeMap::new()),
            ready,
        }
    }

    /// Apply a single event to the snapshot
    pub async fn apply(&self, event: SourceEvent) {
        let mut services = self.services.write().await;
        match event {
            SourceEvent::Applied(service) => {
                debug!("Source service applied: {}", service.key);
                services.insert(service.key.clone(), service);
            }
            SourceEvent::Deleted(key) => {
                debug!("Source service deleted: {}", key);
                services.remove(&key);
            }
            SourceEvent::Restarted(listed) => {
                info!("Source listing complete: {} service(s)", listed.len());
                *services = listed
                    .into_iter()
                    .map(|service| (service.key.clone(), service))
                    .collect();
                drop(services);
                self.ready.send_replace(true);
            }
        }
    }

    /// Point-in-time copy of every observed service, in key order
    pub async fn snapshot(&self) -> Vec<SourceService> {
        self.services.read().await.values().cloned().collect()
    }

    /// Whether the initial listing has completed
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until the initial listing has completed
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        if rx.wait_for(|ready| *ready).await.is_err() {
            debug!("Source readiness channel closed");
        }
    }
}

/// Drain watcher events into the store until every sender is dropped
pub async fn run_consumer(store: std::sync::Arc<SourceStore>, mut events: mpsc::Receiver<SourceEvent>) {
    while let Some(event) = events.recv().await {
        store.apply(event).await;
    }
    debug!("Source event channel closed, consumer exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_restart_replaces_snapshot_and_marks_ready() {
        let store = SourceStore::new();
        store
            .apply(SourceEvent::Applied(SourceService::new("default", "stale")))
            .await;
        assert!(!store.is_ready());

        store
            .apply(SourceEvent::Restarted(vec![
                SourceService::new("foo", "foo").with_endpoint("1.1.1.1", 80),
            ]))
            .await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].key, SourceKey::new("foo", "foo"));
        assert!(store.is_ready());
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let store = SourceStore::new();
        store
            .apply(SourceEvent::Applied(SourceService::new("default", "web")))
            .await;
        let before = store.snapshot().await;

        store
            .apply(SourceEvent::Deleted(SourceKey::new("default", "web")))
            .await;

        assert_eq!(before.len(), 1);
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_consumer_drains_channel() {
        let store = Arc::new(SourceStore::new());
        let (tx, rx) = mpsc::channel(4);
        let consumer = tokio::spawn(run_consumer(store.clone(), rx));

        tx.send(SourceEvent::Restarted(vec![])).await.unwrap();
        tx.send(SourceEvent::Applied(SourceService::new("foo", "foo")))
            .await
            .unwrap();
        drop(tx);
        consumer.await.unwrap();

        store.wait_ready().await;
        assert_eq!(store.snapshot().await.len(), 1);
    }
}
