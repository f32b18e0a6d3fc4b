//! # Sync State
//!
//! Last-known-applied mapping from source services to the catalog
//! registrations they produced.
//!
//! Only the reconciler mutates it, one entry at a time as catalog writes
//! succeed. It lives in memory and is rebuilt from the provenance metadata of
//! owned registrations after a restart.

use crate::catalog::{CatalogRegistration, RegistrationKey, ServiceTarget};
use crate::constants::{META_KEY_K8S_NAME, META_KEY_K8S_NAMESPACE};
use crate::source::SourceKey;
use std::collections::BTreeMap;
use tracing::debug;

/// What is known to be applied for one source service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedSource {
    /// Placement the registrations were written under
    ///
    /// `None` when the catalog holds registrations for this source under more
    /// than one placement, which only happens after an interrupted migration.
    pub target: Option<ServiceTarget>,
    pub registrations: BTreeMap<RegistrationKey, CatalogRegistration>,
}

/// Applied state of every tracked source, plus owned entries with no known source
#[derive(Debug, Default)]
pub struct SyncState {
    sources: BTreeMap<SourceKey, TrackedSource>,
    orphans: BTreeMap<RegistrationKey, CatalogRegistration>,
    seeded: bool,
}

impl SyncState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether owned catalog state has been read at least once
    #[must_use]
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Replace applied state with what the catalog reports
    ///
    /// Registrations are grouped by their provenance metadata; owned entries
    /// without it become orphans. Tracked sources that have nothing in the
    /// catalog are kept with an empty registration set.
    pub fn seed(&mut self, owned: Vec<CatalogRegistration>) {
        let mut sources: BTreeMap<SourceKey, TrackedSource> = BTreeMap::new();
        let mut orphans = BTreeMap::new();

        for registration in owned {
            match provenance(&registration) {
                Some(source) => {
                    sources
                        .entry(source)
                        .or_default()
                        .registrations
                        .insert(registration.key.clone(), registration);
                }
                None => {
                    debug!("Owned registration {} has no provenance", registration.key);
                    orphans.insert(registration.key.clone(), registration);
                }
            }
        }

        for tracked in sources.values_mut() {
            tracked.target = common_target(&tracked.registrations);
        }

        for (key, previous) in std::mem::take(&mut self.sources) {
            sources.entry(key).or_insert(TrackedSource {
                target: previous.target,
                registrations: BTreeMap::new(),
            });
        }

        self.sources = sources;
        self.orphans = orphans;
        self.seeded = true;
    }

    #[must_use]
    pub fn get(&self, source: &SourceKey) -> Option<&TrackedSource> {
        self.sources.get(source)
    }

    pub fn sources(&self) -> impl Iterator<Item = (&SourceKey, &TrackedSource)> {
        self.sources.iter()
    }

    /// Owned registrations that cannot be attributed to a source
    pub fn orphans(&self) -> impl Iterator<Item = &CatalogRegistration> {
        self.orphans.values()
    }

    /// Record a successful register (or re-register) for `source`
    pub fn record_registered(&mut self, source: &SourceKey, registration: CatalogRegistration) {
        self.orphans.remove(&registration.key);
        self.sources
            .entry(source.clone())
            .or_default()
            .registrations
            .insert(registration.key.clone(), registration);
    }

    /// Record a successful deregister, for a tracked source or an orphan
    pub fn record_deregistered(&mut self, source: Option<&SourceKey>, key: &RegistrationKey) {
        match source {
            Some(source) => {
                if let Some(tracked) = self.sources.get_mut(source) {
                    tracked.registrations.remove(key);
                }
            }
            None => {
                self.orphans.remove(key);
            }
        }
    }

    /// Set the placement `source` is now written under, tracking it if new
    pub fn set_target(&mut self, source: &SourceKey, target: ServiceTarget) {
        self.sources.entry(source.clone()).or_default().target = Some(target);
    }

    /// Drop tracked sources for which `keep` returns false
    pub fn retain(&mut self, mut keep: impl FnMut(&SourceKey, &TrackedSource) -> bool) {
        self.sources.retain(|key, tracked| keep(key, tracked));
    }

    /// Number of owned registrations believed to be in the catalog
    #[must_use]
    pub fn managed_count(&self) -> usize {
        self.sources
            .values()
            .map(|s| s.registrations.len())
            .sum::<usize>()
            + self.orphans.len()
    }
}

fn provenance(registration: &CatalogRegistration) -> Option<SourceKey> {
    let namespace = registration.meta.get(META_KEY_K8S_NAMESPACE)?;
    let name = registration.meta.get(META_KEY_K8S_NAME)?;
    if namespace.is_empty() || name.is_empty() {
        return None;
    }
    Some(SourceKey::new(namespace.as_str(), name.as_str()))
}

fn common_target(
    registrations: &BTreeMap<RegistrationKey, CatalogRegistration>,
) -> Option<ServiceTarget> {
    let mut targets = registrations.keys().map(RegistrationKey::target);
    let first = targets.next()?;
    let shared = targets.all(|t| t == first);
    shared.then_some(first)
}
