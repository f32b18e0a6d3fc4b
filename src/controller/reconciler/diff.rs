//! # Differ
//!
//! Computes the catalog operations that move applied state towards desired
//! state. Pure: nothing here touches the catalog.
//!
//! Per source service:
//! - untracked: register everything desired
//! - placement changed: deregister everything applied, register everything desired
//! - otherwise: deregister applied keys no longer desired, register desired keys
//!   not applied, re-register keys whose tags or metadata changed
//!
//! Tracked sources that are no longer desired and orphaned registrations are
//! deregistered entirely.

use crate::catalog::{CatalogRegistration, RegistrationKey};
use crate::controller::reconciler::desired::DesiredState;
use crate::controller::reconciler::state::SyncState;
use crate::source::SourceKey;
use std::collections::BTreeMap;
use tracing::info;

/// A registration to remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    /// Tracked source the registration belongs to, `None` for orphans
    pub source: Option<SourceKey>,
    pub key: RegistrationKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateKind {
    /// Not in the catalog yet
    New,
    /// In the catalog with different attributes
    Update,
}

/// A registration to write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creation {
    pub source: SourceKey,
    pub registration: CatalogRegistration,
    pub kind: CreateKind,
}

/// Operations for one pass
///
/// All deletions are applied before any creation, so a creation never races
/// a deletion of the same service name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub deletes: Vec<Deletion>,
    pub creates: Vec<Creation>,
}

impl Plan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.creates.is_empty()
    }

    /// Creations grouped by target catalog namespace
    #[must_use]
    pub fn creates_by_namespace(&self) -> BTreeMap<&str, Vec<&Creation>> {
        let mut grouped: BTreeMap<&str, Vec<&Creation>> = BTreeMap::new();
        for creation in &self.creates {
            grouped
                .entry(creation.registration.key.namespace.as_str())
                .or_default()
                .push(creation);
        }
        grouped
    }
}

/// Diff desired state against applied state
#[must_use]
pub fn plan(desired: &DesiredState, state: &SyncState) -> Plan {
    let mut plan = Plan::default();

    for (source, wanted) in &desired.sources {
        let Some(tracked) = state.get(source) else {
            plan.creates
                .extend(wanted.registrations.values().map(|r| Creation {
                    source: source.clone(),
                    registration: r.clone(),
                    kind: CreateKind::New,
                }));
            continue;
        };

        let migrating = tracked
            .target
            .as_ref()
            .is_some_and(|previous| *previous != wanted.target);
        if migrating && !tracked.registrations.is_empty() {
            if let Some(previous) = &tracked.target {
                info!(
                    "🔀 Migrating {} from {} to {}",
                    source, previous, wanted.target
                );
            }
        }

        for key in tracked.registrations.keys() {
            if migrating || !wanted.registrations.contains_key(key) {
                plan.deletes.push(Deletion {
                    source: Some(source.clone()),
                    key: key.clone(),
                });
            }
        }

        for (key, registration) in &wanted.registrations {
            let kind = match tracked.registrations.get(key) {
                Some(applied) if !migrating && applied == registration => continue,
                Some(_) if !migrating => CreateKind::Update,
                _ => CreateKind::New,
            };
            plan.creates.push(Creation {
                source: source.clone(),
                registration: registration.clone(),
                kind,
            });
        }
    }

    for (source, tracked) in state.sources() {
        if desired.sources.contains_key(source) {
            continue;
        }
        plan.deletes
            .extend(tracked.registrations.keys().map(|key| Deletion {
                source: Some(source.clone()),
                key: key.clone(),
            }));
    }

    plan.deletes.extend(state.orphans().map(|r| Deletion {
        source: None,
        key: r.key.clone(),
    }));

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ServiceTarget;
    use crate::config::SyncConfig;
    use crate::controller::reconciler::desired::build_desired;
    use crate::controller::reconciler::NamespaceMappingPolicy;
    use crate::source::SourceService;

    fn destination(ns: &str) -> SyncConfig {
        SyncConfig {
            policy: NamespaceMappingPolicy::SingleDestination(ns.to_string()),
            ..SyncConfig::default()
        }
    }

    fn apply(plan: &Plan, state: &mut SyncState, desired: &DesiredState) {
        for deletion in &plan.deletes {
            state.record_deregistered(deletion.source.as_ref(), &deletion.key);
        }
        for creation in &plan.creates {
            state.record_registered(&creation.source, creation.registration.clone());
        }
        for (source, wanted) in &desired.sources {
            state.set_target(source, wanted.target.clone());
        }
    }

    #[test]
    fn test_untracked_source_creates_everything() {
        let snapshot = vec![SourceService::new("foo", "foo")
            .with_endpoint("1.1.1.1", 80)
            .with_endpoint("2.2.2.2", 80)];
        let desired = build_desired(&snapshot, &SyncConfig::default());

        let plan = plan(&desired, &SyncState::new());
        assert!(plan.deletes.is_empty());
        assert_eq!(plan.creates.len(), 2);
        assert!(plan.creates.iter().all(|c| c.kind == CreateKind::New));
    }

    #[test]
    fn test_unchanged_state_plans_nothing() {
        let snapshot = vec![SourceService::new("foo", "foo").with_endpoint("1.1.1.1", 80)];
        let desired = build_desired(&snapshot, &SyncConfig::default());
        let mut state = SyncState::new();
        apply(&plan(&desired, &state), &mut state, &desired);

        assert!(plan(&desired, &state).is_empty());
    }

    #[test]
    fn test_endpoint_change_is_set_difference() {
        let config = SyncConfig::default();
        let before = build_desired(
            &[SourceService::new("foo", "foo")
                .with_endpoint("1.1.1.1", 80)
                .with_endpoint("2.2.2.2", 80)],
            &config,
        );
        let mut state = SyncState::new();
        apply(&plan(&before, &state), &mut state, &before);

        let after = build_desired(
            &[SourceService::new("foo", "foo")
                .with_endpoint("2.2.2.2", 80)
                .with_endpoint("3.3.3.3", 80)],
            &config,
        );
        let plan = plan(&after, &state);
        assert_eq!(plan.deletes.len(), 1);
        assert_eq!(plan.deletes[0].key.address, "1.1.1.1");
        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].registration.key.address, "3.3.3.3");
    }

    #[test]
    fn test_attribute_change_reregisters() {
        let config = SyncConfig::default();
        let service = SourceService::new("foo", "foo").with_endpoint("1.1.1.1", 80);
        let before = build_desired(&[service.clone()], &config);
        let mut state = SyncState::new();
        apply(&plan(&before, &state), &mut state, &before);

        let mut tagged = service;
        tagged.tags.push("v2".to_string());
        let after = build_desired(&[tagged], &config);

        let plan = plan(&after, &state);
        assert!(plan.deletes.is_empty());
        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].kind, CreateKind::Update);
    }

    #[test]
    fn test_placement_change_migrates_everything() {
        let snapshot = vec![SourceService::new("foo", "foo").with_endpoint("1.1.1.1", 80)];
        let first = build_desired(&snapshot, &destination("first"));
        let mut state = SyncState::new();
        apply(&plan(&first, &state), &mut state, &first);

        let second = build_desired(&snapshot, &destination("second"));
        let plan = plan(&second, &state);

        assert_eq!(plan.deletes.len(), 1);
        assert_eq!(plan.deletes[0].key.namespace, "first");
        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].registration.key.namespace, "second");
    }

    #[test]
    fn test_empty_tracked_source_gets_add() {
        let config = SyncConfig::default();
        let mut state = SyncState::new();
        state.set_target(
            &SourceKey::new("foo", "foo"),
            ServiceTarget {
                namespace: "default".to_string(),
                service: "foo".to_string(),
            },
        );

        let desired = build_desired(
            &[SourceService::new("foo", "foo").with_endpoint("1.1.1.1", 80)],
            &config,
        );
        let plan = plan(&desired, &state);
        assert!(plan.deletes.is_empty());
        assert_eq!(plan.creates.len(), 1);
    }

    #[test]
    fn test_removed_source_and_orphans_are_deleted() {
        let config = SyncConfig::default();
        let before = build_desired(
            &[SourceService::new("foo", "foo").with_endpoint("1.1.1.1", 80)],
            &config,
        );
        let mut state = SyncState::new();
        apply(&plan(&before, &state), &mut state, &before);

        let plan = plan(&DesiredState::default(), &state);
        assert_eq!(plan.deletes.len(), 1);
        assert_eq!(plan.deletes[0].source, Some(SourceKey::new("foo", "foo")));
        assert!(plan.creates.is_empty());
    }

    #[test]
    fn test_creates_grouped_by_namespace() {
        let config = SyncConfig {
            policy: NamespaceMappingPolicy::Mirroring {
                prefix: String::new(),
            },
            ..SyncConfig::default()
        };
        let desired = build_desired(
            &[
                SourceService::new("foo", "a").with_endpoint("1.1.1.1", 80),
                SourceService::new("foo", "b").with_endpoint("1.1.1.2", 80),
                SourceService::new("bar", "c").with_endpoint("1.1.1.3", 80),
            ],
            &config,
        );

        let plan = plan(&desired, &SyncState::new());
        let grouped = plan.creates_by_namespace();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["foo"].len(), 2);
        assert_eq!(grouped["bar"].len(), 1);
    }
}
