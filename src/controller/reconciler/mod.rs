//! # Reconciler
//!
//! Catalog reconciliation engine.
//!
//! A pass:
//! - Builds desired registrations from a source snapshot ([`desired`])
//! - Diffs them against last-applied state ([`diff`], [`state`])
//! - Ensures target namespaces exist ([`namespaces`])
//! - Applies deregistrations, then registrations ([`reconcile`])
//!
//! Applied state is rebuilt from owned catalog entries on startup and
//! periodically afterwards ([`reader`]), so nothing is persisted locally.

pub mod desired;
pub mod diff;
pub mod namespace;
pub mod namespaces;
pub mod naming;
pub mod reader;
pub mod reconcile;
pub mod state;
pub mod types;

// Re-export public API
pub use desired::{build_desired, DesiredSource, DesiredState};
pub use namespace::{effective_namespace, resolve_namespace, NamespaceMappingPolicy};
pub use namespaces::{EnsureOutcome, ManagedNamespace, NamespaceManager};
pub use naming::resolve_service_name;
pub use reconcile::Reconciler;
pub use state::{SyncState, TrackedSource};
pub use types::{PassSummary, ReconcilerError};
