//! # Reconciler Types
//!
//! Error and result types returned by a reconciliation pass.

use crate::error::CatalogError;
use thiserror::Error;

/// Pass-level failures
///
/// Failures of individual catalog writes never fail a pass; they are counted
/// in [`PassSummary::failed`] and retried on the next one.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// Owned catalog state could not be read before the first pass
    #[error("Failed to read owned catalog state: {0}")]
    Seed(#[source] CatalogError),
}

/// Outcome of a single reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Registrations created
    pub registered: usize,
    /// Existing registrations overwritten because their attributes changed
    pub reregistered: usize,
    pub deregistered: usize,
    /// Catalog operations that failed and will be retried
    pub failed: usize,
    /// Namespaces created or updated with the ACL policy
    pub namespaces_ensured: usize,
    /// Whether the pass re-read owned catalog state first
    pub seeded: bool,
    /// Whether shutdown stopped the pass before every operation was issued
    pub interrupted: bool,
}

impl PassSummary {
    /// Number of registration writes issued successfully
    #[must_use]
    pub fn writes(&self) -> usize {
        self.registered + self.reregistered + self.deregistered
    }

    /// Whether every planned operation was applied
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && !self.interrupted
    }
}
