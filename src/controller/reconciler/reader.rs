//! # Catalog State Reader
//!
//! Reads every registration this controller owns, namespace by namespace.
//! Used to seed [`super::state::SyncState`] on startup and to correct drift
//! on the catalog poll interval.

use crate::catalog::{CatalogClient, CatalogRegistration};
use crate::constants::DEFAULT_NAMESPACE;
use crate::controller::reconciler::NamespaceMappingPolicy;
use crate::error::CatalogError;
use std::collections::BTreeSet;
use tracing::debug;

/// Namespaces that may hold owned registrations
///
/// With namespace support every namespace the catalog knows is scanned, so
/// entries left under a previous mapping are found after a restart.
///
/// # Errors
/// Returns the catalog error if namespaces cannot be listed
pub async fn relevant_namespaces<C>(
    client: &C,
    policy: &NamespaceMappingPolicy,
) -> Result<BTreeSet<String>, CatalogError>
where
    C: CatalogClient + ?Sized,
{
    let mut namespaces = BTreeSet::from([DEFAULT_NAMESPACE.to_string()]);
    if policy.namespaces_enabled() {
        namespaces.extend(client.list_namespaces().await?);
    }
    Ok(namespaces)
}

/// All owned registrations in `namespaces`
///
/// # Errors
/// Fails on the first namespace that cannot be read; a partial view is never
/// returned since seeding from it would drop tracked registrations.
pub async fn read_owned<C>(
    client: &C,
    namespaces: &BTreeSet<String>,
) -> Result<Vec<CatalogRegistration>, CatalogError>
where
    C: CatalogClient + ?Sized,
{
    let mut owned = Vec::new();
    for namespace in namespaces {
        let found = client.list_owned(namespace).await?;
        debug!(
            "Read {} owned registration(s) in namespace {}",
            found.len(),
            namespace
        );
        owned.extend(found.into_iter().filter(CatalogRegistration::is_owned));
    }
    Ok(owned)
}
