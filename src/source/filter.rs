//! # Namespace Filter
//!
//! Allow/deny lists deciding which source namespaces are synced.

use crate::constants::NAMESPACE_WILDCARD;
use std::collections::BTreeSet;

/// Allow/deny namespace lists
///
/// Deny always wins. `*` in either list matches every namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceFilter {
    allow: BTreeSet<String>,
    deny: BTreeSet<String>,
}

impl Default for NamespaceFilter {
    /// Allow everything, deny nothing
    fn default() -> Self {
        Self::new([NAMESPACE_WILDCARD], std::iter::empty::<&str>())
    }
}

impl NamespaceFilter {
    pub fn new<A, D>(allow: A, deny: D) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let normalize = |s: &str| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        Self {
            allow: allow.into_iter().filter_map(|s| normalize(s.as_ref())).collect(),
            deny: deny.into_iter().filter_map(|s| normalize(s.as_ref())).collect(),
        }
    }

    /// Whether services in `namespace` should be synced
    #[must_use]
    pub fn allows(&self, namespace: &str) -> bool {
        if self.deny.contains(NAMESPACE_WILDCARD) || self.deny.contains(namespace) {
            return false;
        }
        self.allow.contains(NAMESPACE_WILDCARD) || self.allow.contains(namespace)
    }
}
