//! # Namespace Policy
//!
//! Maps a source (Kubernetes) namespace to the catalog namespace its services
//! are registered in.

use crate::constants::DEFAULT_NAMESPACE;
use std::fmt;

/// How source namespaces map onto catalog namespaces
///
/// Fixed for the lifetime of a process; a different policy on the next run
/// shows up as a migration in the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceMappingPolicy {
    /// Catalog namespaces are not used
    Disabled,
    /// Every source namespace maps to the same catalog namespace
    SingleDestination(String),
    /// Every source namespace maps to `prefix + namespace`
    Mirroring { prefix: String },
}

impl NamespaceMappingPolicy {
    /// Build a policy from the raw namespace settings
    ///
    /// Mirroring wins over a destination namespace, and neither applies when
    /// namespace support is off. An empty destination falls back to `default`.
    #[must_use]
    pub fn from_settings(
        enable_namespaces: bool,
        destination_namespace: &str,
        enable_mirroring: bool,
        mirroring_prefix: &str,
    ) -> Self {
        if !enable_namespaces {
            return Self::Disabled;
        }
        if enable_mirroring {
            return Self::Mirroring {
                prefix: mirroring_prefix.to_string(),
            };
        }
        let destination = destination_namespace.trim();
        if destination.is_empty() {
            Self::SingleDestination(DEFAULT_NAMESPACE.to_string())
        } else {
            Self::SingleDestination(destination.to_string())
        }
    }

    #[must_use]
    pub fn namespaces_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl fmt::Display for NamespaceMappingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::SingleDestination(ns) => write!(f, "destination({ns})"),
            Self::Mirroring { prefix } => write!(f, "mirroring(prefix={prefix:?})"),
        }
    }
}

/// Resolve the catalog namespace for `source_namespace`
///
/// `None` means namespaces are disabled and the namespace should be ignored.
#[must_use]
pub fn resolve_namespace(source_namespace: &str, policy: &NamespaceMappingPolicy) -> Option<String> {
    match policy {
        NamespaceMappingPolicy::Disabled => None,
        NamespaceMappingPolicy::SingleDestination(ns) => Some(ns.clone()),
        NamespaceMappingPolicy::Mirroring { prefix } => Some(format!("{prefix}{source_namespace}")),
    }
}

/// Resolve the catalog namespace registrations are actually written to
///
/// Same as [`resolve_namespace`] with the disabled case collapsed onto `default`.
#[must_use]
pub fn effective_namespace(source_namespace: &str, policy: &NamespaceMappingPolicy) -> String {
    resolve_namespace(source_namespace, policy).unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_ignores_namespace() {
        assert_eq!(resolve_namespace("foo", &NamespaceMappingPolicy::Disabled), None);
        assert_eq!(
            effective_namespace("foo", &NamespaceMappingPolicy::Disabled),
            "default"
        );
    }

    #[test]
    fn test_single_destination_ignores_source() {
        let policy = NamespaceMappingPolicy::SingleDestination("dest".to_string());
        assert_eq!(resolve_namespace("foo", &policy).as_deref(), Some("dest"));
        assert_eq!(resolve_namespace("bar", &policy).as_deref(), Some("dest"));
    }

    #[test]
    fn test_mirroring_with_and_without_prefix() {
        let policy = NamespaceMappingPolicy::Mirroring {
            prefix: String::new(),
        };
        assert_eq!(resolve_namespace("foo", &policy).as_deref(), Some("foo"));

        let policy = NamespaceMappingPolicy::Mirroring {
            prefix: "prefix-".to_string(),
        };
        assert_eq!(resolve_namespace("foo", &policy).as_deref(), Some("prefix-foo"));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let policy = NamespaceMappingPolicy::Mirroring {
            prefix: "k8s-".to_string(),
        };
        let first = resolve_namespace("team-a", &policy);
        for _ in 0..10 {
            assert_eq!(resolve_namespace("team-a", &policy), first);
        }
    }

    #[test]
    fn test_mirroring_takes_precedence_over_destination() {
        let policy = NamespaceMappingPolicy::from_settings(true, "dest", true, "p-");
        assert_eq!(
            policy,
            NamespaceMappingPolicy::Mirroring {
                prefix: "p-".to_string()
            }
        );
    }

    #[test]
    fn test_settings_without_namespace_support() {
        let policy = NamespaceMappingPolicy::from_settings(false, "dest", true, "p-");
        assert_eq!(policy, NamespaceMappingPolicy::Disabled);
        assert!(!policy.namespaces_enabled());
    }

    #[test]
    fn test_empty_destination_falls_back_to_default() {
        let policy = NamespaceMappingPolicy::from_settings(true, "  ", false, "");
        assert_eq!(
            policy,
            NamespaceMappingPolicy::SingleDestination("default".to_string())
        );
    }
}
