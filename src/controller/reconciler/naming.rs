//! # Service Naming
//!
//! Maps a source service to its catalog service name.

/// Resolve the catalog service name for `name` in `source_namespace`
///
/// With `add_namespace_suffix` the source namespace is appended so that
/// same-named services from different namespaces stay distinct once they
/// share a catalog namespace.
#[must_use]
pub fn resolve_service_name(source_namespace: &str, name: &str, add_namespace_suffix: bool) -> String {
    if add_namespace_suffix {
        format!("{name}-{source_namespace}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_unchanged_without_suffix() {
        assert_eq!(resolve_service_name("foo", "foo", false), "foo");
        assert_eq!(resolve_service_name("bar", "web", false), "web");
    }

    #[test]
    fn test_suffix_disambiguates_namespaces() {
        assert_eq!(resolve_service_name("foo", "foo", true), "foo-foo");
        assert_ne!(
            resolve_service_name("team-a", "web", true),
            resolve_service_name("team-b", "web", true)
        );
    }
}
