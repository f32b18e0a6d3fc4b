//! # Configuration
//!
//! - [`SyncConfig`]: what gets synced and where, built once from [`Args`]
//! - [`ControllerConfig`]: runtime tuning from environment variables
//!
//! Both are immutable once built and passed by value to the components that
//! need them.

pub mod args;
pub mod controller;
pub mod duration;

pub use args::Args;
pub use controller::ControllerConfig;
pub use duration::parse_duration;

use crate::catalog::consul::ConsulClientConfig;
use crate::constants::DEFAULT_CONSUL_K8S_TAG;
use crate::controller::reconciler::NamespaceMappingPolicy;
use crate::error::ConfigError;
use crate::source::kubernetes::ConversionRules;
use crate::source::NamespaceFilter;
use std::time::Duration;

/// Everything the reconciliation engine needs to know about what to sync
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub policy: NamespaceMappingPolicy,
    pub add_namespace_suffix: bool,
    pub namespace_filter: NamespaceFilter,
    /// Prefix added to every catalog service name
    pub service_prefix: String,
    /// Tag added to every registration
    pub k8s_tag: String,
    /// Policy attached to namespaces this controller creates
    pub cross_namespace_acl_policy: Option<String>,
    pub write_interval: Duration,
    /// How often the catalog is re-read to correct external drift
    pub catalog_poll_interval: Duration,
    pub conversion: ConversionRules,
    /// Kubernetes namespace to watch, all when `None`
    pub watch_namespace: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            policy: NamespaceMappingPolicy::Disabled,
            add_namespace_suffix: false,
            namespace_filter: NamespaceFilter::default(),
            service_prefix: String::new(),
            k8s_tag: DEFAULT_CONSUL_K8S_TAG.to_string(),
            cross_namespace_acl_policy: None,
            write_interval: Duration::from_secs(30),
            catalog_poll_interval: Duration::from_secs(60),
            conversion: ConversionRules::default(),
            watch_namespace: None,
        }
    }
}

impl SyncConfig {
    /// Validate flags and build the sync configuration
    ///
    /// Inconsistent namespace settings are not errors: mirroring overrides a
    /// destination namespace, and both are ignored without namespace support.
    ///
    /// # Errors
    /// Returns an error for unparseable durations or an empty registration tag
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let write_interval = parse_duration(&args.consul_write_interval).map_err(|e| {
            ConfigError::InvalidDuration {
                flag: "consul-write-interval",
                reason: e.to_string(),
            }
        })?;
        let catalog_poll_interval = parse_duration(&args.catalog_poll_interval).map_err(|e| {
            ConfigError::InvalidDuration {
                flag: "catalog-poll-interval",
                reason: e.to_string(),
            }
        })?;

        let k8s_tag = args.consul_k8s_tag.trim().to_string();
        if k8s_tag.is_empty() {
            return Err(ConfigError::InvalidValue {
                flag: "consul-k8s-tag",
                reason: "tag cannot be empty".to_string(),
            });
        }

        if args.consul_node_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                flag: "consul-node-name",
                reason: "node name cannot be empty".to_string(),
            });
        }

        let policy = NamespaceMappingPolicy::from_settings(
            args.enable_namespaces,
            &args.consul_destination_namespace,
            args.enable_k8s_namespace_mirroring,
            &args.k8s_namespace_mirroring_prefix,
        );

        // Namespace defaults only exist when namespaces do
        let cross_namespace_acl_policy = args
            .consul_cross_namespace_acl_policy
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty() && policy.namespaces_enabled())
            .map(ToString::to_string);

        Ok(Self {
            policy,
            add_namespace_suffix: args.add_k8s_namespace_suffix,
            namespace_filter: NamespaceFilter::new(
                &args.allow_k8s_namespaces,
                &args.deny_k8s_namespaces,
            ),
            service_prefix: args.consul_service_prefix.clone(),
            k8s_tag,
            cross_namespace_acl_policy,
            write_interval,
            catalog_poll_interval,
            conversion: ConversionRules {
                default_sync: args.k8s_default_sync,
                sync_cluster_ip: args.sync_clusterip_services,
            },
            watch_namespace: args
                .k8s_watch_namespace
                .clone()
                .filter(|ns| !ns.trim().is_empty()),
        })
    }

    /// Consul client settings matching this configuration
    pub fn consul_client_config(&self, args: &Args, controller: &ControllerConfig) -> ConsulClientConfig {
        ConsulClientConfig {
            address: args.consul_address.clone(),
            token: args.consul_token.clone(),
            node_name: args.consul_node_name.clone(),
            node_address: args.consul_node_address.clone(),
            namespaces_enabled: self.policy.namespaces_enabled(),
            request_timeout: controller.catalog_request_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(flags: &[&str]) -> Result<SyncConfig, ConfigError> {
        let mut argv = vec!["catalog-sync-controller"];
        argv.extend_from_slice(flags);
        SyncConfig::from_args(&Args::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_default_flags_match_default_config() {
        let config = parse(&[]).unwrap();
        let default = SyncConfig::default();
        assert_eq!(config.write_interval, default.write_interval);
        assert_eq!(config.catalog_poll_interval, default.catalog_poll_interval);
        assert_eq!(config.policy, NamespaceMappingPolicy::Disabled);
        assert!(!config.namespace_filter.allows("kube-system"));
        assert!(config.namespace_filter.allows("default"));
    }

    #[test]
    fn test_destination_namespace() {
        let config = parse(&[
            "--enable-namespaces",
            "--consul-destination-namespace=dest",
            "--consul-write-interval=500ms",
        ])
        .unwrap();
        assert_eq!(
            config.policy,
            NamespaceMappingPolicy::SingleDestination("dest".to_string())
        );
        assert_eq!(config.write_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_mirroring_overrides_destination() {
        let config = parse(&[
            "--enable-namespaces",
            "--consul-destination-namespace=dest",
            "--enable-k8s-namespace-mirroring",
            "--k8s-namespace-mirroring-prefix=prefix-",
        ])
        .unwrap();
        assert_eq!(
            config.policy,
            NamespaceMappingPolicy::Mirroring {
                prefix: "prefix-".to_string()
            }
        );
    }

    #[test]
    fn test_acl_policy_ignored_without_namespaces() {
        let config = parse(&["--consul-cross-namespace-acl-policy=cross-namespace-policy"]).unwrap();
        assert_eq!(config.cross_namespace_acl_policy, None);

        let config = parse(&[
            "--enable-namespaces",
            "--consul-cross-namespace-acl-policy=cross-namespace-policy",
        ])
        .unwrap();
        assert_eq!(
            config.cross_namespace_acl_policy.as_deref(),
            Some("cross-namespace-policy")
        );
    }

    #[test]
    fn test_invalid_interval_names_flag() {
        let err = parse(&["--consul-write-interval=soon"]).unwrap_err();
        assert!(err.to_string().contains("--consul-write-interval"));
    }

    #[test]
    fn test_empty_tag_is_rejected() {
        assert!(parse(&["--consul-k8s-tag= "]).is_err());
    }

    #[test]
    fn test_empty_node_name_is_rejected() {
        let err = parse(&["--consul-node-name="]).unwrap_err();
        assert!(err.to_string().contains("--consul-node-name"));
    }
}
