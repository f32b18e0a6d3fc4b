//! # Command-Line Arguments
//!
//! Flags accepted by the `catalog-sync-controller` binary. Flag names match
//! the established `sync-catalog` command so existing deployments carry over.

use crate::constants::{
    DEFAULT_CATALOG_POLL_INTERVAL, DEFAULT_CONSUL_ADDRESS, DEFAULT_CONSUL_K8S_TAG,
    DEFAULT_CONSUL_NODE_ADDRESS, DEFAULT_CONSUL_NODE_NAME, DEFAULT_METRICS_PORT,
    DEFAULT_NAMESPACE, DEFAULT_WRITE_INTERVAL,
};
use clap::{ArgAction, Parser};

/// Sync Kubernetes services into the Consul catalog
#[derive(Parser, Clone)]
#[command(name = "catalog-sync-controller", version, about, long_about = None)]
pub struct Args {
    /// Consul HTTP API address
    #[arg(long, env = "CONSUL_HTTP_ADDR", default_value = DEFAULT_CONSUL_ADDRESS)]
    pub consul_address: String,

    /// ACL token sent with every catalog request
    #[arg(long, env = "CONSUL_HTTP_TOKEN", hide_env_values = true)]
    pub consul_token: Option<String>,

    /// Interval between catalog write passes (e.g. 500ms, 30s, 1m)
    #[arg(long, default_value = DEFAULT_WRITE_INTERVAL)]
    pub consul_write_interval: String,

    /// Interval between full catalog reads that correct external drift
    #[arg(long, default_value = DEFAULT_CATALOG_POLL_INTERVAL)]
    pub catalog_poll_interval: String,

    /// Register services into Consul namespaces
    #[arg(long)]
    pub enable_namespaces: bool,

    /// Consul namespace every service is registered in, unless mirroring
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub consul_destination_namespace: String,

    /// Register each Kubernetes namespace's services into a same-named Consul namespace
    #[arg(long = "enable-k8s-namespace-mirroring")]
    pub enable_k8s_namespace_mirroring: bool,

    /// Prefix added to mirrored Consul namespace names
    #[arg(long = "k8s-namespace-mirroring-prefix", default_value = "")]
    pub k8s_namespace_mirroring_prefix: String,

    /// Append the Kubernetes namespace to every Consul service name
    #[arg(long = "add-k8s-namespace-suffix")]
    pub add_k8s_namespace_suffix: bool,

    /// Kubernetes namespace to sync ("*" for all); repeatable
    #[arg(long = "allow-k8s-namespace", default_values = ["*"], action = ArgAction::Append)]
    pub allow_k8s_namespaces: Vec<String>,

    /// Kubernetes namespace never synced ("*" for all); repeatable
    #[arg(
        long = "deny-k8s-namespace",
        default_values = ["kube-system", "kube-public"],
        action = ArgAction::Append
    )]
    pub deny_k8s_namespaces: Vec<String>,

    /// ACL policy attached as a default policy to every namespace created
    #[arg(long)]
    pub consul_cross_namespace_acl_policy: Option<String>,

    /// Sync services that carry no sync annotation
    #[arg(long = "k8s-default-sync", default_value_t = true, action = ArgAction::Set)]
    pub k8s_default_sync: bool,

    /// Register the cluster IP of ClusterIP services
    #[arg(long = "sync-clusterip-services", default_value_t = true, action = ArgAction::Set)]
    pub sync_clusterip_services: bool,

    /// Prefix added to every Consul service name
    #[arg(long, default_value = "")]
    pub consul_service_prefix: String,

    /// Tag added to every synced registration
    #[arg(long, default_value = DEFAULT_CONSUL_K8S_TAG)]
    pub consul_k8s_tag: String,

    /// Synthetic Consul node owning every synced registration
    #[arg(long, default_value = DEFAULT_CONSUL_NODE_NAME)]
    pub consul_node_name: String,

    /// Address recorded for the synthetic Consul node
    #[arg(long, default_value = DEFAULT_CONSUL_NODE_ADDRESS)]
    pub consul_node_address: String,

    /// Only watch services in this Kubernetes namespace
    #[arg(long = "k8s-watch-namespace")]
    pub k8s_watch_namespace: Option<String>,

    /// Log filter, overriding RUST_LOG (e.g. "debug" or "catalog_sync_controller=trace")
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Port for /metrics, /healthz and /readyz
    #[arg(long, env = "METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("consul_address", &self.consul_address)
            .field("consul_token", &self.consul_token.as_ref().map(|_| "***"))
            .field("consul_write_interval", &self.consul_write_interval)
            .field("enable_namespaces", &self.enable_namespaces)
            .field("consul_destination_namespace", &self.consul_destination_namespace)
            .field(
                "enable_k8s_namespace_mirroring",
                &self.enable_k8s_namespace_mirroring,
            )
            .finish_non_exhaustive()
    }
}
