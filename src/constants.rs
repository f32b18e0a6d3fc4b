//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! Catalog-facing strings (ownership marker, namespace description) must stay
//! byte-for-byte stable across releases.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Catalog namespace that always exists and is never created or deleted
pub const DEFAULT_NAMESPACE: &str = "default";

/// Metadata key carrying the ownership marker on registrations, nodes and namespaces
pub const META_KEY_EXTERNAL_SOURCE: &str = "external-source";

/// Ownership marker value
pub const EXTERNAL_SOURCE_KUBERNETES: &str = "kubernetes";

/// Metadata key linking a registration back to its source namespace
pub const META_KEY_K8S_NAMESPACE: &str = "external-k8s-ns";

/// Metadata key linking a registration back to its source service name
pub const META_KEY_K8S_NAME: &str = "external-k8s-name";

/// Description stamped on every namespace this controller creates
pub const NAMESPACE_DESCRIPTION: &str = "Auto-generated by consul-k8s";

/// Default synthetic catalog node that owns all synced registrations
pub const DEFAULT_CONSUL_NODE_NAME: &str = "k8s-sync";

/// Address recorded for the synthetic catalog node
pub const DEFAULT_CONSUL_NODE_ADDRESS: &str = "127.0.0.1";

/// Tag added to every synced registration
pub const DEFAULT_CONSUL_K8S_TAG: &str = "k8s";

/// Default Consul HTTP API address
pub const DEFAULT_CONSUL_ADDRESS: &str = "http://127.0.0.1:8500";

/// Default interval between catalog write passes
pub const DEFAULT_WRITE_INTERVAL: &str = "30s";

/// Default interval between full catalog reads used for drift correction
pub const DEFAULT_CATALOG_POLL_INTERVAL: &str = "1m";

/// Default capacity of the source event channel
pub const DEFAULT_SOURCE_CHANNEL_CAPACITY: usize = 1024;

/// Default delay before restarting the source watch after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default exponential backoff starting value for API throttling (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default exponential backoff maximum value for API throttling (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Kubernetes namespaces denied by default
pub const DEFAULT_DENY_K8S_NAMESPACES: [&str; 2] = ["kube-system", "kube-public"];

/// Wildcard accepted in allow/deny namespace lists
pub const NAMESPACE_WILDCARD: &str = "*";

/// Annotation overriding the default sync decision for a Service
pub const ANNOTATION_SERVICE_SYNC: &str = "consul.hashicorp.com/service-sync";

/// Annotation overriding the catalog service name
pub const ANNOTATION_SERVICE_NAME: &str = "consul.hashicorp.com/service-name";

/// Annotation selecting the Service port registered in the catalog (name or number)
pub const ANNOTATION_SERVICE_PORT: &str = "consul.hashicorp.com/service-port";

/// Annotation with extra comma separated tags
pub const ANNOTATION_SERVICE_TAGS: &str = "consul.hashicorp.com/service-tags";

/// Annotation prefix for extra registration metadata
pub const ANNOTATION_SERVICE_META_PREFIX: &str = "consul.hashicorp.com/service-meta-";
