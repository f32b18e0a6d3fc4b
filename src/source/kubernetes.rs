//! # Kubernetes Source
//!
//! Watches `Service` objects and turns them into [`SourceEvent`]s.
//!
//! Only endpoints that are reachable from outside the cluster network are
//! reported: LoadBalancer ingress addresses, and the cluster IP of ClusterIP
//! services when enabled. NodePort and ExternalName services are observed
//! but produce no endpoints.

use crate::config::ControllerConfig;
use crate::constants::{
    ANNOTATION_SERVICE_META_PREFIX, ANNOTATION_SERVICE_NAME, ANNOTATION_SERVICE_PORT,
    ANNOTATION_SERVICE_SYNC, ANNOTATION_SERVICE_TAGS,
};
use crate::controller::backoff::FibonacciBackoff;
use crate::observability::metrics;
use crate::runtime::error_policy::{classify_watch_error, restart_delay};
use crate::source::{Endpoint, SourceEvent, SourceKey, SourceService};
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Service, ServicePort};
use kube::api::Api;
use kube::Client;
use kube_runtime::watcher;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Rules for turning a `Service` into a [`SourceService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionRules {
    /// Sync services that carry no sync annotation
    pub default_sync: bool,
    /// Register the cluster IP of ClusterIP services
    pub sync_cluster_ip: bool,
}

impl Default for ConversionRules {
    fn default() -> Self {
        Self {
            default_sync: true,
            sync_cluster_ip: true,
        }
    }
}

/// Convert a `Service` into a [`SourceService`]
///
/// Returns `None` for objects without a name or namespace.
#[must_use]
pub fn service_from_k8s(service: &Service, rules: &ConversionRules) -> Option<SourceService> {
    let name = service.metadata.name.as_deref()?;
    let namespace = service.metadata.namespace.as_deref()?;
    let annotations = service.metadata.annotations.clone().unwrap_or_default();

    let syncable = annotations
        .get(ANNOTATION_SERVICE_SYNC)
        .and_then(|v| parse_bool(v))
        .unwrap_or(rules.default_sync);

    let spec = service.spec.clone().unwrap_or_default();
    let ports = spec.ports.clone().unwrap_or_default();
    let port = select_port(&ports, annotations.get(ANNOTATION_SERVICE_PORT).map(String::as_str));

    let service_type = spec.type_.as_deref().unwrap_or("ClusterIP");
    let addresses: Vec<String> = match service_type {
        "LoadBalancer" => service
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .map(|ingress| {
                ingress
                    .iter()
                    .filter_map(|i| i.ip.clone().or_else(|| i.hostname.clone()))
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        "ClusterIP" if rules.sync_cluster_ip => spec
            .cluster_ip
            .clone()
            .filter(|ip| !ip.is_empty() && ip != "None")
            .into_iter()
            .collect(),
        _ => Vec::new(),
    };

    let endpoints: BTreeSet<Endpoint> = addresses
        .into_iter()
        .map(|address| Endpoint { address, port })
        .collect();

    let tags = annotations
        .get(ANNOTATION_SERVICE_TAGS)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    let meta: BTreeMap<String, String> = annotations
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix(ANNOTATION_SERVICE_META_PREFIX)
                .filter(|key| !key.is_empty())
                .map(|key| (key.to_string(), v.clone()))
        })
        .collect();

    let name_override = annotations
        .get(ANNOTATION_SERVICE_NAME)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    Some(SourceService {
        key: SourceKey::new(namespace, name),
        endpoints,
        tags,
        meta,
        syncable,
        name_override,
    })
}

/// Pick the registered port: annotation (number or port name), else the first port
///
/// A service without ports registers port 0.
fn select_port(ports: &[ServicePort], annotation: Option<&str>) -> u16 {
    let by_annotation = annotation.map(str::trim).and_then(|value| {
        value.parse::<u16>().ok().or_else(|| {
            ports
                .iter()
                .find(|p| p.name.as_deref() == Some(value))
                .and_then(|p| u16::try_from(p.port).ok())
        })
    });

    by_annotation
        .or_else(|| ports.first().and_then(|p| u16::try_from(p.port).ok()))
        .unwrap_or(0)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Watches `Service` objects and forwards changes to the source store
pub struct KubernetesSource {
    api: Api<Service>,
    rules: ConversionRules,
    backoff: FibonacciBackoff,
    restart_delay: Duration,
}

impl std::fmt::Debug for KubernetesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubernetesSource")
            .field("rules", &self.rules)
            .field("restart_delay", &self.restart_delay)
            .finish_non_exhaustive()
    }
}

enum StreamOutcome {
    Shutdown,
    Ended,
    Closed,
    Failed(String),
}

impl KubernetesSource {
    /// Watch services in `namespace`, or in every namespace when `None`
    pub fn new(
        client: Client,
        namespace: Option<&str>,
        rules: ConversionRules,
        controller_config: &ControllerConfig,
    ) -> Self {
        let api = match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        };
        Self {
            api,
            rules,
            backoff: FibonacciBackoff::new(
                controller_config.backoff_start_duration(),
                controller_config.backoff_max_duration(),
            ),
            restart_delay: controller_config.watch_restart_delay_duration(),
        }
    }

    /// Run until shutdown is signalled or the event channel closes
    ///
    /// Every (re)start of the watch lists all services first and emits a
    /// single [`SourceEvent::Restarted`] with the full listing.
    pub async fn run(mut self, events: mpsc::Sender<SourceEvent>, mut shutdown: watch::Receiver<bool>) {
        info!("Starting Kubernetes service watch...");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.watch_once(&events, &mut shutdown).await;
            let delay = match outcome {
                StreamOutcome::Shutdown => break,
                StreamOutcome::Closed => {
                    debug!("Source event channel closed, stopping watch");
                    break;
                }
                StreamOutcome::Ended => {
                    warn!("Service watch stream ended, restarting...");
                    Some(self.restart_delay)
                }
                StreamOutcome::Failed(error) => {
                    let class = classify_watch_error(&error);
                    restart_delay(class, &error, &mut self.backoff, self.restart_delay)
                }
            };
            metrics::increment_watch_restarts();

            if let Some(delay) = delay {
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    _ = shutdown.changed() => break,
                }
            }
        }
        info!("Kubernetes service watch stopped");
    }

    async fn watch_once(
        &mut self,
        events: &mpsc::Sender<SourceEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> StreamOutcome {
        let mut stream = watcher(self.api.clone(), watcher::Config::default()).boxed();
        let mut listing: Vec<SourceService> = Vec::new();

        loop {
            let next = tokio::select! {
                next = stream.next() => next,
                _ = shutdown.changed() => return StreamOutcome::Shutdown,
            };

            let event = match next {
                None => return StreamOutcome::Ended,
                Some(Err(e)) => return StreamOutcome::Failed(format!("{e:?}")),
                Some(Ok(event)) => event,
            };

            let forwarded = match event {
                watcher::Event::Init => {
                    listing.clear();
                    None
                }
                watcher::Event::InitApply(service) => {
                    listing.extend(service_from_k8s(&service, &self.rules));
                    None
                }
                watcher::Event::InitDone => {
                    self.backoff.reset();
                    Some(SourceEvent::Restarted(std::mem::take(&mut listing)))
                }
                watcher::Event::Apply(service) => {
                    service_from_k8s(&service, &self.rules).map(SourceEvent::Applied)
                }
                watcher::Event::Delete(service) => {
                    match (service.metadata.namespace, service.metadata.name) {
                        (Some(namespace), Some(name)) => {
                            Some(SourceEvent::Deleted(SourceKey::new(namespace, name)))
                        }
                        _ => None,
                    }
                }
            };

            if let Some(event) = forwarded {
                if events.send(event).await.is_err() {
                    return StreamOutcome::Closed;
                }
            }
        }
    }
}
