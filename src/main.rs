//! # Catalog Sync Controller
//!
//! A Kubernetes controller that syncs `Service` objects into the Consul catalog.
//!
//! ## Overview
//!
//! 1. **Watching services** - Lists and watches `Service` objects in all (or one) namespaces
//! 2. **Debounced writes** - Catalog writes happen on a fixed interval, never per event
//! 3. **Namespace mapping** - Single destination namespace or mirroring with an optional prefix
//! 4. **Migration** - Registrations follow flag changes across restarts; stale entries are removed
//! 5. **ACL policies** - A cross-namespace policy is attached to namespaces the controller creates
//!
//! ## Features
//!
//! - **Crash-recoverable**: applied state is rebuilt from owned catalog entries on startup
//! - **Drift correction**: the catalog is re-read on `--catalog-poll-interval`
//! - **Prometheus metrics**: Exposes metrics for monitoring and observability
//! - **Health probes**: HTTP endpoints for liveness and readiness checks

use anyhow::{Context, Result};
use catalog_sync_controller::catalog::ConsulCatalog;
use catalog_sync_controller::config::{Args, ControllerConfig, SyncConfig};
use catalog_sync_controller::controller::reconciler::Reconciler;
use catalog_sync_controller::controller::scheduler::WriteScheduler;
use catalog_sync_controller::runtime::initialization::{initialize, shutdown_signal};
use catalog_sync_controller::source::kubernetes::KubernetesSource;
use catalog_sync_controller::source::{run_consumer, SourceStore};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let sync_config = SyncConfig::from_args(&args).context("Invalid configuration")?;
    let controller_config = ControllerConfig::from_env();

    let init = initialize(&args, &controller_config).await?;

    info!(
        "Namespace policy: {}, write interval: {:?}, catalog poll interval: {:?}",
        sync_config.policy, sync_config.write_interval, sync_config.catalog_poll_interval
    );
    if args.enable_k8s_namespace_mirroring && !args.enable_namespaces {
        warn!("--enable-k8s-namespace-mirroring has no effect without --enable-namespaces");
    }

    let catalog = ConsulCatalog::new(sync_config.consul_client_config(&args, &controller_config))
        .context("Failed to create Consul client")?;
    info!("Syncing into Consul at {}", args.consul_address);

    let store = Arc::new(SourceStore::new());
    let (events_tx, events_rx) = mpsc::channel(controller_config.source_channel_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let source = KubernetesSource::new(
        init.client,
        sync_config.watch_namespace.as_deref(),
        sync_config.conversion,
        &controller_config,
    );
    let source_handle = tokio::spawn(source.run(events_tx, shutdown_rx.clone()));
    let consumer_handle = tokio::spawn(run_consumer(Arc::clone(&store), events_rx));

    let scheduler = WriteScheduler::new(Reconciler::new(Arc::new(catalog), sync_config), Arc::clone(&store))
        .with_server_state(Arc::clone(&init.server_state));
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    shutdown_signal().await;
    info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
    init.server_state.set_ready(false);
    shutdown_tx.send_replace(true);

    if let Err(e) = scheduler_handle.await {
        error!("Write scheduler task failed: {}", e);
    }
    if let Err(e) = source_handle.await {
        error!("Source watch task failed: {}", e);
    }
    if let Err(e) = consumer_handle.await {
        error!("Source consumer task failed: {}", e);
    }

    info!("Controller stopped");
    Ok(())
}
