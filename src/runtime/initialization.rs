//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::{Args, ControllerConfig};
use crate::controller::server::{start_server, ServerState};
use crate::observability;
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Log filter used when neither `--log-level` nor `RUST_LOG` is set
pub const DEFAULT_LOG_FILTER: &str = "catalog_sync_controller=info";

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
///
/// # Errors
/// Fails if logging, metrics or the HTTP server cannot be set up, or if no
/// Kubernetes client configuration is available
pub async fn initialize(args: &Args, controller_config: &ControllerConfig) -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection (kube client, reqwest)
    let rustls_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    init_tracing(args.log_level.as_deref(), args.log_json)?;
    if !rustls_installed {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting Catalog Sync Controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    // Initialize metrics
    observability::metrics::register_metrics()?;

    // Create server state
    let server_state = Arc::new(ServerState::new());

    // Start server in background task
    let server_state_clone = Arc::clone(&server_state);
    let server_port = args.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Probes must answer before the controller starts working
    wait_for_server_ready(&server_state, &server_handle, controller_config).await?;

    // Create Kubernetes client
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    info!("Controller initialized, starting source watch...");

    Ok(InitializationResult {
        client,
        server_state,
    })
}

/// Install the global tracing subscriber
///
/// `--log-level` wins over `RUST_LOG`. A bare level such as `debug` applies
/// to this crate only; anything else is used as a full filter directive.
///
/// # Errors
/// Fails on an invalid filter directive or if a subscriber is already set
pub fn init_tracing(log_level: Option<&str>, json: bool) -> Result<()> {
    let filter = match log_level.map(str::trim).filter(|l| !l.is_empty()) {
        Some(level) => EnvFilter::try_new(log_directive(level))
            .with_context(|| format!("Invalid --log-level '{level}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))
}

fn log_directive(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("catalog_sync_controller={level}")
    }
}

/// Wait for the HTTP server to bind its listener
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    controller_config: &ControllerConfig,
) -> Result<()> {
    let startup_timeout = std::time::Duration::from_secs(controller_config.server_startup_timeout_secs);
    let poll_interval = std::time::Duration::from_millis(controller_config.server_poll_interval_ms);
    let start_time = std::time::Instant::now();

    loop {
        // Check if server task crashed
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_listening() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Resolve on SIGINT, or SIGTERM on Unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
