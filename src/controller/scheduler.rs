//! # Write Scheduler
//!
//! Drives reconciliation passes on a fixed interval.
//!
//! Source events only update the [`SourceStore`]; catalog writes happen on
//! ticks. The first pass runs as soon as the initial source listing is
//! complete, then once per interval. A pass that overruns the interval
//! swallows the ticks it covered instead of queueing them.

use crate::catalog::CatalogClient;
use crate::controller::reconciler::{PassSummary, Reconciler};
use crate::controller::server::ServerState;
use crate::observability::metrics;
use crate::source::SourceStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Periodic driver for a [`Reconciler`]
#[derive(Debug)]
pub struct WriteScheduler<C: CatalogClient + ?Sized> {
    reconciler: Reconciler<C>,
    store: Arc<SourceStore>,
    interval: Duration,
    server_state: Option<Arc<ServerState>>,
}

impl<C: CatalogClient + ?Sized> WriteScheduler<C> {
    /// Schedule `reconciler` on its configured write interval
    #[must_use]
    pub fn new(reconciler: Reconciler<C>, store: Arc<SourceStore>) -> Self {
        let interval = reconciler.config().write_interval;
        Self {
            reconciler,
            store,
            interval,
            server_state: None,
        }
    }

    /// Report readiness through `state` after the first successful pass
    #[must_use]
    pub fn with_server_state(mut self, state: Arc<ServerState>) -> Self {
        self.server_state = Some(state);
        self
    }

    /// Run until `shutdown` reads `true` or its sender is dropped
    ///
    /// An in-flight pass is allowed to finish its current catalog operation;
    /// the reconciler stops issuing new ones once shutdown is signalled.
    /// Returns the reconciler so callers can inspect its final state.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Reconciler<C> {
        info!(
            "Waiting for initial source listing before first catalog sync (interval {:?})",
            self.interval
        );
        let store = Arc::clone(&self.store);
        tokio::select! {
            () = store.wait_ready() => {}
            () = shutdown_requested(&mut shutdown) => {
                info!("Shutdown requested before first catalog sync");
                return self.reconciler;
            }
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = shutdown_requested(&mut shutdown) => break,
                _ = ticker.tick() => {
                    self.tick(&shutdown).await;
                }
            }
        }

        if let Some(state) = &self.server_state {
            state.set_ready(false);
        }
        info!("Write scheduler stopped");
        self.reconciler
    }

    async fn tick(&mut self, shutdown: &watch::Receiver<bool>) -> Option<PassSummary> {
        let started = Instant::now();
        let snapshot = self.store.snapshot().await;

        let result = self.reconciler.run_pass(&snapshot, shutdown).await;

        let elapsed = started.elapsed();
        if elapsed >= self.interval {
            let skipped = elapsed.as_millis() / self.interval.as_millis().max(1);
            let skipped = u64::try_from(skipped).unwrap_or(u64::MAX);
            metrics::increment_skipped_ticks(skipped);
            warn!(
                "⏱️  Pass took {:?}, longer than the {:?} write interval; {} tick(s) coalesced",
                elapsed, self.interval, skipped
            );
        }

        match result {
            Ok(summary) => {
                if let Some(state) = &self.server_state {
                    if !state.is_ready() {
                        info!("✅ First catalog sync pass complete, marking ready");
                        state.set_ready(true);
                    }
                }
                debug!("Next catalog sync pass in {:?}", self.interval);
                Some(summary)
            }
            Err(e) => {
                warn!("⚠️  Catalog sync pass skipped, retrying next tick: {}", e);
                None
            }
        }
    }
}

/// Resolve once shutdown is signalled or the signalling side is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
