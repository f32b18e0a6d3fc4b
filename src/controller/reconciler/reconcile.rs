//! # Reconciliation Pass
//!
//! One pass moves the catalog towards the registrations implied by a source
//! snapshot:
//!
//! 1. Seed or re-seed [`SyncState`] from owned catalog state when due
//! 2. Build desired state from the snapshot
//! 3. Diff desired against applied state
//! 4. Deregister everything planned for removal
//! 5. Per target namespace: ensure the namespace, then register
//!
//! Each successful write updates [`SyncState`] immediately. A failed write
//! leaves it untouched so the same operation is planned again next pass.

use crate::catalog::CatalogClient;
use crate::config::SyncConfig;
use crate::controller::reconciler::desired::build_desired;
use crate::controller::reconciler::diff::{self, CreateKind, Creation};
use crate::controller::reconciler::namespaces::NamespaceManager;
use crate::controller::reconciler::reader;
use crate::controller::reconciler::state::SyncState;
use crate::controller::reconciler::types::{PassSummary, ReconcilerError};
use crate::error::CatalogError;
use crate::observability::metrics;
use crate::source::SourceService;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

/// Owns [`SyncState`] and applies passes against a catalog
///
/// Passes take `&mut self`, so at most one can run at a time.
#[derive(Debug)]
pub struct Reconciler<C: CatalogClient + ?Sized> {
    client: Arc<C>,
    config: SyncConfig,
    state: SyncState,
    namespaces: NamespaceManager,
    last_seed: Option<Instant>,
    passes: u64,
}

impl<C: CatalogClient + ?Sized> Reconciler<C> {
    #[must_use]
    pub fn new(client: Arc<C>, config: SyncConfig) -> Self {
        let namespaces = NamespaceManager::new(config.cross_namespace_acl_policy.clone());
        Self {
            client,
            config,
            state: SyncState::new(),
            namespaces,
            last_seed: None,
            passes: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Passes started since creation
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Run one reconciliation pass over `snapshot`
    ///
    /// `shutdown` is checked between catalog operations; once it reads
    /// `true` no further operation is issued and the summary is marked
    /// interrupted.
    ///
    /// # Errors
    /// Returns [`ReconcilerError::Seed`] if owned catalog state has never been
    /// read and cannot be read now. Every other failure is counted in the
    /// returned summary.
    pub async fn run_pass(
        &mut self,
        snapshot: &[SourceService],
        shutdown: &watch::Receiver<bool>,
    ) -> Result<PassSummary, ReconcilerError> {
        self.passes += 1;
        let span = tracing::info_span!(
            "catalog_sync.pass",
            pass = self.passes,
            sources = snapshot.len()
        );
        self.run_pass_inner(snapshot, shutdown).instrument(span).await
    }

    async fn run_pass_inner(
        &mut self,
        snapshot: &[SourceService],
        shutdown: &watch::Receiver<bool>,
    ) -> Result<PassSummary, ReconcilerError> {
        let start = Instant::now();
        metrics::set_source_services(snapshot.len());
        let mut summary = PassSummary::default();

        if self.seed_due(start) {
            match self.seed().await {
                Ok(()) => {
                    summary.seeded = true;
                    self.last_seed = Some(start);
                }
                Err(e) if !self.state.is_seeded() => {
                    metrics::increment_pass_errors();
                    error!("❌ Cannot read owned catalog state, skipping pass: {}", e);
                    return Err(ReconcilerError::Seed(e));
                }
                Err(e) => {
                    warn!(
                        "⚠️  Catalog re-read failed, continuing with in-memory state: {}",
                        e
                    );
                }
            }
        }

        let desired = build_desired(snapshot, &self.config);
        let plan = diff::plan(&desired, &self.state);
        debug!(
            "Planned {} deregistration(s) and {} registration(s) for {} desired registration(s)",
            plan.deletes.len(),
            plan.creates.len(),
            desired.registration_count()
        );

        'apply: {
            for deletion in &plan.deletes {
                if *shutdown.borrow() {
                    summary.interrupted = true;
                    break 'apply;
                }
                match self.client.deregister(&deletion.key).await {
                    Ok(()) => {
                        info!("🗑️  Deregistered {}", deletion.key);
                        self.state
                            .record_deregistered(deletion.source.as_ref(), &deletion.key);
                        summary.deregistered += 1;
                    }
                    Err(e) => {
                        summary.failed += 1;
                        log_failure("deregister", &deletion.key.to_string(), &e);
                    }
                }
            }

            for (namespace, creations) in plan.creates_by_namespace() {
                if *shutdown.borrow() {
                    summary.interrupted = true;
                    break 'apply;
                }
                match self.namespaces.ensure(self.client.as_ref(), namespace).await {
                    Ok(outcome) if outcome.changed() => summary.namespaces_ensured += 1,
                    Ok(_) => {}
                    Err(e) => {
                        summary.failed += creations.len();
                        log_failure("namespace_ensure", namespace, &e);
                        continue;
                    }
                }

                for creation in creations {
                    if *shutdown.borrow() {
                        summary.interrupted = true;
                        break 'apply;
                    }
                    self.apply_creation(creation, &mut summary).await;
                }
            }
        }

        for (source, wanted) in &desired.sources {
            self.state.set_target(source, wanted.target.clone());
        }
        self.state.retain(|source, tracked| {
            !tracked.registrations.is_empty() || desired.sources.contains_key(source)
        });

        let elapsed = start.elapsed().as_secs_f64();
        metrics::increment_passes();
        metrics::observe_pass_duration(elapsed);
        metrics::increment_registrations((summary.registered + summary.reregistered) as u64);
        metrics::increment_deregistrations(summary.deregistered as u64);
        metrics::set_managed_registrations(self.state.managed_count());
        if summary.failed > 0 {
            metrics::increment_pass_errors();
        }

        if summary.writes() > 0 || !summary.is_clean() {
            info!(
                "✅ Pass complete in {:.3}s: {} registered, {} re-registered, {} deregistered, {} failed{}",
                elapsed,
                summary.registered,
                summary.reregistered,
                summary.deregistered,
                summary.failed,
                if summary.interrupted { " (interrupted)" } else { "" }
            );
        } else {
            debug!("Pass complete in {:.3}s: catalog in sync", elapsed);
        }

        Ok(summary)
    }

    fn seed_due(&self, now: Instant) -> bool {
        match self.last_seed {
            None => true,
            Some(last) => now.duration_since(last) >= self.config.catalog_poll_interval,
        }
    }

    async fn seed(&mut self) -> Result<(), CatalogError> {
        let namespaces =
            reader::relevant_namespaces(self.client.as_ref(), &self.config.policy).await?;
        let owned = reader::read_owned(self.client.as_ref(), &namespaces).await?;
        info!(
            "📖 Read {} owned registration(s) across {} namespace(s)",
            owned.len(),
            namespaces.len()
        );
        self.state.seed(owned);
        self.namespaces.clear();
        Ok(())
    }

    async fn apply_creation(&mut self, creation: &Creation, summary: &mut PassSummary) {
        let key = &creation.registration.key;
        match self.client.register(&creation.registration).await {
            Ok(()) => {
                match creation.kind {
                    CreateKind::New => {
                        info!("📝 Registered {}", key);
                        summary.registered += 1;
                    }
                    CreateKind::Update => {
                        info!("🔄 Re-registered {}", key);
                        summary.reregistered += 1;
                    }
                }
                self.state
                    .record_registered(&creation.source, creation.registration.clone());
            }
            Err(e) => {
                // The namespace may have been removed behind our back; re-check it next pass
                self.namespaces.forget(&key.namespace);
                summary.failed += 1;
                log_failure("register", &key.to_string(), &e);
            }
        }
    }
}

fn log_failure(operation: &str, target: &str, err: &CatalogError) {
    metrics::increment_operation_errors(operation, err.kind());
    if err.is_retryable() {
        warn!(
            "⚠️  {} failed for {}, will retry next pass: {}",
            operation, target, err
        );
    } else {
        error!("❌ {} rejected for {}: {}", operation, target, err);
    }
}
