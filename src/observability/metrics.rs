//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `catalog_sync_passes_total` - Total number of reconciliation passes
//! - `catalog_sync_pass_errors_total` - Passes that ended with at least one failed operation
//! - `catalog_sync_pass_duration_seconds` - Duration of reconciliation passes
//! - `catalog_sync_registrations_total` - Registrations written to the catalog
//! - `catalog_sync_deregistrations_total` - Registrations removed from the catalog
//! - `catalog_sync_operation_errors_total` - Failed catalog operations by operation and error kind
//! - `catalog_sync_namespaces_created_total` - Catalog namespaces created by the controller
//! - `catalog_sync_managed_registrations` - Registrations currently tracked as owned
//! - `catalog_sync_source_services` - Source services in the latest snapshot
//! - `catalog_sync_skipped_ticks_total` - Write ticks coalesced because a pass overran
//! - `catalog_sync_catalog_request_duration_seconds` - Catalog API latency by operation
//! - `catalog_sync_watch_restarts_total` - Source watch restarts after errors

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static PASSES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "catalog_sync_passes_total",
        "Total number of reconciliation passes",
    )
    .expect("Failed to create PASSES_TOTAL metric - this should never happen")
});

static PASS_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "catalog_sync_pass_errors_total",
        "Total number of passes that ended with at least one failed operation",
    )
    .expect("Failed to create PASS_ERRORS_TOTAL metric - this should never happen")
});

static PASS_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "catalog_sync_pass_duration_seconds",
            "Duration of reconciliation passes in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create PASS_DURATION metric - this should never happen")
});

static REGISTRATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "catalog_sync_registrations_total",
        "Total number of registrations written to the catalog",
    )
    .expect("Failed to create REGISTRATIONS_TOTAL metric - this should never happen")
});

static DEREGISTRATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "catalog_sync_deregistrations_total",
        "Total number of registrations removed from the catalog",
    )
    .expect("Failed to create DEREGISTRATIONS_TOTAL metric - this should never happen")
});

static OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "catalog_sync_operation_errors_total",
            "Total number of failed catalog operations by operation and error kind",
        ),
        &["operation", "kind"],
    )
    .expect("Failed to create OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static NAMESPACES_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "catalog_sync_namespaces_created_total",
        "Total number of catalog namespaces created",
    )
    .expect("Failed to create NAMESPACES_CREATED_TOTAL metric - this should never happen")
});

static MANAGED_REGISTRATIONS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "catalog_sync_managed_registrations",
        "Current number of registrations tracked as owned",
    )
    .expect("Failed to create MANAGED_REGISTRATIONS metric - this should never happen")
});

static SOURCE_SERVICES: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "catalog_sync_source_services",
        "Number of source services in the latest snapshot",
    )
    .expect("Failed to create SOURCE_SERVICES metric - this should never happen")
});

pub(crate) static SKIPPED_TICKS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "catalog_sync_skipped_ticks_total",
        "Total number of write ticks coalesced because a pass was still running",
    )
    .expect("Failed to create SKIPPED_TICKS_TOTAL metric - this should never happen")
});

static CATALOG_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "catalog_sync_catalog_request_duration_seconds",
            "Duration of catalog API requests in seconds by operation",
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["operation"],
    )
    .expect("Failed to create CATALOG_REQUEST_DURATION metric - this should never happen")
});

static WATCH_RESTARTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "catalog_sync_watch_restarts_total",
        "Total number of source watch restarts after errors",
    )
    .expect("Failed to create WATCH_RESTARTS_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(PASSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PASS_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PASS_DURATION.clone()))?;
    REGISTRY.register(Box::new(REGISTRATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEREGISTRATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(NAMESPACES_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(MANAGED_REGISTRATIONS.clone()))?;
    REGISTRY.register(Box::new(SOURCE_SERVICES.clone()))?;
    REGISTRY.register(Box::new(SKIPPED_TICKS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CATALOG_REQUEST_DURATION.clone()))?;
    REGISTRY.register(Box::new(WATCH_RESTARTS_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_passes() {
    PASSES_TOTAL.inc();
}

pub fn increment_pass_errors() {
    PASS_ERRORS_TOTAL.inc();
}

pub fn observe_pass_duration(duration: f64) {
    PASS_DURATION.observe(duration);
}

pub fn increment_registrations(count: u64) {
    REGISTRATIONS_TOTAL.inc_by(count);
}

pub fn increment_deregistrations(count: u64) {
    DEREGISTRATIONS_TOTAL.inc_by(count);
}

/// Increment failed catalog operation counter
pub fn increment_operation_errors(operation: &str, kind: &str) {
    OPERATION_ERRORS_TOTAL
        .with_label_values(&[operation, kind])
        .inc();
}

pub fn increment_namespaces_created() {
    NAMESPACES_CREATED_TOTAL.inc();
}

pub fn set_managed_registrations(count: usize) {
    MANAGED_REGISTRATIONS.set(i64::try_from(count).unwrap_or(i64::MAX));
}

pub fn set_source_services(count: usize) {
    SOURCE_SERVICES.set(i64::try_from(count).unwrap_or(i64::MAX));
}

pub fn increment_skipped_ticks(count: u64) {
    SKIPPED_TICKS_TOTAL.inc_by(count);
}

pub fn observe_catalog_request_duration(operation: &str, duration: f64) {
    CATALOG_REQUEST_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_watch_restarts() {
    WATCH_RESTARTS_TOTAL.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_passes() {
        let before = PASSES_TOTAL.get();
        increment_passes();
        let after = PASSES_TOTAL.get();
        assert!(after > before);
    }

    #[test]
    fn test_increment_registrations_by_count() {
        let before = REGISTRATIONS_TOTAL.get();
        increment_registrations(3);
        let after = REGISTRATIONS_TOTAL.get();
        assert!(after >= before + 3u64);
    }

    #[test]
    fn test_increment_operation_errors() {
        let before = OPERATION_ERRORS_TOTAL
            .with_label_values(&["register", "transport"])
            .get();
        increment_operation_errors("register", "transport");
        let after = OPERATION_ERRORS_TOTAL
            .with_label_values(&["register", "transport"])
            .get();
        assert!(after > before);
    }

    #[test]
    fn test_observe_catalog_request_duration() {
        observe_catalog_request_duration("register", 0.02);
        // Just verify it doesn't panic
    }
}
