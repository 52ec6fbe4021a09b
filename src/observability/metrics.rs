//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `shared_ca_reconciliations_total` - Total number of reconciliations
//! - `shared_ca_reconciliation_errors_total` - Total number of failed reconciliations
//! - `shared_ca_reconciliation_duration_seconds` - Duration of reconciliations
//! - `shared_ca_mode_applied_total{mode}` - Successful convergences per CA mode
//! - `shared_ca_resource_operations_total{kind,operation}` - Store calls per kind
//! - `shared_ca_resource_operation_errors_total{kind,operation}` - Failed store calls
//! - `shared_ca_requeues_total{reason}` - Requeues by reason

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shared_ca_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shared_ca_reconciliation_errors_total",
        "Total number of failed reconciliations",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "shared_ca_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static MODE_APPLIED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "shared_ca_mode_applied_total",
            "Successful convergences by CA mode",
        ),
        &["mode"],
    )
    .expect("Failed to create MODE_APPLIED_TOTAL metric - this should never happen")
});

static RESOURCE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "shared_ca_resource_operations_total",
            "Store operations on derived resources by kind and operation",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create RESOURCE_OPERATIONS_TOTAL metric - this should never happen")
});

static RESOURCE_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "shared_ca_resource_operation_errors_total",
            "Failed store operations on derived resources by kind and operation",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create RESOURCE_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new("shared_ca_requeues_total", "Requeues by reason"),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Fails only when a metric is registered twice"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(MODE_APPLIED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RESOURCE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RESOURCE_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

/// Snapshot of every registered metric family
#[must_use]
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_mode_applied(mode: &str) {
    MODE_APPLIED_TOTAL.with_label_values(&[mode]).inc();
}

pub fn record_resource_operation(kind: &str, operation: &str) {
    RESOURCE_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn increment_resource_operation_errors(kind: &str, operation: &str) {
    RESOURCE_OPERATION_ERRORS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL.get();
        increment_reconciliations();
        assert_eq!(RECONCILIATIONS_TOTAL.get(), before + 1);
    }

    #[test]
    fn test_record_resource_operation_is_labelled() {
        let counter = RESOURCE_OPERATIONS_TOTAL.with_label_values(&["ClusterIssuer", "update"]);
        let before = counter.get();
        record_resource_operation("ClusterIssuer", "update");
        assert_eq!(counter.get(), before + 1);
    }

    #[test]
    fn test_increment_requeues_total() {
        let counter = REQUEUES_TOTAL.with_label_values(&["error-backoff"]);
        let before = counter.get();
        increment_requeues_total("error-backoff");
        assert_eq!(counter.get(), before + 1);
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        let before = RECONCILIATION_DURATION.get_sample_count();
        observe_reconciliation_duration(0.2);
        assert_eq!(RECONCILIATION_DURATION.get_sample_count(), before + 1);
    }
}
