//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and watch stream errors.

use crate::controller::reconciler::{BackoffState, Reconciler, ReconcilerError};
use crate::crd::SharedCAConfig;
use crate::observability::metrics;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per `SharedCAConfig` so one failing config does
/// not slow down the others.
pub fn handle_reconciliation_error(
    obj: Arc<SharedCAConfig>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name,
        error.reason = error.reason(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {:?}", name, error);
    metrics::increment_reconciliation_errors();

    let config = &ctx.config;
    let (delay, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states.entry(name.to_string()).or_insert_with(|| {
                BackoffState::new(config.backoff_min_minutes, config.backoff_max_minutes)
            });
            state.increment_error();
            (
                Duration::from_secs(state.backoff.next_backoff_seconds()),
                state.error_count,
            )
        }
        Err(e) => {
            let delay = config.reconciliation_error_requeue_duration();
            warn!(
                "Failed to lock backoff_states: {}, using default requeue of {}s",
                e,
                delay.as_secs()
            );
            (delay, 0)
        }
    };

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());

    info!(
        "Retrying with Fibonacci backoff: {}s (error count: {}, next retry: {})",
        delay.as_secs(),
        error_count,
        next_trigger_time.to_rfc3339()
    );

    metrics::increment_requeues_total("error-backoff");
    Action::requeue(delay)
}

/// How the watch loop should treat a controller stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// 401: RBAC revoked or token expired
    Unauthorized,
    /// 410: resource version expired
    Expired,
    /// 429: API server storage reinitializing
    TooManyRequests,
    /// 404: object or CRD missing
    NotFound,
    Other,
}

impl WatchErrorKind {
    /// Classify an error by its debug representation
    #[must_use]
    pub fn classify(error_string: &str) -> Self {
        // 404 first: a plain-text 404 body surfaces as a serde error mentioning WatchFailed
        let is_not_found = error_string.contains("ObjectNotFound")
            || error_string.contains("404")
            || error_string.contains("not found");
        if (error_string.contains("401") || error_string.contains("Unauthorized")) && !is_not_found {
            WatchErrorKind::Unauthorized
        } else if error_string.contains("410")
            || error_string.contains("too old resource version")
            || error_string.contains("Expired")
            || error_string.contains("Gone")
        {
            WatchErrorKind::Expired
        } else if error_string.contains("429")
            || error_string.contains("storage is (re)initializing")
            || error_string.contains("TooManyRequests")
        {
            WatchErrorKind::TooManyRequests
        } else if is_not_found {
            WatchErrorKind::NotFound
        } else {
            WatchErrorKind::Other
        }
    }

    /// Whether the stream keeps running after this error
    #[must_use]
    pub fn is_recoverable(self) -> bool {
        self == WatchErrorKind::NotFound
    }
}

/// Handle watch stream errors with appropriate classification and backoff
///
/// Returns `None` to filter out the error (allow restart) or `Some(())` to continue.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &AtomicU64,
    max_backoff_ms: u64,
    restart_delay: Duration,
) -> Option<()> {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    let kind = WatchErrorKind::classify(error_string);
    match kind {
        WatchErrorKind::Unauthorized => {
            error!("Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired");
            error!("Verify the ClusterRole and ClusterRoleBinding of the operator service account:");
            error!("  kubectl auth can-i watch sharedcaconfigs --as=system:serviceaccount:<namespace>:shared-ca-operator");
            error!("  kubectl auth can-i update clusterissuers.cert-manager.io --as=system:serviceaccount:<namespace>:shared-ca-operator");
            warn!(
                "Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                restart_delay.as_secs()
            );
            tokio::time::sleep(restart_delay).await;
        }
        WatchErrorKind::Expired => {
            warn!("Watch resource version expired (410) - this is normal during pod restarts, watch will restart");
        }
        WatchErrorKind::TooManyRequests => {
            let current_backoff = backoff.load(Ordering::Relaxed);
            warn!(
                "API server storage reinitializing (429), backing off for {}ms before restart...",
                current_backoff
            );
            tokio::time::sleep(Duration::from_millis(current_backoff)).await;
            backoff.store(
                current_backoff.saturating_mul(2).min(max_backoff_ms),
                Ordering::Relaxed,
            );
        }
        WatchErrorKind::NotFound => {
            let resource_info = if error_string.contains("SharedCAConfig") {
                "SharedCAConfig resource"
            } else if error_string.contains("cert-manager") {
                "cert-manager resource (is cert-manager installed?)"
            } else {
                "Resource"
            };
            warn!(
                "{} not found (404) - this may be normal if the resource was deleted or the CRD is missing. Error: {}",
                resource_info, error_string
            );
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error_string);
            tokio::time::sleep(restart_delay).await;
        }
    }

    kind.is_recoverable().then_some(())
}
