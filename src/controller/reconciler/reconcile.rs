//! # Reconciliation Logic
//!
//! Entry point invoked by the controller for every `SharedCAConfig` event.
//!
//! The finalizer wraps each run:
//! - `Apply`: converge the declared mode, then publish status
//! - `Cleanup`: remove the derived resources before the config goes away
//!
//! Errors are handled by the error policy in `runtime::error_policy`, which
//! owns the per-resource backoff.

use crate::constants::FINALIZER_NAME;
use crate::controller::reconciler::mode::ModeReconciler;
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::crd::SharedCAConfig;
use crate::observability::metrics;
use crate::resources::{object_reference, owner_reference};
use crate::status::events::reasons;
use crate::status::{update_status, Phase, Severity, StatusReporter};
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Api;
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{self, finalizer, Event as Finalizer};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument, Span};

/// Reconcile one `SharedCAConfig`
///
/// # Errors
///
/// Returns the first failure of the run; the config's status is set to
/// `Failed` with the same message before returning. Every error is also
/// recorded as a Warning event on the config.
pub async fn reconcile(
    config: Arc<SharedCAConfig>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let start = Instant::now();
    metrics::increment_reconciliations();

    let name = config.metadata.name.clone().unwrap_or_default();
    let span = info_span!(
        "reconcile",
        resource.name = name.as_str(),
        resource.kind = "SharedCAConfig",
        resource.mode = config.spec.mode.as_str(),
    );

    let event_ref = object_reference(&config);
    let api: Api<SharedCAConfig> = Api::all(ctx.client.clone());
    let result = finalizer(&api, FINALIZER_NAME, config, |event| {
        let ctx = Arc::clone(&ctx);
        let span = span.clone();
        async move {
            match event {
                Finalizer::Apply(config) => apply(&config, &ctx, span).await,
                Finalizer::Cleanup(config) => cleanup(&config, &ctx, span).await,
            }
        }
    })
    .instrument(span.clone())
    .await;
    let result = match result {
        Ok(action) => Ok(action),
        Err(e) => Err(finalizer_failure(e, ctx.reporter.as_ref(), &event_ref).await),
    };

    metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
    result
}

async fn apply(
    config: &SharedCAConfig,
    ctx: &Reconciler,
    span: Span,
) -> Result<Action, ReconcilerError> {
    let name = config.metadata.name.as_deref().unwrap_or("unknown");
    let owner = require_owner(config, ctx.reporter.as_ref()).await?;

    if config.status.is_none() {
        publish_status(config, ctx, Phase::Pending, "Reconciling shared CA").await;
    }

    let mode = ModeReconciler::new(
        ctx.store.as_ref(),
        ctx.reporter.as_ref(),
        owner,
        object_reference(config),
        span,
    )
    .require_byo_secret_name(ctx.config.byo_require_secret_name);

    if let Err(e) = mode.converge(&config.spec).await {
        publish_status(config, ctx, Phase::Failed, &e.to_string()).await;
        return Err(e);
    }

    metrics::increment_mode_applied(config.spec.mode.as_str());
    let message = format!(
        "{} CA ready: ClusterIssuer {} trusts secret {}",
        config.spec.mode,
        config.spec.effective_cluster_issuer_name(),
        config.spec.effective_ca_secret_name()
    );
    publish_status(config, ctx, Phase::Ready, &message).await;

    if ctx.reset_backoff(name) {
        info!("Reconciliation of {} recovered, backoff reset", name);
    }

    let resync = ctx.config.resync_interval();
    metrics::increment_requeues_total("resync");
    Ok(Action::requeue(resync))
}

async fn cleanup(
    config: &SharedCAConfig,
    ctx: &Reconciler,
    span: Span,
) -> Result<Action, ReconcilerError> {
    let name = config.metadata.name.as_deref().unwrap_or("unknown");
    info!("SharedCAConfig {} is being deleted, removing shared CA", name);
    publish_status(config, ctx, Phase::Terminating, "Removing shared CA resources").await;

    // Without a uid there is nothing we could have created
    let owner = owner_reference(config).unwrap_or_default();
    ModeReconciler::new(
        ctx.store.as_ref(),
        ctx.reporter.as_ref(),
        owner,
        object_reference(config),
        span,
    )
    .remove_shared_ca(&config.spec)
    .await?;

    ctx.forget_backoff(name);
    Ok(Action::await_change())
}

/// Owner reference for the derived resources, reported when the config has no uid
async fn require_owner<R>(config: &SharedCAConfig, reporter: &R) -> Result<OwnerReference, ReconcilerError>
where
    R: StatusReporter + ?Sized,
{
    if let Some(owner) = owner_reference(config) {
        return Ok(owner);
    }
    let name = config.metadata.name.as_deref().unwrap_or("unknown");
    let err = ReconcilerError::OwnerReference(format!("SharedCAConfig {name} has no uid"));
    warn!(error = %err, "Can't set controller reference");
    reporter
        .record(
            &object_reference(config),
            Severity::Warning,
            reasons::ERROR,
            &format!("Can't set controller reference on SharedCAConfig {name}"),
        )
        .await;
    Err(err)
}

/// Unwrap apply and cleanup failures, which report themselves, and report
/// failures of the finalizer bookkeeping
async fn finalizer_failure<R>(
    err: finalizer::Error<ReconcilerError>,
    reporter: &R,
    event_ref: &ObjectReference,
) -> ReconcilerError
where
    R: StatusReporter + ?Sized,
{
    match err {
        finalizer::Error::ApplyFailed(inner) | finalizer::Error::CleanupFailed(inner) => inner,
        other => {
            let err = ReconcilerError::Finalizer(Box::new(other));
            warn!(error = %err, "Finalizer bookkeeping failed");
            reporter
                .record(
                    event_ref,
                    Severity::Warning,
                    reasons::ERROR,
                    &format!("Error updating finalizer: {err}"),
                )
                .await;
            err
        }
    }
}

/// Status writes never fail a reconciliation; the next run retries them
async fn publish_status(config: &SharedCAConfig, ctx: &Reconciler, phase: Phase, message: &str) {
    if let Err(e) = update_status(
        &ctx.client,
        config,
        phase,
        message,
        &ctx.config.controller_name,
    )
    .await
    {
        warn!(error = %e, phase = %phase, "Failed to update SharedCAConfig status");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CaMode, SharedCAConfigSpec};
    use crate::status::RecordingReporter;

    fn config(uid: Option<&str>) -> SharedCAConfig {
        let mut config = SharedCAConfig::new(
            "shared-ca",
            SharedCAConfigSpec {
                namespace: "cert-manager".to_string(),
                mode: CaMode::Default,
                cluster_issuer_name: None,
                byo_secret_name: None,
            },
        );
        config.metadata.uid = uid.map(str::to_string);
        config
    }

    #[tokio::test]
    async fn test_missing_uid_is_reported_as_warning() {
        let reporter = RecordingReporter::new();

        let err = require_owner(&config(None), &reporter).await.unwrap_err();

        assert!(matches!(err, ReconcilerError::OwnerReference(_)));
        let event = reporter.last().unwrap();
        assert_eq!(event.severity, Severity::Warning);
        assert_eq!(event.reason, "Error");
        assert_eq!(
            event.message,
            "Can't set controller reference on SharedCAConfig shared-ca"
        );
    }

    #[tokio::test]
    async fn test_owner_with_uid_records_nothing() {
        let reporter = RecordingReporter::new();

        let owner = require_owner(&config(Some("uid-1")), &reporter).await.unwrap();

        assert_eq!(owner.uid, "uid-1");
        assert!(reporter.events().is_empty());
    }

    #[tokio::test]
    async fn test_finalizer_bookkeeping_failure_is_reported() {
        let reporter = RecordingReporter::new();
        let event_ref = object_reference(&config(Some("uid-1")));

        let err = finalizer_failure(finalizer::Error::UnnamedObject, &reporter, &event_ref).await;

        assert!(matches!(err, ReconcilerError::Finalizer(_)));
        let event = reporter.last().unwrap();
        assert_eq!(event.severity, Severity::Warning);
        assert!(event.message.starts_with("Error updating finalizer"));
    }

    #[tokio::test]
    async fn test_apply_failure_is_unwrapped_without_second_event() {
        let reporter = RecordingReporter::new();
        let event_ref = object_reference(&config(Some("uid-1")));
        let inner = ReconcilerError::InvalidConfig("namespace must not be empty".to_string());

        let err =
            finalizer_failure(finalizer::Error::ApplyFailed(inner), &reporter, &event_ref).await;

        assert!(matches!(err, ReconcilerError::InvalidConfig(_)));
        assert!(reporter.events().is_empty());
    }
}
