//! # Status Conditions
//!
//! Writes the `status` subresource of a `SharedCAConfig`.
//!
//! The desired status is computed purely from the config and the outcome of
//! the reconciliation; the patch is skipped when nothing but timestamps would
//! change, so status writes never feed back into the watch.

use crate::crd::{Condition, SharedCAConfig, SharedCAConfigStatus};
use chrono::{DateTime, Utc};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use std::fmt;
use tracing::debug;

/// Lifecycle phase reported in `status.phase`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Ready,
    Failed,
    Terminating,
}

impl Phase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pending => "Pending",
            Phase::Ready => "Ready",
            Phase::Failed => "Failed",
            Phase::Terminating => "Terminating",
        }
    }

    fn ready_condition(self) -> (&'static str, &'static str) {
        match self {
            Phase::Ready => ("True", "ReconciliationSucceeded"),
            Phase::Failed => ("False", "ReconciliationFailed"),
            Phase::Pending => ("False", "ReconciliationInProgress"),
            Phase::Terminating => ("False", "Terminating"),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status the config should carry after a reconciliation ending in `phase`
///
/// The Ready condition keeps its previous transition time when its status
/// did not flip.
#[must_use]
pub fn desired_status(
    config: &SharedCAConfig,
    phase: Phase,
    message: &str,
    now: DateTime<Utc>,
) -> SharedCAConfigStatus {
    let (ready, reason) = phase.ready_condition();
    let now = now.to_rfc3339();
    let previous = config.status.as_ref();
    let last_transition_time = previous
        .and_then(|s| s.conditions.iter().find(|c| c.r#type == "Ready"))
        .filter(|c| c.status == ready)
        .and_then(|c| c.last_transition_time.clone())
        .unwrap_or_else(|| now.clone());

    let spec = &config.spec;
    SharedCAConfigStatus {
        phase: Some(phase.as_str().to_string()),
        description: Some(message.to_string()),
        conditions: vec![Condition {
            r#type: "Ready".to_string(),
            status: ready.to_string(),
            last_transition_time: Some(last_transition_time),
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
        }],
        observed_generation: config.metadata.generation,
        last_reconcile_time: Some(now),
        mode: Some(spec.mode.as_str().to_string()),
        cluster_issuer_name: Some(spec.effective_cluster_issuer_name().to_string()),
        ca_secret_name: Some(spec.effective_ca_secret_name().to_string()),
    }
}

/// Whether `desired` differs from `current` in anything but timestamps
#[must_use]
pub fn status_changed(current: Option<&SharedCAConfigStatus>, desired: &SharedCAConfigStatus) -> bool {
    let Some(current) = current else {
        return true;
    };
    let strip = |status: &SharedCAConfigStatus| {
        let mut status = status.clone();
        status.last_reconcile_time = None;
        for condition in &mut status.conditions {
            condition.last_transition_time = None;
        }
        status
    };
    strip(current) != strip(desired)
}

/// Patch `status` on the config, skipping no-op writes
#[allow(
    clippy::missing_errors_doc,
    reason = "Returns the kube error from the status patch"
)]
pub async fn update_status(
    client: &Client,
    config: &SharedCAConfig,
    phase: Phase,
    message: &str,
    field_manager: &str,
) -> Result<(), kube::Error> {
    let status = desired_status(config, phase, message, Utc::now());
    if !status_changed(config.status.as_ref(), &status) {
        debug!(
            "Skipping status update - unchanged: phase={}, description={}",
            phase, message
        );
        return Ok(());
    }

    let api: Api<SharedCAConfig> = Api::all(client.clone());
    let patch = serde_json::json!({ "status": status });
    api.patch_status(
        config.metadata.name.as_deref().unwrap_or("unknown"),
        &PatchParams::apply(field_manager),
        &Patch::Merge(patch),
    )
    .await?;
    Ok(())
}
