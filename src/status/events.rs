//! # Status Events
//!
//! Fire-and-forget Kubernetes Events on the `SharedCAConfig`.
//!
//! A failed event publish is logged and swallowed; it never fails a
//! reconciliation.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Client;
use kube_runtime::events::{Event, EventType, Recorder, Reporter};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Event reasons
pub mod reasons {
    pub const SUCCESS: &str = "Success";
    pub const ERROR: &str = "Error";
}

/// Event action shown by `kubectl get events`
pub const ACTION_RECONCILE: &str = "Reconcile";

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
}

impl From<Severity> for EventType {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Normal => EventType::Normal,
            Severity::Warning => EventType::Warning,
        }
    }
}

/// Sink for user-visible status events
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn record(
        &self,
        object_ref: &ObjectReference,
        severity: Severity,
        reason: &str,
        message: &str,
    );
}

/// Reporter backed by `kube_runtime::events::Recorder`
pub struct KubeEventReporter {
    recorder: Recorder,
}

impl std::fmt::Debug for KubeEventReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventReporter").finish_non_exhaustive()
    }
}

impl KubeEventReporter {
    /// `controller_name` becomes the event's reporting component
    #[must_use]
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl StatusReporter for KubeEventReporter {
    async fn record(
        &self,
        object_ref: &ObjectReference,
        severity: Severity,
        reason: &str,
        message: &str,
    ) {
        let event = Event {
            type_: severity.into(),
            reason: reason.to_string(),
            note: Some(message.to_string()),
            action: ACTION_RECONCILE.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, object_ref).await {
            warn!(
                reason,
                error = %e,
                "Failed to publish event for {}",
                object_ref.name.as_deref().unwrap_or("<unknown>")
            );
        }
    }
}

/// Reporter that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

#[async_trait]
impl StatusReporter for NoopReporter {
    async fn record(&self, _: &ObjectReference, _: Severity, _: &str, _: &str) {}
}

/// Event captured by `RecordingReporter`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub object: Option<String>,
    pub severity: Severity,
    pub reason: String,
    pub message: String,
}

/// Reporter that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<RecordedEvent> {
        self.events().pop()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl StatusReporter for RecordingReporter {
    async fn record(
        &self,
        object_ref: &ObjectReference,
        severity: Severity,
        reason: &str,
        message: &str,
    ) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent {
                object: object_ref.name.clone(),
                severity,
                reason: reason.to_string(),
                message: message.to_string(),
            });
    }
}
