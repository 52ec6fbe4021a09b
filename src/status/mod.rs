//! # Status Reporting
//!
//! - `events`: fire-and-forget Kubernetes Events (`StatusReporter`)
//! - `conditions`: `status` subresource of the `SharedCAConfig`

pub mod conditions;
pub mod events;

pub use conditions::{desired_status, status_changed, update_status, Phase};
pub use events::{
    KubeEventReporter, NoopReporter, RecordedEvent, RecordingReporter, Severity, StatusReporter,
};
