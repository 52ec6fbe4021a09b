//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use shared_ca_operator::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Reconciler types
pub use crate::controller::reconciler::{
    reconcile, BackoffState, ModeReconciler, Reconciler, ReconcilerError,
};

// Store and status seams
pub use crate::status::{Severity, StatusReporter};
pub use crate::store::{
    CreateOutcome, DeleteOutcome, Lookup, ObjectKey, ResourceStore, SharedCaStore, StoreError,
    UpdateOutcome,
};

pub use crate::config::{ControllerConfig, ServerConfig};
