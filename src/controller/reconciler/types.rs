//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::status::StatusReporter;
use crate::store::{SharedCaStore, StoreError};
use kube::Client;
use kube_runtime::finalizer;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// Transient store failure; the whole reconciliation is retried
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Optimistic concurrency collision on update
    #[error("conflict updating {kind} {name}, object changed since it was read")]
    Conflict { kind: &'static str, name: String },

    #[error("invalid SharedCAConfig: {0}")]
    InvalidConfig(String),

    #[error("cannot build owner reference: {0}")]
    OwnerReference(String),

    #[error("finalizer error: {0}")]
    Finalizer(#[source] Box<finalizer::Error<ReconcilerError>>),
}

impl ReconcilerError {
    /// Short label for metrics and requeue reasons
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::Store(_) => "store-error",
            ReconcilerError::Conflict { .. } => "conflict",
            ReconcilerError::InvalidConfig(_) => "invalid-config",
            ReconcilerError::OwnerReference(_) => "owner-reference",
            ReconcilerError::Finalizer(_) => "finalizer",
        }
    }
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_minutes, max_minutes),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Shared reconciler context handed to every reconciliation
#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
    pub store: Arc<dyn SharedCaStore>,
    pub reporter: Arc<dyn StatusReporter>,
    pub config: Arc<ControllerConfig>,
    // Backoff state per SharedCAConfig name, owned by the error policy
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        client: Client,
        store: Arc<dyn SharedCaStore>,
        reporter: Arc<dyn StatusReporter>,
        config: Arc<ControllerConfig>,
    ) -> Self {
        Self {
            client,
            store,
            reporter,
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Clear the backoff for `name` after a successful reconciliation
    ///
    /// Returns whether the resource had been failing.
    pub fn reset_backoff(&self, name: &str) -> bool {
        match self.backoff_states.lock() {
            Ok(mut states) => states.get_mut(name).is_some_and(|state| {
                let had_errors = state.error_count > 0;
                state.reset();
                had_errors
            }),
            Err(_) => false,
        }
    }

    /// Drop all backoff state for a deleted resource
    pub fn forget_backoff(&self, name: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(name);
        }
    }
}
