//! # Reconciler
//!
//! Reconciliation of `SharedCAConfig` resources.
//!
//! The reconciler:
//! - Watches the cluster-scoped `SharedCAConfig` and the resources it owns
//! - Converges the declared CA mode (`Default` or `BYO`)
//! - Tears the shared CA down when the config is deleted
//! - Reports progress through status and Kubernetes Events
//!
//! ## Reconciliation Flow
//!
//! 1. Finalizer bookkeeping
//! 2. Validate the configuration
//! 3. Apply the mode:
//!    - **Default**: self-signed Issuer, CA Certificate, ClusterIssuer
//!    - **BYO**: remove the generated chain, ClusterIssuer on the user's secret
//! 4. Update status and requeue for the periodic resync

pub mod mode;
pub mod reconcile;
pub mod types;

pub use mode::ModeReconciler;
pub use reconcile::reconcile;
pub use types::{BackoffState, Reconciler, ReconcilerError};
