//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! The resource names below are part of the on-cluster contract: later
//! reconciliations find the derived resources by these names, and workloads
//! outside the operator reference the ClusterIssuer and CA secret by name.
//! Changing any of them orphans existing resources.

/// Name of the self-signed `Issuer` that signs the CA certificate
pub const SELF_SIGNED_ISSUER_NAME: &str = "cs-ss-issuer";

/// Name of the CA `Certificate`
pub const CA_CERTIFICATE_NAME: &str = "cs-ca-certificate";

/// Name of the `Secret` cert-manager populates from the CA certificate
pub const CA_SECRET_NAME: &str = "cs-ca-certificate-secret";

/// Default name of the CA-backed `ClusterIssuer`
pub const DEFAULT_CLUSTER_ISSUER_NAME: &str = "cs-ca-issuer";

/// Common name of the generated CA certificate
pub const CA_COMMON_NAME: &str = "ibm-cs-ca";

/// Kind used in the CA certificate's issuer reference
pub const ISSUER_KIND: &str = "Issuer";

/// Finalizer that guards explicit teardown of the derived resources
pub const FINALIZER_NAME: &str = "sharedca.operator.io/cleanup";

/// Field manager, event reporting component and default controller name
pub const CONTROLLER_NAME: &str = "shared-ca-operator";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default requeue interval for reconciliation errors when backoff state is unavailable (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default periodic resync interval after a successful reconciliation (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 600;

/// Fibonacci backoff bounds for failed reconciliations (minutes)
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;

/// Default exponential backoff starting value for watch stream errors (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default exponential backoff maximum value for watch stream errors (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;
