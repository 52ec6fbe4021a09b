//! # Custom Resource Definitions
//!
//! CRD types used by the operator.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `SharedCAConfig` specification, CA mode and effective-name helpers
//! - `status.rs` - Status types for tracking reconciliation state
//! - `cert_manager.rs` - Typed cert-manager `Issuer`, `ClusterIssuer` and `Certificate`

mod cert_manager;
mod spec;
mod status;

// Re-export all public types
pub use cert_manager::{
    CaIssuer, Certificate, CertificateSpec, ClusterIssuer, ClusterIssuerSpec, Issuer,
    IssuerReference, IssuerSpec, SelfSignedIssuer,
};
pub use spec::{CaMode, SharedCAConfig, SharedCAConfigSpec};
pub use status::{Condition, SharedCAConfigStatus};
