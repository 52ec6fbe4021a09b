//! # Derived Resources
//!
//! - `descriptors`: desired-state constructors for Issuer, Certificate and ClusterIssuer
//! - `ownership`: owner references back to the `SharedCAConfig`

pub mod descriptors;
pub mod ownership;

pub use descriptors::{
    build_ca_certificate, build_cluster_issuer, build_self_signed_issuer,
    cluster_issuer_secret_name,
};
pub use ownership::{
    controlled_by_other, object_reference, owner_reference, owning_configs, with_owner,
};
