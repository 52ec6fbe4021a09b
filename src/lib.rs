//! Shared CA Operator Library
//!
//! Provisions a shared cert-manager CA hierarchy from a cluster-scoped
//! `SharedCAConfig`: either a generated CA (self-signed `Issuer`, CA
//! `Certificate`, `ClusterIssuer`) or a `ClusterIssuer` backed by a
//! user-supplied secret.
//!
//! ## Quick Start
//!
//! ```rust
//! use shared_ca_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod resources;
pub mod runtime;
pub mod status;
pub mod store;
