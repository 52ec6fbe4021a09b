//! # Shared CA Operator
//!
//! Kubernetes operator that provisions a shared cert-manager CA.
//!
//! ## Overview
//!
//! The operator watches the cluster-scoped `SharedCAConfig` resource and:
//! - **Default mode**: creates a self-signed `Issuer`, a CA `Certificate` and a
//!   `ClusterIssuer` trusting the generated secret
//! - **BYO mode**: removes the generated chain and points the `ClusterIssuer`
//!   at a user-supplied CA secret
//!
//! Derived resources are watched too, so drift (a deleted Certificate, an
//! edited ClusterIssuer) is repaired on the next reconciliation.

use anyhow::Result;
use shared_ca_operator::runtime::{initialization::initialize, watch_loop::run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(
        init.client,
        init.reconciler,
        init.server_state,
        init.controller_config,
    )
    .await
}
