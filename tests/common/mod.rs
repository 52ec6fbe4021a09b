//! Shared fixtures for the integration tests
//!
//! Builds `SharedCAConfig` specs, owner references and mode reconcilers over
//! the in-memory store and the recording reporter.

#![allow(dead_code, reason = "Each test crate uses a different subset")]

use k8s_openapi::api::core::v1::{ObjectReference, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use shared_ca_operator::constants::{
    CA_CERTIFICATE_NAME, CA_SECRET_NAME, DEFAULT_CLUSTER_ISSUER_NAME, ISSUER_KIND,
    SELF_SIGNED_ISSUER_NAME,
};
use shared_ca_operator::crd::{CaMode, SharedCAConfigSpec};
use shared_ca_operator::resources::{
    build_ca_certificate, build_cluster_issuer, build_self_signed_issuer, with_owner,
};
use shared_ca_operator::status::RecordingReporter;
use shared_ca_operator::store::InMemoryStore;
use shared_ca_operator::controller::reconciler::ModeReconciler;
use tracing::Span;

pub const NAMESPACE: &str = "cert-manager";
pub const OWNER_UID: &str = "0c1d7a5e-4d5b-4a36-9a8e-2f7c1b9d3e11";

pub fn owner() -> OwnerReference {
    OwnerReference {
        api_version: "sharedca.operator.io/v1alpha1".to_string(),
        kind: "SharedCAConfig".to_string(),
        name: "common-services".to_string(),
        uid: OWNER_UID.to_string(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

pub fn default_spec() -> SharedCAConfigSpec {
    SharedCAConfigSpec {
        namespace: NAMESPACE.to_string(),
        mode: CaMode::Default,
        cluster_issuer_name: None,
        byo_secret_name: None,
    }
}

pub fn byo_spec(secret: &str) -> SharedCAConfigSpec {
    SharedCAConfigSpec {
        mode: CaMode::Byo,
        byo_secret_name: Some(secret.to_string()),
        ..default_spec()
    }
}

pub fn mode_reconciler<'a>(
    store: &'a InMemoryStore,
    reporter: &'a RecordingReporter,
) -> ModeReconciler<'a, InMemoryStore, RecordingReporter> {
    ModeReconciler::new(
        store,
        reporter,
        owner(),
        ObjectReference {
            api_version: Some("sharedca.operator.io/v1alpha1".to_string()),
            kind: Some("SharedCAConfig".to_string()),
            name: Some("common-services".to_string()),
            uid: Some(OWNER_UID.to_string()),
            ..Default::default()
        },
        Span::none(),
    )
}

/// Generated CA secret as cert-manager would leave it
pub fn generated_secret() -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(CA_SECRET_NAME.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        type_: Some("kubernetes.io/tls".to_string()),
        ..Default::default()
    }
}

/// Store holding a fully provisioned Default-mode hierarchy
pub fn provisioned_default_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    let owner = owner();
    store.insert(with_owner(
        build_self_signed_issuer(SELF_SIGNED_ISSUER_NAME, NAMESPACE),
        &owner,
    ));
    store.insert(with_owner(
        build_ca_certificate(
            CA_CERTIFICATE_NAME,
            NAMESPACE,
            CA_SECRET_NAME,
            SELF_SIGNED_ISSUER_NAME,
            ISSUER_KIND,
        ),
        &owner,
    ));
    store.insert(generated_secret());
    store.insert(with_owner(
        build_cluster_issuer(DEFAULT_CLUSTER_ISSUER_NAME, CA_SECRET_NAME),
        &owner,
    ));
    store
}
