//! # SharedCAConfig Spec
//!
//! Main CRD specification types and default values.

use crate::constants::{CA_SECRET_NAME, DEFAULT_CLUSTER_ISSUER_NAME};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SharedCAConfig Custom Resource Definition
///
/// Declares the shared CA hierarchy for the cluster. The resource is
/// cluster-scoped so that it can own both the namespaced issuer/certificate
/// and the cluster-scoped ClusterIssuer.
///
/// # Example
///
/// ```yaml
/// apiVersion: sharedca.operator.io/v1alpha1
/// kind: SharedCAConfig
/// metadata:
///   name: shared-ca
/// spec:
///   namespace: cert-manager
///   mode: BYO
///   byoSecretName: corporate-root-ca
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "SharedCAConfig",
    group = "sharedca.operator.io",
    version = "v1alpha1",
    status = "crate::crd::SharedCAConfigStatus",
    shortname = "sca",
    printcolumn = r#"{"name":"Mode", "type":"string", "jsonPath":".spec.mode"}, {"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Issuer", "type":"string", "jsonPath":".status.clusterIssuerName"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SharedCAConfigSpec {
    /// Namespace for the namespaced derived resources
    /// (self-signed Issuer, CA Certificate, CA Secret)
    pub namespace: String,
    /// CA mode: `Default` generates a self-signed CA, `BYO` trusts an existing secret
    #[serde(default)]
    pub mode: CaMode,
    /// ClusterIssuer name override
    /// Default: "cs-ca-issuer"
    #[serde(default)]
    pub cluster_issuer_name: Option<String>,
    /// Secret holding the user-supplied CA key pair (BYO mode only)
    /// Must live in `namespace` and contain `tls.crt` and `tls.key`
    #[serde(default)]
    pub byo_secret_name: Option<String>,
}

/// CA provisioning mode
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema,
)]
pub enum CaMode {
    /// Generated CA: self-signed Issuer + CA Certificate + ClusterIssuer
    #[default]
    Default,
    /// Bring-your-own CA: ClusterIssuer only, backed by a user-supplied secret
    #[serde(rename = "BYO")]
    Byo,
}

impl CaMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CaMode::Default => "Default",
            CaMode::Byo => "BYO",
        }
    }
}

impl fmt::Display for CaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SharedCAConfigSpec {
    /// ClusterIssuer name, honouring a non-empty override
    #[must_use]
    pub fn effective_cluster_issuer_name(&self) -> &str {
        non_empty(self.cluster_issuer_name.as_deref()).unwrap_or(DEFAULT_CLUSTER_ISSUER_NAME)
    }

    /// User-supplied BYO secret name, if one is set and non-empty
    #[must_use]
    pub fn byo_secret_name(&self) -> Option<&str> {
        non_empty(self.byo_secret_name.as_deref())
    }

    /// Secret the ClusterIssuer should trust in BYO mode
    ///
    /// Falls back to the generated CA secret name when no BYO secret is set.
    #[must_use]
    pub fn effective_byo_secret_name(&self) -> &str {
        self.byo_secret_name().unwrap_or(CA_SECRET_NAME)
    }

    /// Secret the ClusterIssuer should trust for the declared mode
    #[must_use]
    pub fn effective_ca_secret_name(&self) -> &str {
        match self.mode {
            CaMode::Default => CA_SECRET_NAME,
            CaMode::Byo => self.effective_byo_secret_name(),
        }
    }

    /// Whether the generated CA secret belongs to the user in BYO mode
    ///
    /// True only when the user explicitly named the generated secret as their
    /// BYO secret; the operator must then never delete it.
    #[must_use]
    pub fn ca_secret_is_user_owned(&self) -> bool {
        self.mode == CaMode::Byo && self.byo_secret_name() == Some(CA_SECRET_NAME)
    }

    /// Check the configuration before any store call
    ///
    /// `require_byo_secret_name` turns the empty-BYO-secret fallback into an error.
    pub fn validate(&self, require_byo_secret_name: bool) -> Result<(), String> {
        if self.namespace.trim().is_empty() {
            return Err("spec.namespace must not be empty".to_string());
        }
        if require_byo_secret_name && self.mode == CaMode::Byo && self.byo_secret_name().is_none() {
            return Err("spec.byoSecretName is required when spec.mode is BYO".to_string());
        }
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
