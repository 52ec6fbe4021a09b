//! # Resource Descriptors
//!
//! Pure constructors for the desired state of each derived resource.
//! No I/O; callers attach owner references and diff against existing objects.

use crate::constants::CA_COMMON_NAME;
use crate::crd::{
    CaIssuer, Certificate, CertificateSpec, ClusterIssuer, ClusterIssuerSpec, Issuer,
    IssuerReference, IssuerSpec, SelfSignedIssuer,
};

/// Self-signed `Issuer` used to sign the CA certificate
#[must_use]
pub fn build_self_signed_issuer(name: &str, namespace: &str) -> Issuer {
    let mut issuer = Issuer::new(
        name,
        IssuerSpec {
            self_signed: Some(SelfSignedIssuer::default()),
            ca: None,
        },
    );
    issuer.metadata.namespace = Some(namespace.to_string());
    issuer
}

/// CA `Certificate` signed by `issuer_name`, stored in `secret_name`
#[must_use]
pub fn build_ca_certificate(
    name: &str,
    namespace: &str,
    secret_name: &str,
    issuer_name: &str,
    issuer_kind: &str,
) -> Certificate {
    let mut certificate = Certificate::new(
        name,
        CertificateSpec {
            common_name: Some(CA_COMMON_NAME.to_string()),
            is_ca: true,
            secret_name: secret_name.to_string(),
            issuer_ref: IssuerReference {
                name: issuer_name.to_string(),
                kind: Some(issuer_kind.to_string()),
                group: None,
            },
        },
    );
    certificate.metadata.namespace = Some(namespace.to_string());
    certificate
}

/// Cluster-scoped CA `ClusterIssuer` trusting `secret_name`
#[must_use]
pub fn build_cluster_issuer(name: &str, secret_name: &str) -> ClusterIssuer {
    ClusterIssuer::new(
        name,
        ClusterIssuerSpec {
            self_signed: None,
            ca: Some(CaIssuer {
                secret_name: secret_name.to_string(),
            }),
        },
    )
}

/// Secret a ClusterIssuer currently trusts, if it is a CA issuer
#[must_use]
pub fn cluster_issuer_secret_name(cluster_issuer: &ClusterIssuer) -> Option<&str> {
    cluster_issuer
        .spec
        .ca
        .as_ref()
        .map(|ca| ca.secret_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_signed_issuer() {
        let issuer = build_self_signed_issuer("cs-ss-issuer", "cert-manager");
        assert_eq!(issuer.metadata.name.as_deref(), Some("cs-ss-issuer"));
        assert_eq!(issuer.metadata.namespace.as_deref(), Some("cert-manager"));
        assert!(issuer.spec.self_signed.is_some());
        assert!(issuer.spec.ca.is_none());

        let json = serde_json::to_value(&issuer).unwrap();
        assert_eq!(json["apiVersion"], "cert-manager.io/v1");
        assert_eq!(json["kind"], "Issuer");
        assert_eq!(json["spec"], serde_json::json!({ "selfSigned": {} }));
    }

    #[test]
    fn test_ca_certificate() {
        let cert = build_ca_certificate(
            "cs-ca-certificate",
            "cert-manager",
            "cs-ca-certificate-secret",
            "cs-ss-issuer",
            "Issuer",
        );
        assert_eq!(cert.metadata.namespace.as_deref(), Some("cert-manager"));
        assert_eq!(cert.spec.common_name.as_deref(), Some("ibm-cs-ca"));
        assert!(cert.spec.is_ca);
        assert_eq!(cert.spec.secret_name, "cs-ca-certificate-secret");
        assert_eq!(cert.spec.issuer_ref.name, "cs-ss-issuer");
        assert_eq!(cert.spec.issuer_ref.kind.as_deref(), Some("Issuer"));

        let json = serde_json::to_value(&cert).unwrap();
        assert_eq!(json["spec"]["isCA"], true);
        assert!(json["spec"].get("isCa").is_none());
        assert_eq!(json["spec"]["issuerRef"]["kind"], "Issuer");
    }

    #[test]
    fn test_cluster_issuer() {
        let ci = build_cluster_issuer("cs-ca-issuer", "custom-secret");
        assert_eq!(ci.metadata.name.as_deref(), Some("cs-ca-issuer"));
        assert!(ci.metadata.namespace.is_none());
        assert_eq!(cluster_issuer_secret_name(&ci), Some("custom-secret"));

        let json = serde_json::to_value(&ci).unwrap();
        assert_eq!(json["kind"], "ClusterIssuer");
        assert_eq!(json["spec"]["ca"]["secretName"], "custom-secret");
    }

    #[test]
    fn test_cluster_issuer_secret_name_absent_for_non_ca_issuer() {
        let mut ci = build_cluster_issuer("cs-ca-issuer", "s");
        ci.spec.ca = None;
        assert_eq!(cluster_issuer_secret_name(&ci), None);
    }
}
