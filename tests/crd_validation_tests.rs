//! # CRD Validation Tests
//!
//! Deserializes sample `SharedCAConfig` manifests and checks the generated
//! CustomResourceDefinition, so schema drift is caught early.

use kube::CustomResourceExt;
use shared_ca_operator::constants::{CA_SECRET_NAME, DEFAULT_CLUSTER_ISSUER_NAME};
use shared_ca_operator::crd::{CaMode, SharedCAConfig};

#[test]
fn test_minimal_manifest_uses_defaults() {
    let yaml = r"
apiVersion: sharedca.operator.io/v1alpha1
kind: SharedCAConfig
metadata:
  name: common-services
spec:
  namespace: cert-manager
";
    let config: SharedCAConfig = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(config.spec.namespace, "cert-manager");
    assert_eq!(config.spec.mode, CaMode::Default);
    assert_eq!(
        config.spec.effective_cluster_issuer_name(),
        DEFAULT_CLUSTER_ISSUER_NAME
    );
    assert_eq!(config.spec.effective_ca_secret_name(), CA_SECRET_NAME);
    assert!(config.status.is_none());
    assert!(config.spec.validate(false).is_ok());
}

#[test]
fn test_byo_manifest() {
    let yaml = r"
apiVersion: sharedca.operator.io/v1alpha1
kind: SharedCAConfig
metadata:
  name: common-services
spec:
  namespace: cert-manager
  mode: BYO
  clusterIssuerName: corporate-ca
  byoSecretName: corporate-root-ca
";
    let config: SharedCAConfig = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(config.spec.mode, CaMode::Byo);
    assert_eq!(config.spec.effective_cluster_issuer_name(), "corporate-ca");
    assert_eq!(config.spec.effective_ca_secret_name(), "corporate-root-ca");
    assert!(!config.spec.ca_secret_is_user_owned());
    assert!(config.spec.validate(true).is_ok());
}

#[test]
fn test_byo_without_secret_name() {
    let yaml = r"
apiVersion: sharedca.operator.io/v1alpha1
kind: SharedCAConfig
metadata:
  name: common-services
spec:
  namespace: cert-manager
  mode: BYO
  byoSecretName: ''
";
    let config: SharedCAConfig = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(config.spec.effective_ca_secret_name(), CA_SECRET_NAME);
    assert!(config.spec.validate(false).is_ok());
    assert!(config.spec.validate(true).is_err());
}

#[test]
fn test_unknown_mode_is_rejected() {
    let yaml = r"
apiVersion: sharedca.operator.io/v1alpha1
kind: SharedCAConfig
metadata:
  name: common-services
spec:
  namespace: cert-manager
  mode: External
";
    assert!(serde_yaml::from_str::<SharedCAConfig>(yaml).is_err());
}

#[test]
fn test_missing_namespace_is_rejected() {
    let yaml = r"
apiVersion: sharedca.operator.io/v1alpha1
kind: SharedCAConfig
metadata:
  name: common-services
spec:
  mode: Default
";
    assert!(serde_yaml::from_str::<SharedCAConfig>(yaml).is_err());
}

#[test]
fn test_generated_crd_is_cluster_scoped_with_status() {
    let crd = SharedCAConfig::crd();

    assert_eq!(crd.metadata.name.as_deref(), Some("sharedcaconfigs.sharedca.operator.io"));
    assert_eq!(crd.spec.scope, "Cluster");
    assert_eq!(crd.spec.names.kind, "SharedCAConfig");
    assert_eq!(crd.spec.names.short_names, Some(vec!["sca".to_string()]));

    let version = &crd.spec.versions[0];
    assert_eq!(version.name, "v1alpha1");
    assert!(version
        .subresources
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .is_some());

    let yaml = serde_yaml::to_string(&crd).unwrap();
    assert!(yaml.contains("byoSecretName"));
    assert!(yaml.contains("clusterIssuerName"));
}
