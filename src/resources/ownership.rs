//! # Ownership
//!
//! Owner references from derived resources back to their `SharedCAConfig`,
//! and the reverse mapping used by the derived-resource watches.

use crate::crd::SharedCAConfig;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use kube_runtime::reflector::ObjectRef;

/// Controller owner reference pointing at `config`
///
/// Returns `None` when the config has not been persisted yet (no UID).
#[must_use]
pub fn owner_reference(config: &SharedCAConfig) -> Option<OwnerReference> {
    config.controller_owner_ref(&())
}

/// Event target for `config`
#[must_use]
pub fn object_reference(config: &SharedCAConfig) -> ObjectReference {
    config.object_ref(&())
}

/// Attach `owner` to `obj`, replacing any stale reference with the same UID
///
/// An object may have a single controller, so when `owner` is one, other
/// references lose their `controller` flag and stay as plain owners.
#[must_use]
pub fn with_owner<K: Resource>(mut obj: K, owner: &OwnerReference) -> K {
    let refs = obj.meta_mut().owner_references.get_or_insert_with(Vec::new);
    refs.retain(|existing| existing.uid != owner.uid);
    if owner.controller == Some(true) {
        for existing in refs.iter_mut() {
            existing.controller = None;
        }
    }
    refs.push(owner.clone());
    obj
}

/// True when `obj` names a controller other than `owner`
#[must_use]
pub fn controlled_by_other<K: Resource>(obj: &K, owner: &OwnerReference) -> bool {
    obj.meta()
        .owner_references
        .iter()
        .flatten()
        .any(|existing| existing.controller == Some(true) && existing.uid != owner.uid)
}

/// `SharedCAConfig` objects that own `obj`
///
/// The config is cluster-scoped, so the returned refs carry no namespace even
/// when `obj` itself is namespaced.
pub fn owning_configs<K: Resource>(obj: &K) -> Vec<ObjectRef<SharedCAConfig>> {
    let api_version = SharedCAConfig::api_version(&());
    let kind = SharedCAConfig::kind(&());
    obj.meta()
        .owner_references
        .iter()
        .flatten()
        .filter(|owner| owner.api_version == api_version && owner.kind == kind)
        .map(|owner| ObjectRef::new(&owner.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CaMode, SharedCAConfigSpec};
    use crate::resources::descriptors::build_self_signed_issuer;

    fn config_with_uid(uid: Option<&str>) -> SharedCAConfig {
        let mut config = SharedCAConfig::new(
            "shared-ca",
            SharedCAConfigSpec {
                namespace: "cert-manager".to_string(),
                mode: CaMode::Default,
                cluster_issuer_name: None,
                byo_secret_name: None,
            },
        );
        config.metadata.uid = uid.map(str::to_string);
        config
    }

    #[test]
    fn test_owner_reference_requires_uid() {
        assert!(owner_reference(&config_with_uid(None)).is_none());

        let oref = owner_reference(&config_with_uid(Some("uid-1"))).unwrap();
        assert_eq!(oref.name, "shared-ca");
        assert_eq!(oref.kind, "SharedCAConfig");
        assert_eq!(oref.api_version, "sharedca.operator.io/v1alpha1");
        assert_eq!(oref.controller, Some(true));
    }

    #[test]
    fn test_with_owner_is_idempotent() {
        let oref = owner_reference(&config_with_uid(Some("uid-1"))).unwrap();
        let issuer = build_self_signed_issuer("cs-ss-issuer", "cert-manager");
        let issuer = with_owner(with_owner(issuer, &oref), &oref);
        assert_eq!(issuer.metadata.owner_references.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_with_owner_demotes_previous_controller() {
        let previous = OwnerReference {
            api_version: "operator.ibm.com/v1alpha1".to_string(),
            kind: "CertManagerSharedCA".to_string(),
            name: "default".to_string(),
            uid: "old-uid".to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        };
        let oref = owner_reference(&config_with_uid(Some("uid-1"))).unwrap();
        let issuer = with_owner(build_self_signed_issuer("cs-ss-issuer", "cert-manager"), &previous);
        assert!(controlled_by_other(&issuer, &oref));

        let issuer = with_owner(issuer, &oref);
        let refs = issuer.metadata.owner_references.clone().unwrap();
        let controllers: Vec<_> = refs
            .iter()
            .filter(|r| r.controller == Some(true))
            .map(|r| r.uid.as_str())
            .collect();
        assert_eq!(refs.len(), 2);
        assert_eq!(controllers, vec!["uid-1"]);
        assert!(!controlled_by_other(&issuer, &oref));
    }

    #[test]
    fn test_owning_configs_maps_to_cluster_scoped_ref() {
        let oref = owner_reference(&config_with_uid(Some("uid-1"))).unwrap();
        let issuer = with_owner(build_self_signed_issuer("cs-ss-issuer", "cert-manager"), &oref);

        let owners = owning_configs(&issuer);
        assert_eq!(owners, vec![ObjectRef::<SharedCAConfig>::new("shared-ca")]);
    }

    #[test]
    fn test_owning_configs_ignores_foreign_owners() {
        let mut issuer = build_self_signed_issuer("cs-ss-issuer", "cert-manager");
        issuer.metadata.owner_references = Some(vec![OwnerReference {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            name: "web".to_string(),
            uid: "uid-2".to_string(),
            ..Default::default()
        }]);
        assert!(owning_configs(&issuer).is_empty());
    }
}
