//! # Kubernetes Store
//!
//! `ResourceStore` backed by the Kubernetes API. 404 and 409 responses are
//! mapped onto store outcomes; every other API error is a `StoreError`.

use super::{
    CreateOutcome, DeleteOutcome, Lookup, ObjectKey, ResourceStore, StoreError, StoreOperation,
    UpdateOutcome,
};
use crate::constants::CONTROLLER_NAME;
use crate::crd::{Certificate, ClusterIssuer, Issuer};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// Store that talks to the API server through a shared `kube::Client`
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn namespaced<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace.unwrap_or("default"))
    }

    fn cluster<K>(&self) -> Api<K>
    where
        K: Resource<DynamicType = ()>,
    {
        Api::all(self.client.clone())
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(CONTROLLER_NAME.to_string()),
        ..Default::default()
    }
}

async fn get_with<K>(api: &Api<K>, kind: &'static str, key: &ObjectKey) -> Result<Lookup<K>, StoreError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    match api.get(&key.name).await {
        Ok(obj) => Ok(Lookup::Found(obj)),
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(Lookup::NotFound),
        Err(e) => Err(StoreError::new(StoreOperation::Get, kind, key.clone(), e)),
    }
}

async fn create_with<K>(api: &Api<K>, kind: &'static str, obj: &K) -> Result<CreateOutcome, StoreError>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug,
{
    let key = ObjectKey::of(obj);
    match api.create(&post_params(), obj).await {
        Ok(_) => {
            debug!("Created {} {}", kind, key);
            Ok(CreateOutcome::Created)
        }
        Err(kube::Error::Api(api_err)) if api_err.code == 409 => {
            debug!("{} {} already exists", kind, key);
            Ok(CreateOutcome::AlreadyExists)
        }
        Err(e) => Err(StoreError::new(StoreOperation::Create, kind, key, e)),
    }
}

async fn update_with<K>(api: &Api<K>, kind: &'static str, obj: &K) -> Result<UpdateOutcome, StoreError>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug,
{
    let key = ObjectKey::of(obj);
    match api.replace(&key.name, &post_params(), obj).await {
        Ok(_) => {
            debug!("Updated {} {}", kind, key);
            Ok(UpdateOutcome::Updated)
        }
        Err(kube::Error::Api(api_err)) if api_err.code == 409 => {
            debug!("Conflict updating {} {}", kind, key);
            Ok(UpdateOutcome::Conflict)
        }
        Err(e) => Err(StoreError::new(StoreOperation::Update, kind, key, e)),
    }
}

async fn delete_with<K>(api: &Api<K>, kind: &'static str, key: &ObjectKey) -> Result<DeleteOutcome, StoreError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    match api.delete(&key.name, &DeleteParams::background()).await {
        Ok(_) => {
            debug!("Deleted {} {}", kind, key);
            Ok(DeleteOutcome::Deleted)
        }
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(DeleteOutcome::NotFound),
        Err(e) => Err(StoreError::new(StoreOperation::Delete, kind, key.clone(), e)),
    }
}

#[async_trait]
impl ResourceStore<Issuer> for KubeStore {
    async fn get(&self, key: &ObjectKey) -> Result<Lookup<Issuer>, StoreError> {
        get_with(&self.namespaced(key.namespace.as_deref()), "Issuer", key).await
    }

    async fn create(&self, obj: &Issuer) -> Result<CreateOutcome, StoreError> {
        create_with(&self.namespaced(obj.metadata.namespace.as_deref()), "Issuer", obj).await
    }

    async fn update(&self, obj: &Issuer) -> Result<UpdateOutcome, StoreError> {
        update_with(&self.namespaced(obj.metadata.namespace.as_deref()), "Issuer", obj).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<DeleteOutcome, StoreError> {
        delete_with(&self.namespaced::<Issuer>(key.namespace.as_deref()), "Issuer", key).await
    }
}

#[async_trait]
impl ResourceStore<Certificate> for KubeStore {
    async fn get(&self, key: &ObjectKey) -> Result<Lookup<Certificate>, StoreError> {
        get_with(&self.namespaced(key.namespace.as_deref()), "Certificate", key).await
    }

    async fn create(&self, obj: &Certificate) -> Result<CreateOutcome, StoreError> {
        create_with(&self.namespaced(obj.metadata.namespace.as_deref()), "Certificate", obj).await
    }

    async fn update(&self, obj: &Certificate) -> Result<UpdateOutcome, StoreError> {
        update_with(&self.namespaced(obj.metadata.namespace.as_deref()), "Certificate", obj).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<DeleteOutcome, StoreError> {
        delete_with(&self.namespaced::<Certificate>(key.namespace.as_deref()), "Certificate", key)
            .await
    }
}

#[async_trait]
impl ResourceStore<ClusterIssuer> for KubeStore {
    async fn get(&self, key: &ObjectKey) -> Result<Lookup<ClusterIssuer>, StoreError> {
        get_with(&self.cluster(), "ClusterIssuer", key).await
    }

    async fn create(&self, obj: &ClusterIssuer) -> Result<CreateOutcome, StoreError> {
        create_with(&self.cluster(), "ClusterIssuer", obj).await
    }

    async fn update(&self, obj: &ClusterIssuer) -> Result<UpdateOutcome, StoreError> {
        update_with(&self.cluster(), "ClusterIssuer", obj).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<DeleteOutcome, StoreError> {
        delete_with(&self.cluster::<ClusterIssuer>(), "ClusterIssuer", key).await
    }
}

#[async_trait]
impl ResourceStore<Secret> for KubeStore {
    async fn get(&self, key: &ObjectKey) -> Result<Lookup<Secret>, StoreError> {
        get_with(&self.namespaced(key.namespace.as_deref()), "Secret", key).await
    }

    async fn create(&self, obj: &Secret) -> Result<CreateOutcome, StoreError> {
        create_with(&self.namespaced(obj.metadata.namespace.as_deref()), "Secret", obj).await
    }

    async fn update(&self, obj: &Secret) -> Result<UpdateOutcome, StoreError> {
        update_with(&self.namespaced(obj.metadata.namespace.as_deref()), "Secret", obj).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<DeleteOutcome, StoreError> {
        delete_with(&self.namespaced::<Secret>(key.namespace.as_deref()), "Secret", key).await
    }
}
