//! # Resource Store
//!
//! Typed capability interface over the Kubernetes API for the resources the
//! operator derives. Each kind gets its own `ResourceStore<K>` implementation;
//! `SharedCaStore` bundles the four kinds the mode reconciler touches.
//!
//! Outcomes are tri-state: expected conditions (`NotFound`, `AlreadyExists`,
//! `Conflict`) are values, everything else is a `StoreError` and is treated
//! as a transient infrastructure failure.
//!
//! Implementations:
//! - `kube::KubeStore`: backed by `kube::Api<K>`
//! - `memory::InMemoryStore`: deterministic in-process store that records calls

use crate::crd::{Certificate, ClusterIssuer, Issuer};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use ::kube::Resource;
use std::fmt;
use thiserror::Error;

pub mod kube;
pub mod memory;

pub use self::kube::KubeStore;
pub use self::memory::{InMemoryStore, StoreCall};

/// Name and optional namespace of a stored object
///
/// Cluster-scoped kinds use `namespace: None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub name: String,
    pub namespace: Option<String>,
}

impl ObjectKey {
    pub fn namespaced(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Key of an existing object, taken from its metadata
    pub fn of<K: Resource>(obj: &K) -> Self {
        let meta = obj.meta();
        Self {
            name: meta.name.clone().unwrap_or_default(),
            namespace: meta.namespace.clone(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Result of a get
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<K> {
    Found(K),
    NotFound,
}

/// Result of a create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// Another writer created the object first
    AlreadyExists,
}

/// Result of an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// Optimistic concurrency collision (stale resourceVersion)
    Conflict,
}

/// Result of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Store operation, used in errors, call logs and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Get,
    Create,
    Update,
    Delete,
}

impl StoreOperation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOperation::Get => "get",
            StoreOperation::Create => "create",
            StoreOperation::Update => "update",
            StoreOperation::Delete => "delete",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient store failure
#[derive(Debug, Error)]
#[error("failed to {operation} {kind} {key}: {source}")]
pub struct StoreError {
    pub operation: StoreOperation,
    pub kind: &'static str,
    pub key: ObjectKey,
    /// `kube::Error` from `KubeStore`; injected failures from `InMemoryStore`
    /// are plain messages, hence the box
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl StoreError {
    pub fn new(
        operation: StoreOperation,
        kind: &'static str,
        key: ObjectKey,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation,
            kind,
            key,
            source: source.into(),
        }
    }
}

/// Get/create/update/delete for one resource kind
#[async_trait]
pub trait ResourceStore<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    async fn get(&self, key: &ObjectKey) -> Result<Lookup<K>, StoreError>;

    async fn create(&self, obj: &K) -> Result<CreateOutcome, StoreError>;

    /// Replace `obj`; its `resourceVersion` must match the stored object
    async fn update(&self, obj: &K) -> Result<UpdateOutcome, StoreError>;

    async fn delete(&self, key: &ObjectKey) -> Result<DeleteOutcome, StoreError>;
}

/// Every kind the shared CA hierarchy is made of
pub trait SharedCaStore:
    ResourceStore<Issuer>
    + ResourceStore<Certificate>
    + ResourceStore<ClusterIssuer>
    + ResourceStore<Secret>
{
}

impl<T> SharedCaStore for T where
    T: ?Sized
        + ResourceStore<Issuer>
        + ResourceStore<Certificate>
        + ResourceStore<ClusterIssuer>
        + ResourceStore<Secret>
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_display() {
        assert_eq!(
            ObjectKey::namespaced("cs-ss-issuer", "cert-manager").to_string(),
            "cert-manager/cs-ss-issuer"
        );
        assert_eq!(ObjectKey::cluster("cs-ca-issuer").to_string(), "cs-ca-issuer");
    }

    #[test]
    fn test_object_key_of_reads_metadata() {
        let issuer = crate::resources::build_self_signed_issuer("cs-ss-issuer", "cert-manager");
        assert_eq!(
            ObjectKey::of(&issuer),
            ObjectKey::namespaced("cs-ss-issuer", "cert-manager")
        );
    }

    #[test]
    fn test_store_error_message() {
        let err = StoreError::new(
            StoreOperation::Create,
            "Certificate",
            ObjectKey::namespaced("cs-ca-certificate", "cert-manager"),
            "connection reset",
        );
        assert_eq!(
            err.to_string(),
            "failed to create Certificate cert-manager/cs-ca-certificate: connection reset"
        );
    }
}
