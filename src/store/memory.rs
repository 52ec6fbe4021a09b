//! # In-Memory Store
//!
//! Deterministic `ResourceStore` used by tests and local dry runs.
//!
//! Objects are kept per kind in ordered maps. Every call through the
//! `ResourceStore` interface is appended to a call log; seeding and inspection
//! helpers (`insert`, `object`, `remove`) bypass the log. Failures can be
//! injected per operation and kind, and `resourceVersion` is bumped on every
//! write so stale updates come back as `UpdateOutcome::Conflict`.

use super::{
    CreateOutcome, DeleteOutcome, Lookup, ObjectKey, ResourceStore, StoreError, StoreOperation,
    UpdateOutcome,
};
use crate::crd::{Certificate, ClusterIssuer, Issuer};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::Resource;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One call made through the `ResourceStore` interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub operation: StoreOperation,
    pub kind: &'static str,
    pub key: ObjectKey,
}

impl StoreCall {
    #[must_use]
    pub fn new(operation: StoreOperation, kind: &'static str, key: ObjectKey) -> Self {
        Self {
            operation,
            kind,
            key,
        }
    }

    #[must_use]
    pub fn is_mutation(&self) -> bool {
        self.operation != StoreOperation::Get
    }
}

#[derive(Debug, Clone)]
enum Injected {
    Error(String),
    Conflict,
    AlreadyExists,
}

/// Backing maps, call log and injected outcomes
#[doc(hidden)]
#[derive(Debug, Default)]
pub struct State {
    issuers: BTreeMap<ObjectKey, Issuer>,
    certificates: BTreeMap<ObjectKey, Certificate>,
    cluster_issuers: BTreeMap<ObjectKey, ClusterIssuer>,
    secrets: BTreeMap<ObjectKey, Secret>,
    calls: Vec<StoreCall>,
    injected: Vec<(StoreOperation, &'static str, Injected)>,
    next_version: u64,
}

impl State {
    fn take_injected(&mut self, operation: StoreOperation, kind: &'static str) -> Option<Injected> {
        let pos = self
            .injected
            .iter()
            .position(|(op, k, _)| *op == operation && *k == kind)?;
        Some(self.injected.remove(pos).2)
    }

    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

/// A kind the in-memory store can hold
pub trait StoredKind: Resource + Clone + Send + Sync + 'static {
    const KIND: &'static str;

    #[doc(hidden)]
    fn objects(state: &mut State) -> &mut BTreeMap<ObjectKey, Self>;
}

impl StoredKind for Issuer {
    const KIND: &'static str = "Issuer";

    fn objects(state: &mut State) -> &mut BTreeMap<ObjectKey, Self> {
        &mut state.issuers
    }
}

impl StoredKind for Certificate {
    const KIND: &'static str = "Certificate";

    fn objects(state: &mut State) -> &mut BTreeMap<ObjectKey, Self> {
        &mut state.certificates
    }
}

impl StoredKind for ClusterIssuer {
    const KIND: &'static str = "ClusterIssuer";

    fn objects(state: &mut State) -> &mut BTreeMap<ObjectKey, Self> {
        &mut state.cluster_issuers
    }
}

impl StoredKind for Secret {
    const KIND: &'static str = "Secret";

    fn objects(state: &mut State) -> &mut BTreeMap<ObjectKey, Self> {
        &mut state.secrets
    }
}

/// In-process store with a call log and failure injection
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an object without recording a call
    pub fn insert<K: StoredKind>(&self, mut obj: K) {
        let mut state = self.lock();
        let version = state.bump_version();
        obj.meta_mut().resource_version = Some(version);
        K::objects(&mut state).insert(ObjectKey::of(&obj), obj);
    }

    /// Current object under `key`, without recording a call
    #[must_use]
    pub fn object<K: StoredKind>(&self, key: &ObjectKey) -> Option<K> {
        K::objects(&mut self.lock()).get(key).cloned()
    }

    /// Remove an object behind the reconciler's back
    pub fn remove<K: StoredKind>(&self, key: &ObjectKey) -> Option<K> {
        K::objects(&mut self.lock()).remove(key)
    }

    #[must_use]
    pub fn contains<K: StoredKind>(&self, key: &ObjectKey) -> bool {
        self.object::<K>(key).is_some()
    }

    /// Number of stored objects of kind `K`
    #[must_use]
    pub fn count<K: StoredKind>(&self) -> usize {
        K::objects(&mut self.lock()).len()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Calls other than `get`
    #[must_use]
    pub fn mutations(&self) -> Vec<StoreCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make the next `operation` on `kind` fail with a transient error
    pub fn fail_next(&self, operation: StoreOperation, kind: &'static str, message: &str) {
        self.lock()
            .injected
            .push((operation, kind, Injected::Error(message.to_string())));
    }

    /// Make the next update of `kind` report a resourceVersion conflict
    pub fn conflict_next_update(&self, kind: &'static str) {
        self.lock()
            .injected
            .push((StoreOperation::Update, kind, Injected::Conflict));
    }

    /// Make the next create of `kind` lose a race with another writer
    pub fn already_exists_next_create(&self, kind: &'static str) {
        self.lock()
            .injected
            .push((StoreOperation::Create, kind, Injected::AlreadyExists));
    }

    fn begin(
        &self,
        operation: StoreOperation,
        kind: &'static str,
        key: &ObjectKey,
    ) -> (MutexGuard<'_, State>, Option<Injected>) {
        let mut state = self.lock();
        state.calls.push(StoreCall::new(operation, kind, key.clone()));
        let injected = state.take_injected(operation, kind);
        (state, injected)
    }
}

fn injected_error(
    operation: StoreOperation,
    kind: &'static str,
    key: &ObjectKey,
    message: String,
) -> StoreError {
    StoreError::new(operation, kind, key.clone(), message)
}

#[async_trait]
impl<K: StoredKind> ResourceStore<K> for InMemoryStore {
    async fn get(&self, key: &ObjectKey) -> Result<Lookup<K>, StoreError> {
        let (mut state, injected) = self.begin(StoreOperation::Get, K::KIND, key);
        if let Some(Injected::Error(message)) = injected {
            return Err(injected_error(StoreOperation::Get, K::KIND, key, message));
        }
        Ok(match K::objects(&mut state).get(key) {
            Some(obj) => Lookup::Found(obj.clone()),
            None => Lookup::NotFound,
        })
    }

    async fn create(&self, obj: &K) -> Result<CreateOutcome, StoreError> {
        let key = ObjectKey::of(obj);
        let (mut state, injected) = self.begin(StoreOperation::Create, K::KIND, &key);
        match injected {
            Some(Injected::Error(message)) => {
                return Err(injected_error(StoreOperation::Create, K::KIND, &key, message));
            }
            Some(Injected::AlreadyExists) => return Ok(CreateOutcome::AlreadyExists),
            _ => {}
        }
        if K::objects(&mut state).contains_key(&key) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        let mut stored = obj.clone();
        stored.meta_mut().resource_version = Some(state.bump_version());
        K::objects(&mut state).insert(key, stored);
        Ok(CreateOutcome::Created)
    }

    async fn update(&self, obj: &K) -> Result<UpdateOutcome, StoreError> {
        let key = ObjectKey::of(obj);
        let (mut state, injected) = self.begin(StoreOperation::Update, K::KIND, &key);
        match injected {
            Some(Injected::Error(message)) => {
                return Err(injected_error(StoreOperation::Update, K::KIND, &key, message));
            }
            Some(Injected::Conflict) => return Ok(UpdateOutcome::Conflict),
            _ => {}
        }
        let current_version = match K::objects(&mut state).get(&key) {
            Some(current) => current.meta().resource_version.clone(),
            None => {
                return Err(injected_error(
                    StoreOperation::Update,
                    K::KIND,
                    &key,
                    "object not found".to_string(),
                ));
            }
        };
        if obj.meta().resource_version.is_some() && obj.meta().resource_version != current_version
        {
            return Ok(UpdateOutcome::Conflict);
        }
        let mut stored = obj.clone();
        stored.meta_mut().resource_version = Some(state.bump_version());
        K::objects(&mut state).insert(key, stored);
        Ok(UpdateOutcome::Updated)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<DeleteOutcome, StoreError> {
        let (mut state, injected) = self.begin(StoreOperation::Delete, K::KIND, key);
        if let Some(Injected::Error(message)) = injected {
            return Err(injected_error(StoreOperation::Delete, K::KIND, key, message));
        }
        Ok(match K::objects(&mut state).remove(key) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{build_cluster_issuer, build_self_signed_issuer};

    fn issuer_key() -> ObjectKey {
        ObjectKey::namespaced("cs-ss-issuer", "cert-manager")
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let store = InMemoryStore::new();
        let issuer = build_self_signed_issuer("cs-ss-issuer", "cert-manager");

        let created = ResourceStore::<Issuer>::create(&store, &issuer).await.unwrap();
        assert_eq!(created, CreateOutcome::Created);

        let again = ResourceStore::<Issuer>::create(&store, &issuer).await.unwrap();
        assert_eq!(again, CreateOutcome::AlreadyExists);

        let found = ResourceStore::<Issuer>::get(&store, &issuer_key()).await.unwrap();
        assert!(matches!(found, Lookup::Found(_)));

        let deleted = ResourceStore::<Issuer>::delete(&store, &issuer_key()).await.unwrap();
        assert_eq!(deleted, DeleteOutcome::Deleted);
        let missing = ResourceStore::<Issuer>::delete(&store, &issuer_key()).await.unwrap();
        assert_eq!(missing, DeleteOutcome::NotFound);

        assert_eq!(store.calls().len(), 5);
        assert_eq!(store.mutations().len(), 4);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let store = InMemoryStore::new();
        store.insert(build_cluster_issuer("cs-ca-issuer", "a"));
        let key = ObjectKey::cluster("cs-ca-issuer");

        let Lookup::Found(mut current) =
            ResourceStore::<ClusterIssuer>::get(&store, &key).await.unwrap()
        else {
            panic!("expected ClusterIssuer");
        };
        let mut stale = current.clone();

        current.spec = build_cluster_issuer("cs-ca-issuer", "b").spec;
        let outcome = ResourceStore::<ClusterIssuer>::update(&store, &current).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Updated);

        stale.spec = build_cluster_issuer("cs-ca-issuer", "c").spec;
        let outcome = ResourceStore::<ClusterIssuer>::update(&store, &stale).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Conflict);

        let stored = store.object::<ClusterIssuer>(&key).unwrap();
        assert_eq!(stored.spec.ca.unwrap().secret_name, "b");
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let store = InMemoryStore::new();
        store.fail_next(StoreOperation::Get, "Issuer", "apiserver unavailable");

        let err = ResourceStore::<Issuer>::get(&store, &issuer_key()).await.unwrap_err();
        assert_eq!(err.kind, "Issuer");
        assert!(err.to_string().contains("apiserver unavailable"));

        let ok = ResourceStore::<Issuer>::get(&store, &issuer_key()).await.unwrap();
        assert!(matches!(ok, Lookup::NotFound));
    }

    #[tokio::test]
    async fn test_seeding_is_not_recorded() {
        let store = InMemoryStore::new();
        store.insert(build_self_signed_issuer("cs-ss-issuer", "cert-manager"));
        assert!(store.contains::<Issuer>(&issuer_key()));
        assert_eq!(store.count::<Issuer>(), 1);
        assert!(store.calls().is_empty());
    }
}
