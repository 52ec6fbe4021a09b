//! # Mode Reconciler
//!
//! Drives the derived resources of one `SharedCAConfig` toward the declared
//! CA mode.
//!
//! ## Default mode
//!
//! 1. self-signed `Issuer` (`cs-ss-issuer`)
//! 2. CA `Certificate` (`cs-ca-certificate`) signed by that issuer
//! 3. `ClusterIssuer` trusting the generated secret (`cs-ca-certificate-secret`)
//!
//! ## BYO mode
//!
//! 1. delete the CA `Certificate`, the generated secret and the self-signed `Issuer`
//! 2. `ClusterIssuer` trusting the user-supplied secret
//!
//! Every call is computed from the declared mode and the current store state
//! alone, so a missed event or a half-finished earlier run is repaired by the
//! next one. Store calls run strictly in sequence and the first failure aborts
//! the run; retrying is left to the caller.

use crate::constants::{
    CA_CERTIFICATE_NAME, CA_SECRET_NAME, ISSUER_KIND, SELF_SIGNED_ISSUER_NAME,
};
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::{CaMode, Certificate, ClusterIssuer, Issuer, SharedCAConfigSpec};
use crate::observability::metrics;
use crate::resources::{
    build_ca_certificate, build_cluster_issuer, build_self_signed_issuer,
    cluster_issuer_secret_name, controlled_by_other, with_owner,
};
use crate::status::events::reasons;
use crate::status::{Severity, StatusReporter};
use crate::store::{
    CreateOutcome, DeleteOutcome, Lookup, ObjectKey, ResourceStore, SharedCaStore, StoreError,
    StoreOperation, UpdateOutcome,
};
use k8s_openapi::api::core::v1::{ObjectReference, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use tracing::{debug, error, info, Span};

const SELF_SIGNED_ISSUER: &str = "self signed Issuer";
const CA_CERTIFICATE: &str = "CA Certificate";
const CA_SECRET: &str = "CA Secret";
const CA_CLUSTER_ISSUER: &str = "CA ClusterIssuer";

/// Mode reconciler for a single `SharedCAConfig` snapshot
///
/// Borrowed per invocation; holds no state across reconciliations.
pub struct ModeReconciler<'a, S: ?Sized, R: ?Sized> {
    store: &'a S,
    reporter: &'a R,
    owner: OwnerReference,
    event_ref: ObjectReference,
    span: Span,
    require_byo_secret_name: bool,
}

impl<S: ?Sized, R: ?Sized> std::fmt::Debug for ModeReconciler<'_, S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeReconciler")
            .field("owner", &self.owner.name)
            .field("require_byo_secret_name", &self.require_byo_secret_name)
            .finish_non_exhaustive()
    }
}

impl<'a, S, R> ModeReconciler<'a, S, R>
where
    S: SharedCaStore + ?Sized,
    R: StatusReporter + ?Sized,
{
    /// `owner` is attached to every created resource, `event_ref` receives
    /// the status events and `span` is the parent of every log line.
    pub fn new(
        store: &'a S,
        reporter: &'a R,
        owner: OwnerReference,
        event_ref: ObjectReference,
        span: Span,
    ) -> Self {
        Self {
            store,
            reporter,
            owner,
            event_ref,
            span,
            require_byo_secret_name: false,
        }
    }

    /// Reject BYO configs without `byoSecretName` instead of falling back to
    /// the generated secret name
    #[must_use]
    pub fn require_byo_secret_name(mut self, require: bool) -> Self {
        self.require_byo_secret_name = require;
        self
    }

    /// Validate `spec` and apply exactly one mode
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an unusable spec, otherwise the first
    /// failure of the selected mode.
    pub async fn converge(&self, spec: &SharedCAConfigSpec) -> Result<(), ReconcilerError> {
        if let Err(message) = spec.validate(self.require_byo_secret_name) {
            return Err(self
                .fail(
                    &format!("Invalid configuration: {message}"),
                    ReconcilerError::InvalidConfig(message),
                )
                .await);
        }

        let mode = spec.mode;
        debug!(parent: &self.span, mode = %mode, namespace = %spec.namespace, "Converging shared CA");
        match mode {
            CaMode::Default => self.apply_default(spec).await,
            CaMode::Byo => self.apply_byo(spec).await,
        }
    }

    /// Generated CA: self-signed Issuer, CA Certificate, ClusterIssuer
    ///
    /// Existing objects are left alone, except a ClusterIssuer that trusts a
    /// different secret, which is pointed back at the generated one.
    ///
    /// # Errors
    ///
    /// Returns the first store failure; later steps are not attempted.
    pub async fn apply_default(&self, spec: &SharedCAConfigSpec) -> Result<(), ReconcilerError> {
        let ns = spec.namespace.as_str();

        self.ensure_exists(
            &ObjectKey::namespaced(SELF_SIGNED_ISSUER_NAME, ns),
            SELF_SIGNED_ISSUER,
            || build_self_signed_issuer(SELF_SIGNED_ISSUER_NAME, ns),
        )
        .await?;

        self.ensure_exists(
            &ObjectKey::namespaced(CA_CERTIFICATE_NAME, ns),
            CA_CERTIFICATE,
            || {
                build_ca_certificate(
                    CA_CERTIFICATE_NAME,
                    ns,
                    CA_SECRET_NAME,
                    SELF_SIGNED_ISSUER_NAME,
                    ISSUER_KIND,
                )
            },
        )
        .await?;

        self.ensure_cluster_issuer(spec.effective_cluster_issuer_name(), CA_SECRET_NAME)
            .await?;

        self.succeed("Successfully created self signed issuer, CA certificate, and CA clusterissuer")
            .await;
        Ok(())
    }

    /// User-supplied CA: remove the generated chain, point the ClusterIssuer
    /// at the user's secret
    ///
    /// An empty `byoSecretName` falls back to the generated secret name. The
    /// generated secret is kept when the user named it as their own.
    ///
    /// # Errors
    ///
    /// Returns the first store failure or an update conflict.
    pub async fn apply_byo(&self, spec: &SharedCAConfigSpec) -> Result<(), ReconcilerError> {
        let ns = spec.namespace.as_str();
        let secret_name = spec.effective_byo_secret_name();

        self.delete_if_present::<Certificate>(
            &ObjectKey::namespaced(CA_CERTIFICATE_NAME, ns),
            CA_CERTIFICATE,
        )
        .await?;

        if spec.ca_secret_is_user_owned() {
            debug!(parent: &self.span, secret = CA_SECRET_NAME, "BYO secret uses the generated name, keeping it");
        } else {
            self.delete_if_present::<Secret>(&ObjectKey::namespaced(CA_SECRET_NAME, ns), CA_SECRET)
                .await?;
        }

        self.delete_if_present::<Issuer>(
            &ObjectKey::namespaced(SELF_SIGNED_ISSUER_NAME, ns),
            SELF_SIGNED_ISSUER,
        )
        .await?;

        self.ensure_cluster_issuer(spec.effective_cluster_issuer_name(), secret_name)
            .await?;

        self.succeed(&format!(
            "Successfully configured CA clusterissuer with user-supplied secret {secret_name}"
        ))
        .await;
        Ok(())
    }

    /// Delete every derived resource, tolerating ones already gone
    ///
    /// Order: ClusterIssuer, CA Certificate, generated secret, self-signed
    /// Issuer. A user-owned BYO secret is never deleted, nor is a
    /// ClusterIssuer controlled by another owner.
    ///
    /// # Errors
    ///
    /// Returns the first store failure.
    pub async fn remove_shared_ca(&self, spec: &SharedCAConfigSpec) -> Result<(), ReconcilerError> {
        let key = ObjectKey::cluster(spec.effective_cluster_issuer_name());
        match self.get::<ClusterIssuer>(&key).await {
            Ok(Lookup::Found(existing)) if controlled_by_other(&existing, &self.owner) => {
                info!(parent: &self.span, name = %key.name, "ClusterIssuer is controlled by another owner, leaving it in place");
            }
            Ok(Lookup::Found(_)) => {
                self.delete_if_present::<ClusterIssuer>(&key, CA_CLUSTER_ISSUER)
                    .await?;
            }
            Ok(Lookup::NotFound) => {}
            Err(e) => {
                return Err(self
                    .fail(&format!("Error accessing {CA_CLUSTER_ISSUER}"), e.into())
                    .await)
            }
        }

        let ns = spec.namespace.as_str();
        if ns.trim().is_empty() {
            debug!(parent: &self.span, "No namespace configured, skipping namespaced resources");
        } else {
            self.delete_if_present::<Certificate>(
                &ObjectKey::namespaced(CA_CERTIFICATE_NAME, ns),
                CA_CERTIFICATE,
            )
            .await?;
            if !spec.ca_secret_is_user_owned() {
                self.delete_if_present::<Secret>(
                    &ObjectKey::namespaced(CA_SECRET_NAME, ns),
                    CA_SECRET,
                )
                .await?;
            }
            self.delete_if_present::<Issuer>(
                &ObjectKey::namespaced(SELF_SIGNED_ISSUER_NAME, ns),
                SELF_SIGNED_ISSUER,
            )
            .await?;
        }

        self.succeed("Successfully removed shared CA resources").await;
        Ok(())
    }

    /// Create `key` from `build` unless it exists; returns the existing object
    async fn ensure_exists<K>(
        &self,
        key: &ObjectKey,
        what: &str,
        build: impl FnOnce() -> K + Send,
    ) -> Result<Option<K>, ReconcilerError>
    where
        K: Resource<DynamicType = ()> + Send + Sync + 'static,
        S: ResourceStore<K>,
    {
        match self.get::<K>(key).await {
            Ok(Lookup::Found(existing)) => {
                debug!(parent: &self.span, "{} {} already exists", what, key);
                Ok(Some(existing))
            }
            Ok(Lookup::NotFound) => {
                info!(parent: &self.span, name = %key.name, namespace = ?key.namespace, "Creating a new {}", what);
                let obj = with_owner(build(), &self.owner);
                match self.create(&obj).await {
                    Ok(CreateOutcome::Created) => Ok(None),
                    Ok(CreateOutcome::AlreadyExists) => {
                        debug!(parent: &self.span, "{} {} was created concurrently", what, key);
                        Ok(None)
                    }
                    Err(e) => Err(self.fail(&format!("Error creating {what}"), e.into()).await),
                }
            }
            Err(e) => Err(self.fail(&format!("Error accessing {what}"), e.into()).await),
        }
    }

    /// ClusterIssuer `name` must exist and trust `secret_name`
    async fn ensure_cluster_issuer(
        &self,
        name: &str,
        secret_name: &str,
    ) -> Result<(), ReconcilerError> {
        let key = ObjectKey::cluster(name);
        let Some(found) = self
            .ensure_exists(&key, CA_CLUSTER_ISSUER, || {
                build_cluster_issuer(name, secret_name)
            })
            .await?
        else {
            return Ok(());
        };

        let current = cluster_issuer_secret_name(&found);
        if current == Some(secret_name) {
            return Ok(());
        }

        info!(
            parent: &self.span,
            name,
            from = current.unwrap_or("<none>"),
            to = secret_name,
            "Updating ClusterIssuer secret"
        );
        // Keep the found metadata so the update carries its resourceVersion
        let mut updated = found;
        updated.spec = build_cluster_issuer(name, secret_name).spec;
        let updated = with_owner(updated, &self.owner);

        match self.update(&updated).await {
            Ok(UpdateOutcome::Updated) => Ok(()),
            Ok(UpdateOutcome::Conflict) => Err(self
                .fail(
                    &format!("Conflict updating {CA_CLUSTER_ISSUER}"),
                    ReconcilerError::Conflict {
                        kind: "ClusterIssuer",
                        name: name.to_string(),
                    },
                )
                .await),
            Err(e) => Err(self
                .fail(&format!("Error updating {CA_CLUSTER_ISSUER}"), e.into())
                .await),
        }
    }

    async fn delete_if_present<K>(&self, key: &ObjectKey, what: &str) -> Result<(), ReconcilerError>
    where
        K: Resource<DynamicType = ()> + Send + Sync + 'static,
        S: ResourceStore<K>,
    {
        match self.delete::<K>(key).await {
            Ok(DeleteOutcome::Deleted) => {
                info!(parent: &self.span, name = %key.name, namespace = ?key.namespace, "Deleted {}", what);
                Ok(())
            }
            Ok(DeleteOutcome::NotFound) => Ok(()),
            Err(e) => Err(self.fail(&format!("Error deleting {what}"), e.into()).await),
        }
    }

    async fn get<K>(&self, key: &ObjectKey) -> Result<Lookup<K>, StoreError>
    where
        K: Resource<DynamicType = ()> + Send + Sync + 'static,
        S: ResourceStore<K>,
    {
        let result = ResourceStore::<K>::get(self.store, key).await;
        observe::<K, _>(StoreOperation::Get, result)
    }

    async fn create<K>(&self, obj: &K) -> Result<CreateOutcome, StoreError>
    where
        K: Resource<DynamicType = ()> + Send + Sync + 'static,
        S: ResourceStore<K>,
    {
        let result = ResourceStore::<K>::create(self.store, obj).await;
        observe::<K, _>(StoreOperation::Create, result)
    }

    async fn update<K>(&self, obj: &K) -> Result<UpdateOutcome, StoreError>
    where
        K: Resource<DynamicType = ()> + Send + Sync + 'static,
        S: ResourceStore<K>,
    {
        let result = ResourceStore::<K>::update(self.store, obj).await;
        observe::<K, _>(StoreOperation::Update, result)
    }

    async fn delete<K>(&self, key: &ObjectKey) -> Result<DeleteOutcome, StoreError>
    where
        K: Resource<DynamicType = ()> + Send + Sync + 'static,
        S: ResourceStore<K>,
    {
        let result = ResourceStore::<K>::delete(self.store, key).await;
        observe::<K, _>(StoreOperation::Delete, result)
    }

    async fn succeed(&self, message: &str) {
        info!(parent: &self.span, "{}", message);
        self.reporter
            .record(&self.event_ref, Severity::Normal, reasons::SUCCESS, message)
            .await;
    }

    /// Log and report `err`, then hand it back to the caller
    async fn fail(&self, message: &str, err: ReconcilerError) -> ReconcilerError {
        error!(parent: &self.span, error = %err, "{}, requeueing", message);
        self.reporter
            .record(&self.event_ref, Severity::Warning, reasons::ERROR, message)
            .await;
        err
    }
}

fn observe<K, T>(operation: StoreOperation, result: Result<T, StoreError>) -> Result<T, StoreError>
where
    K: Resource<DynamicType = ()>,
{
    let kind = K::kind(&());
    metrics::record_resource_operation(&kind, operation.as_str());
    if result.is_err() {
        metrics::increment_resource_operation_errors(&kind, operation.as_str());
    }
    result
}
