//! # Initialization
//!
//! Operator start-up: rustls provider, tracing, metrics, HTTP server,
//! Kubernetes client and the reconciler context.

use crate::config::{ControllerConfig, ServerConfig};
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::{start_server, ServerState};
use crate::crd::SharedCAConfig;
use crate::observability::{logging, metrics};
use crate::status::KubeEventReporter;
use crate::store::KubeStore;
use anyhow::{anyhow, Result};
use kube::api::ListParams;
use kube::{Api, Client};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn, Instrument};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    pub controller_config: Arc<ControllerConfig>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .field("controller_config", &self.controller_config)
            .finish_non_exhaustive()
    }
}

/// Initialize the operator runtime
///
/// Order matters: the crypto provider and the subscriber come first, the
/// HTTP server must be bound before the client is created so probes answer
/// while the API server is still being contacted.
///
/// # Errors
///
/// Fails if the server cannot start in time or no Kubernetes client can be
/// built.
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    let provider_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    let controller_config = Arc::new(ControllerConfig::from_env());
    let server_config = ServerConfig::from_env();

    if let Err(e) = logging::init_tracing(controller_config.json_logs()) {
        eprintln!("Tracing subscriber already initialized: {e}");
    }

    info!("Starting Shared CA Operator");
    if !provider_installed {
        warn!("rustls crypto provider was already installed, keeping the existing one");
    }
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(config = ?controller_config, "Loaded controller configuration");

    metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default().await?;

    let reconciler = Arc::new(Reconciler::new(
        client.clone(),
        Arc::new(KubeStore::new(client.clone())),
        Arc::new(KubeEventReporter::new(
            client.clone(),
            &controller_config.controller_name,
        )),
        Arc::clone(&controller_config),
    ));

    reconcile_existing_resources(&client, &reconciler)
        .instrument(tracing::info_span!(
            "controller.startup.reconcile_existing",
            operation = "reconcile_existing_resources"
        ))
        .await;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
        controller_config,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &ServerState,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Reconcile configs that existed before the operator started
///
/// Failures are logged only; the watch picks every config up again.
async fn reconcile_existing_resources(client: &Client, reconciler: &Arc<Reconciler>) {
    let configs: Api<SharedCAConfig> = Api::all(client.clone());
    let list = match configs.list(&ListParams::default()).await {
        Ok(list) => list,
        Err(e) => {
            error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: cargo run --bin crdgen | kubectl apply -f -");
            warn!("Continuing despite CRD queryability check failure - controller will retry");
            return;
        }
    };

    if list.items.is_empty() {
        info!("No existing SharedCAConfig resources found, watch will pick up new resources");
        return;
    }

    let mut names: Vec<&str> = list
        .items
        .iter()
        .map(|item| item.metadata.name.as_deref().unwrap_or("unknown"))
        .collect();
    names.sort_unstable();
    info!(
        "Reconciling {} existing SharedCAConfig resources before starting watch: {}",
        names.len(),
        names.join(", ")
    );
    if names.len() > 1 {
        warn!("More than one SharedCAConfig exists; they will compete for the same derived resources");
    }

    for item in list.items {
        let name = item.metadata.name.clone().unwrap_or_default();
        match reconcile(Arc::new(item), Arc::clone(reconciler)).await {
            Ok(_) => info!(resource.name = name.as_str(), "reconciliation.success"),
            Err(e) => {
                error!(resource.name = name.as_str(), error = %e, "reconciliation.error");
            }
        }
    }
}
