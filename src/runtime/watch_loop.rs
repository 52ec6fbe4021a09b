//! # Watch Loop
//!
//! Controller watch loop that monitors `SharedCAConfig` resources, and the
//! cert-manager resources they own, and triggers reconciliation when changes
//! are detected.

use crate::config::ControllerConfig;
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::{Certificate, ClusterIssuer, Issuer, SharedCAConfig};
use crate::resources::owning_configs;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::StreamExt;
use kube::{Api, Client};
use kube_runtime::{watcher, Controller};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Run the controller watch loop
///
/// Restarts the controller whenever its stream ends, until a shutdown signal
/// marks the server as not ready.
///
/// # Errors
///
/// Currently always returns `Ok` once shutdown completes.
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    config: Arc<ControllerConfig>,
) -> Result<(), anyhow::Error> {
    let backoff_duration_ms = Arc::new(AtomicU64::new(config.backoff_start_ms));

    // SIGTERM/SIGINT: stop reporting ready, let in-flight reconciliations finish
    let shutdown_server_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        shutdown_server_state.set_ready(false);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });

    loop {
        if !server_state.is_ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let watch_span = tracing::info_span!("controller.watch", operation = "watch_loop");
        watch_span.in_scope(|| info!("Starting controller watch loop..."));

        let backoff = Arc::clone(&backoff_duration_ms);
        let filter_config = Arc::clone(&config);
        Controller::new(
            Api::<SharedCAConfig>::all(client.clone()),
            watcher::Config::default().any_semantic(),
        )
        .watches(
            Api::<Issuer>::all(client.clone()),
            watcher::Config::default(),
            |issuer| owning_configs(&issuer),
        )
        .watches(
            Api::<Certificate>::all(client.clone()),
            watcher::Config::default(),
            |certificate| owning_configs(&certificate),
        )
        .watches(
            Api::<ClusterIssuer>::all(client.clone()),
            watcher::Config::default(),
            |cluster_issuer| owning_configs(&cluster_issuer),
        )
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, Arc::clone(&reconciler))
        .filter_map(move |result| {
            let backoff = Arc::clone(&backoff);
            let config = Arc::clone(&filter_config);
            async move {
                match &result {
                    Ok((obj, action)) => {
                        backoff.store(config.backoff_start_ms, std::sync::atomic::Ordering::Relaxed);
                        debug!(resource.name = %obj.name, action = ?action, "watch.event.reconciled");
                        Some(result)
                    }
                    Err(e) => {
                        let error_string = format!("{e:?}");
                        handle_watch_stream_error(
                            &error_string,
                            &backoff,
                            config.backoff_max_ms,
                            config.watch_restart_delay_duration(),
                        )
                        .await
                        .map(|()| result)
                    }
                }
            }
        })
        .for_each(|_| futures::future::ready(()))
        .instrument(watch_span)
        .await;

        if !server_state.is_ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay = config.watch_restart_delay_after_end_duration();
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}
