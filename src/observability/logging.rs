//! # Logging
//!
//! Global `tracing` subscriber. `RUST_LOG` overrides the default filter;
//! `LOG_FORMAT=json` switches to one JSON object per line.

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "shared_ca_operator=info,kube_runtime=warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
}

/// Install the global subscriber
///
/// Returns an error if a subscriber is already installed.
#[allow(
    clippy::missing_errors_doc,
    reason = "Only fails when a global subscriber already exists"
)]
pub fn init_tracing(json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_current_span(true)
            .with_env_filter(env_filter())
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_target(true)
            .with_env_filter(env_filter())
            .try_init()
    }
}
