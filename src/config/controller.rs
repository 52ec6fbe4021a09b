//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use super::{env_var_or_default, env_var_or_default_bool, env_var_or_default_str};
use crate::constants::{
    CONTROLLER_NAME, DEFAULT_BACKOFF_MAX_MINUTES, DEFAULT_BACKOFF_MAX_MS,
    DEFAULT_BACKOFF_MIN_MINUTES, DEFAULT_BACKOFF_START_MS,
    DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS, DEFAULT_RESYNC_INTERVAL_SECS,
    DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS, DEFAULT_WATCH_RESTART_DELAY_SECS,
};
use std::time::Duration;

/// Controller-level configuration
///
/// Every setting has a default and can be overridden through the environment
/// (typically a ConfigMap mounted with `envFrom`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Requeue delay when the per-resource backoff table is unavailable (seconds)
    pub reconciliation_error_requeue_secs: u64,
    /// Periodic resync after a successful reconciliation (seconds)
    pub resync_interval_secs: u64,
    /// Fibonacci backoff floor for failed reconciliations (minutes)
    pub backoff_min_minutes: u64,
    /// Fibonacci backoff ceiling for failed reconciliations (minutes)
    pub backoff_max_minutes: u64,
    /// Watch stream backoff starting value (milliseconds)
    pub backoff_start_ms: u64,
    /// Watch stream backoff maximum value (milliseconds)
    pub backoff_max_ms: u64,
    /// Delay before restarting the watch after an unknown error (seconds)
    pub watch_restart_delay_secs: u64,
    /// Delay before restarting the watch after the stream ends (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Reject BYO configs without `byoSecretName` instead of falling back
    /// to the generated secret name
    pub byo_require_secret_name: bool,
    /// Log format (`json` or `text`)
    pub log_format: String,
    /// Reporting component for events and field manager for writes
    pub controller_name: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            reconciliation_error_requeue_secs: DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            backoff_min_minutes: DEFAULT_BACKOFF_MIN_MINUTES,
            backoff_max_minutes: DEFAULT_BACKOFF_MAX_MINUTES,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            byo_require_secret_name: false,
            log_format: "text".to_string(),
            controller_name: CONTROLLER_NAME.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            reconciliation_error_requeue_secs: env_var_or_default(
                "RECONCILIATION_ERROR_REQUEUE_SECS",
                defaults.reconciliation_error_requeue_secs,
            ),
            resync_interval_secs: env_var_or_default(
                "RESYNC_INTERVAL_SECS",
                defaults.resync_interval_secs,
            ),
            backoff_min_minutes: env_var_or_default(
                "BACKOFF_MIN_MINUTES",
                defaults.backoff_min_minutes,
            ),
            backoff_max_minutes: env_var_or_default(
                "BACKOFF_MAX_MINUTES",
                defaults.backoff_max_minutes,
            ),
            backoff_start_ms: env_var_or_default("BACKOFF_START_MS", defaults.backoff_start_ms),
            backoff_max_ms: env_var_or_default("BACKOFF_MAX_MS", defaults.backoff_max_ms),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                defaults.watch_restart_delay_secs,
            ),
            watch_restart_delay_after_end_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                defaults.watch_restart_delay_after_end_secs,
            ),
            byo_require_secret_name: env_var_or_default_bool(
                "BYO_REQUIRE_SECRET_NAME",
                defaults.byo_require_secret_name,
            ),
            log_format: env_var_or_default_str("LOG_FORMAT", &defaults.log_format),
            controller_name: env_var_or_default_str("CONTROLLER_NAME", &defaults.controller_name),
        }
    }

    #[must_use]
    pub fn reconciliation_error_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.reconciliation_error_requeue_secs)
    }

    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    #[must_use]
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    #[must_use]
    pub fn watch_restart_delay_after_end_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }

    #[must_use]
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.resync_interval(), Duration::from_secs(600));
        assert_eq!(config.backoff_min_minutes, 1);
        assert_eq!(config.backoff_max_minutes, 10);
        assert!(!config.byo_require_secret_name);
        assert_eq!(config.controller_name, "shared-ca-operator");
        assert!(!config.json_logs());
    }

    #[test]
    fn test_delay_helpers_follow_fields() {
        let config = ControllerConfig {
            reconciliation_error_requeue_secs: 7,
            watch_restart_delay_secs: 3,
            watch_restart_delay_after_end_secs: 2,
            ..ControllerConfig::default()
        };
        assert_eq!(config.reconciliation_error_requeue_duration(), Duration::from_secs(7));
        assert_eq!(config.watch_restart_delay_duration(), Duration::from_secs(3));
        assert_eq!(config.watch_restart_delay_after_end_duration(), Duration::from_secs(2));
    }

    // Only test in the crate that mutates the process environment.
    #[test]
    fn test_from_env_overrides_and_ignores_garbage() {
        std::env::set_var("RESYNC_INTERVAL_SECS", "30");
        std::env::set_var("BACKOFF_MAX_MINUTES", "not-a-number");
        std::env::set_var("BYO_REQUIRE_SECRET_NAME", "yes");
        std::env::set_var("LOG_FORMAT", "JSON");

        let config = ControllerConfig::from_env();

        std::env::remove_var("RESYNC_INTERVAL_SECS");
        std::env::remove_var("BACKOFF_MAX_MINUTES");
        std::env::remove_var("BYO_REQUIRE_SECRET_NAME");
        std::env::remove_var("LOG_FORMAT");

        assert_eq!(config.resync_interval_secs, 30);
        assert_eq!(config.backoff_max_minutes, DEFAULT_BACKOFF_MAX_MINUTES);
        assert!(config.byo_require_secret_name);
        assert!(config.json_logs());
    }
}
