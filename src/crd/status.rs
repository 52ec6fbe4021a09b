//! # SharedCAConfig Status
//!
//! Status types for tracking reconciliation state and conditions.

use serde::{Deserialize, Serialize};

/// Status of the SharedCAConfig resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SharedCAConfigStatus {
    /// Current phase of reconciliation
    /// Values: Pending, Ready, Failed, Terminating
    #[serde(default)]
    pub phase: Option<String>,
    /// Human-readable description of current state
    #[serde(default)]
    pub description: Option<String>,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Observed generation
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Last reconciliation time (RFC3339)
    #[serde(default)]
    pub last_reconcile_time: Option<String>,
    /// Mode applied by the last successful reconciliation
    #[serde(default)]
    pub mode: Option<String>,
    /// ClusterIssuer managed for this config
    #[serde(default)]
    pub cluster_issuer_name: Option<String>,
    /// Secret the ClusterIssuer trusts
    #[serde(default)]
    pub ca_secret_name: Option<String>,
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}
