//! # Runtime
//!
//! Process wiring for the operator binary.
//!
//! - `initialization`: logging, metrics, HTTP server and Kubernetes client setup
//! - `watch_loop`: controller watch with restart on stream errors
//! - `error_policy`: reconciliation and watch stream error handling

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
