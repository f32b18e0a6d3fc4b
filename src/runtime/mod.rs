//! # Runtime
//!
//! Process bootstrap and the policies that keep long-running tasks alive.
//!
//! - `initialization`: rustls, tracing, metrics, HTTP server and Kubernetes client setup
//! - `error_policy`: watch stream error classification and restart delays

pub mod error_policy;
pub mod initialization;
