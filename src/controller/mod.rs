//! # Controller
//!
//! Core controller modules for the Catalog Sync Controller.
//!
//! - `backoff`: Fibonacci backoff for source watch restarts
//! - `reconciler`: Catalog reconciliation engine
//! - `scheduler`: Interval-driven reconciliation passes
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod reconciler;
pub mod scheduler;
pub mod server;
