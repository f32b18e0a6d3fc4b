//! Catalog Sync Controller Library
//!
//! This library provides the core functionality for the Catalog Sync Controller:
//! it watches Kubernetes `Service` objects and keeps matching registrations in
//! the Consul catalog, including namespace mapping and ACL policy attachment.
//! Tests are included in the module files and under `tests/`.

// Re-export modules so they can be tested
pub mod catalog;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod observability;
pub mod runtime;
pub mod source;
