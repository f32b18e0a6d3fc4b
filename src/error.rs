//! # Errors
//!
//! Error types shared by the catalog client and the configuration layer.
//!
//! Catalog failures are classified so the reconciler can decide whether an
//! operation is worth retrying on the next pass. Everything except a
//! malformed request is treated as transient.

use thiserror::Error;

/// Errors returned by [`crate::catalog::CatalogClient`] implementations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    /// Network or TLS failure talking to the catalog
    #[error("catalog transport error: {0}")]
    Transport(String),

    /// The catalog answered with a non-success HTTP status
    #[error("catalog returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The catalog answered with a body we could not decode
    #[error("failed to decode catalog response: {0}")]
    Decode(String),

    /// The referenced object does not exist
    #[error("{kind} '{name}' not found in catalog")]
    NotFound { kind: &'static str, name: String },

    /// The request itself is invalid; retrying will not help
    #[error("invalid catalog request: {0}")]
    InvalidRequest(String),
}

impl CatalogError {
    /// Create a transport error with the given message
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a decode error with the given message
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an invalid request error with the given message
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Whether the failed operation should be retried on the next pass
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }

    /// Short label used for metrics and structured logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status { status, .. } if *status == 429 => "throttled",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
            Self::NotFound { .. } => "not_found",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Errors raised while turning flags into a [`crate::config::SyncConfig`]
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A duration flag could not be parsed
    #[error("invalid duration for --{flag}: {reason}")]
    InvalidDuration { flag: &'static str, reason: String },

    /// A flag value is outside its accepted range
    #[error("invalid value for --{flag}: {reason}")]
    InvalidValue { flag: &'static str, reason: String },
}
