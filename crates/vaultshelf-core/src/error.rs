//! Error types for the transfer system.
//!
//! Local failures (vault, configuration, parsing) are represented by the
//! [`Error`] enum. Calls against the remote content service fail with
//! [`RemoteError`], which keeps rate limiting distinguishable from every
//! other request failure so the retry layer can tell them apart.

use std::io;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// The core error type for local vaultshelf operations.
#[derive(ThisError, Debug)]
pub enum Error {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Vault root missing or holding no markdown documents
    #[error("Vault is empty or missing: {path}")]
    VaultEmpty { path: PathBuf },

    /// Remote service unreachable or refusing our credentials
    #[error("Connectivity failure: {0}")]
    Connectivity(#[source] RemoteError),

    /// Parse error
    #[error("Parse error: {reason}")]
    ParseError { reason: String },

    /// Invalid configuration
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    /// Orchestrator asked to move between states it cannot connect
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Generic unclassified error
    #[error("Error: {0}")]
    Other(String),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an IO error
    pub fn io(err: io::Error) -> Self {
        Error::Io(err)
    }

    /// Create a vault empty error
    pub fn vault_empty(path: impl Into<PathBuf>) -> Self {
        Error::VaultEmpty { path: path.into() }
    }

    /// Create a parse error
    pub fn parse_error(reason: impl Into<String>) -> Self {
        Error::ParseError {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(reason: impl Into<String>) -> Self {
        Error::ConfigError {
            reason: reason.into(),
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        Error::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}

/// Failure of a single call against the remote content service.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The service asked us to slow down (HTTP 429)
    #[error("rate limited: {detail}")]
    RateLimited { detail: String },

    /// Any other failure: transport, authentication, validation, server error
    #[error("request failed{}: {detail}", status_suffix(.status))]
    RequestFailed { status: Option<u16>, detail: String },
}

impl RemoteError {
    /// Create a rate limited error
    pub fn rate_limited(detail: impl Into<String>) -> Self {
        RemoteError::RateLimited {
            detail: detail.into(),
        }
    }

    /// Create a request failure, optionally carrying the HTTP status
    pub fn request_failed(status: Option<u16>, detail: impl Into<String>) -> Self {
        RemoteError::RequestFailed {
            status,
            detail: detail.into(),
        }
    }

    /// Whether the failure is worth retrying after a backoff
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RemoteError::RateLimited { .. })
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}
