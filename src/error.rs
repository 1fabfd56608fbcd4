//! Error types for the proxy-pool-registry crate.

use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Error returned when the proxy pool could not be written to durable storage.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The backing file could not be encoded or decoded.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The backing file parsed but does not have the expected shape.
    #[error("invalid configuration document: {0}")]
    InvalidDocument(String),
}

/// Errors surfaced by the registry and the management operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// An entry with the same id already exists.
    #[error("proxy ID already exists: {id}")]
    Conflict { id: String },

    /// The referenced entry does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A collaborator needed by the operation was not wired in.
    #[error("{0} not available")]
    DependencyUnavailable(&'static str),

    /// The mutation was valid but could not be made durable. It has been rolled back.
    #[error("failed to persist proxy pool: {0}")]
    Persistence(#[from] PersistError),
}

impl RegistryError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn proxy_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "proxy",
            id: id.into(),
        }
    }

    /// HTTP status an exposing layer should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::DependencyUnavailable(_) | Self::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// JSON-ready error body, `{"error": "..."}`.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

/// Serializable error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Result type alias for `RegistryError`.
pub type Result<T> = std::result::Result<T, RegistryError>;
