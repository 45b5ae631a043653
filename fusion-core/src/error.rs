//! Error types for Fusion operations

use crate::EntityType;
use thiserror::Error;

/// Errors raised while fetching from the REST backend.
///
/// Every variant is `Clone`: one failed request is handed to every caller
/// that joined it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Transport error on {path}: {reason}")]
    Transport { path: String, reason: String },

    #[error("Request to {path} failed with status {status}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Request to {path} timed out")]
    Timeout { path: String },
}

impl FetchError {
    /// Path of the request that failed.
    pub fn path(&self) -> &str {
        match self {
            FetchError::Transport { path, .. }
            | FetchError::Status { path, .. }
            | FetchError::Decode { path, .. }
            | FetchError::Timeout { path } => path,
        }
    }
}

/// Store layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: EntityType, id: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Request for {key} aborted: {reason}")]
    RequestAborted { key: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or {env_var})")]
    MissingConfigPath { env_var: String },

    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse config: {reason}")]
    Parse { reason: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Fusion errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FusionError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Telemetry error: {reason}")]
    Telemetry { reason: String },
}

/// Result type alias for Fusion operations.
pub type FusionResult<T> = Result<T, FusionError>;

// =============================================================================
// TESTS
// =============================================================================
