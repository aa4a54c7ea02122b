//! Error types for search-defaults.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! the specific condition. No operation is retried internally: every
//! mutation validates before it mutates.

use thiserror::Error;

use crate::context::BrowsingContext;
use crate::engine::EngineId;

/// Errors in the baseline engine configuration.
///
/// These are fatal at initialization time.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Configuration contains no engines")]
    NoEngines,

    #[error("Engine identifier cannot be empty")]
    EmptyIdentifier,

    #[error("Duplicate engine identifier: {id}")]
    DuplicateIdentifier {
        id: String,
    },

    #[error("Duplicate engine name: {name}")]
    DuplicateName {
        name: String,
    },

    #[error("Configuration is missing the globalDefault record")]
    MissingGlobalDefault,

    #[error("Configuration contains more than one defaults record")]
    MultipleDefaultsRecords,

    #[error("Global default '{id}' for {context} browsing is not a configured engine")]
    UnknownGlobalDefault {
        id: String,
        context: BrowsingContext,
    },

    #[error("Malformed configuration: {message}")]
    Malformed {
        message: String,
    },

    #[error("No engine is left to fall back to for {context} browsing")]
    NoFallbackCandidate {
        context: BrowsingContext,
    },
}

/// Errors raised by service operations.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Engine not found: {id}")]
    EngineNotFound {
        id: EngineId,
    },

    #[error("An engine named '{name}' already exists")]
    EngineAlreadyExists {
        name: String,
    },

    #[error("Invalid engine definition: {reason}")]
    Validation {
        reason: String,
    },

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

/// Errors raised by a registry backend.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Engine not found.
    #[error("Engine not found: {0}")]
    NotFound(EngineId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Backend error.
    #[error("Registry backend error: {0}")]
    BackendError(String),
}

/// Errors reading or writing persisted settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported settings version {found} (expected {expected})")]
    UnsupportedVersion {
        found: u32,
        expected: u32,
    },
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Registry error: {0}")]
    Registry(RegistryError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl From<RegistryError> for SearchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => Self::Execution(ExecutionError::EngineNotFound { id }),
            other => Self::Registry(other),
        }
    }
}

impl SearchError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an `EngineNotFound` error.
    #[must_use]
    pub fn engine_not_found(id: EngineId) -> Self {
        Self::Execution(ExecutionError::EngineNotFound { id })
    }

    /// Returns true if an engine reference could not be resolved.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Execution(ExecutionError::EngineNotFound { .. })
        )
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if this is a settings error.
    #[must_use]
    pub const fn is_settings(&self) -> bool {
        matches!(self, Self::Settings(_))
    }
}

/// Result type alias for search-defaults operations.
pub type SearchResult<T> = Result<T, SearchError>;
