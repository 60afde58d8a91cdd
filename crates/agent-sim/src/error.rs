//! Error taxonomy for the simulation engine.

use std::path::PathBuf;
use thiserror::Error;

/// Failures from the persisted stores (memory, personality, analytics).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed input to a store or update call
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error at {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Serialization {
            path: path.into(),
            source,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}

/// Failures from the external content source or draft generator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("content {content_id} rejected comment: {reason}")]
    Rejected { content_id: String, reason: String },

    #[error("content not found: {0}")]
    NotFound(String),

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("draft generation failed: {0}")]
    Draft(String),

    #[error("content source unavailable: {0}")]
    Unavailable(String),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidOverride { key: String, value: String },
}

/// Top-level engine error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
