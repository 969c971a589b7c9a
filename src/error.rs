//! Error types for promptr
//!
//! Centralized error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// All error types that can occur while resolving prompt sources
#[derive(Debug, Error)]
pub enum PromptrError {
    /// Malformed prompt or provider configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A force-marked or strict-mode reference has no file on disk
    #[error("Missing prompt file: {path}")]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A resolved source produced zero usable prompt entries
    #[error("No prompts found in {0}")]
    NoPromptsFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for promptr operations
pub type Result<T> = std::result::Result<T, PromptrError>;
