//! Error types for `mytodo`.

use std::path::PathBuf;

use crate::tasks::StoreError;

/// Errors that can occur outside of individual store calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON serialization error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error occurred.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A task store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A configuration file was requested explicitly but does not exist.
    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// The configuration is present but unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A template error occurred.
    #[error("Template error: {0}")]
    Template(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
