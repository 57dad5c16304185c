//! llms-export: a resumable content-export pipeline
//!
//! This crate exports a bounded, enumerable set of content items to a remote
//! content-addressed artifact store and assembles an `llms.txt`-style manifest
//! of the uploaded artifacts. The pipeline is driven one polling step at a
//! time, so a run survives interruption at any point and resumes without
//! duplicate uploads or data loss.

pub mod artifact;
pub mod config;
pub mod content;
pub mod export;
pub mod manifest;
pub mod storage;

use thiserror::Error;

/// Main error type for export operations
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Content source error: {0}")]
    Source(#[from] content::SourceError),

    #[error("Artifact store error: {0}")]
    Artifact(#[from] artifact::ArtifactError),

    #[error("No content kinds configured for export")]
    NoItemsConfigured,

    #[error("Generation failed: {0}")]
    Generation(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use content::Item;
pub use export::{ExportController, StepReport};
pub use storage::{SqliteStorage, Storage};
