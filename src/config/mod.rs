//! Configuration module for llms-export
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Bounded settings are clamped into range at load time so the rest
//! of the pipeline never sees out-of-range values.
//!
//! # Example
//!
//! ```no_run
//! use llms_export::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Exporting kinds: {:?}", config.export.kinds);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ArtifactConfig, Config, ExportSettings, OutputConfig, SiteConfig};

// Re-export parser functions
pub use parser::load_config;
