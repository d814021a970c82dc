//! Configuration system for lifecycle hooks.
//!
//! This module provides a flexible configuration system that supports loading
//! configuration from multiple sources (files, environment variables, etc.)
//! with proper validation and defaults.

mod builder;
mod loader;
mod models;
mod validation;

pub use builder::ConfigBuilder;
pub use loader::ConfigLoader;
pub use models::*;
pub use validation::validate_config;

/// Default configuration file names that the system will look for
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "lifecycle-hooks.toml",
    "lifecycle-hooks.yaml",
    "lifecycle-hooks.yml",
    "lifecycle-hooks.json",
    ".lifecycle-hooks/config.toml",
    ".lifecycle-hooks/config.yaml",
    ".lifecycle-hooks/config.yml",
    ".lifecycle-hooks/config.json",
];

/// Environment variable prefix for configuration
pub const ENV_PREFIX: &str = "LIFECYCLE_HOOKS_";

/// Settings error type
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Error occurred during file loading
    #[error("Failed to load configuration file: {0}")]
    FileLoadError(String),

    /// Error occurred during validation
    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    /// Error occurred during parsing
    #[error("Configuration parsing error: {0}")]
    ParseError(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, SettingsError>;
