//! Configuration builder.
//!
//! This module provides a builder pattern API for creating configurations.

use super::{Result, models::*, validation};
use std::path::Path;

/// Builder for creating LifecycleConfig instances.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: LifecycleConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self {
            config: LifecycleConfig::default(),
        }
    }

    /// Start from defaults; equivalent to [`ConfigBuilder::new`].
    pub fn defaults() -> Self {
        Self::new()
    }

    /// Turn hook dispatch on or off for the whole process.
    pub fn with_hooks_enabled(mut self, enabled: bool) -> Self {
        self.config.dispatch.enabled = enabled;
        self
    }

    /// Control whether watched relation caches are cleared before hooked saves.
    pub fn with_clear_related_cache(mut self, clear: bool) -> Self {
        self.config.dispatch.clear_related_cache = clear;
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Set the log format.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Log to a file.
    pub fn with_log_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.logging.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable logging to stdout.
    pub fn with_stdout_logging(mut self, enabled: bool) -> Self {
        self.config.logging.stdout = enabled;
        self
    }

    /// Build the configuration, validating it first.
    pub fn build(self) -> Result<LifecycleConfig> {
        validation::validate_config(&self.config)?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
