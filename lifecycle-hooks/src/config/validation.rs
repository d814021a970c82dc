//! Configuration validation utilities.

use super::SettingsError;
use super::models::*;

/// Validate the entire configuration.
pub fn validate_config(config: &LifecycleConfig) -> Result<(), SettingsError> {
    validate_logging_config(&config.logging)?;

    Ok(())
}

/// Validate logging configuration.
fn validate_logging_config(config: &LoggingConfig) -> Result<(), SettingsError> {
    if let Some(file) = &config.file
        && file.as_os_str().is_empty()
    {
        return Err(SettingsError::ValidationError(
            "Log file path cannot be empty".to_string(),
        ));
    }

    if !config.stdout && config.file.is_none() {
        return Err(SettingsError::ValidationError(
            "Logging needs at least one output: enable stdout or set a file".to_string(),
        ));
    }

    Ok(())
}
