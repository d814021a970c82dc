//! Error types for hook declaration.

use thiserror::Error;

/// Errors raised while declaring hooks.
///
/// These signal a programming mistake in a model's hook declarations. They are
/// returned when the declaration is built and never deferred to the point where
/// a hook would fire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The event name is not one of the lifecycle events.
    #[error("{hook} is not a valid hook; must be one of {valid}")]
    UnknownHook {
        /// The rejected event name.
        hook: String,
        /// Comma separated list of accepted names.
        valid: String,
    },

    /// `has_changed` was given something other than a boolean.
    #[error("'has_changed' hook param must be a boolean")]
    NonBooleanHasChanged,

    /// `when` was given something other than a field name.
    #[error("'when' hook param must be a string matching the name of a model field")]
    NonStringWhen,

    /// `when_any` was not a list of field names.
    #[error("'when_any' hook param must be a list of strings matching the names of model fields")]
    MalformedWhenAny,

    /// `when_any` was an empty list.
    #[error("'when_any' hook param must contain at least one field name")]
    EmptyWhenAny,

    /// Both selector forms were supplied.
    #[error("Can pass either 'when' or 'when_any' but not both")]
    ConflictingSelectors,

    /// The registry for a model could not be assembled.
    #[error("hooks for {model} could not be declared: {message}")]
    Declaration {
        /// Model type name.
        model: String,
        /// What went wrong.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_unknown_hook() {
        let err = ConfigError::UnknownHook {
            hook: "after_persist".into(),
            valid: "before_save, after_save".into(),
        };
        assert_eq!(
            err.to_string(),
            "after_persist is not a valid hook; must be one of before_save, after_save"
        );
    }

    #[test]
    fn test_display_conflicting_selectors() {
        assert_eq!(
            ConfigError::ConflictingSelectors.to_string(),
            "Can pass either 'when' or 'when_any' but not both"
        );
    }
}
