//! Lifecycle events a hook can be attached to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ConfigError;

pub const BEFORE_CREATE: &str = "before_create";
pub const AFTER_CREATE: &str = "after_create";
pub const BEFORE_UPDATE: &str = "before_update";
pub const AFTER_UPDATE: &str = "after_update";
pub const BEFORE_SAVE: &str = "before_save";
pub const AFTER_SAVE: &str = "after_save";
pub const BEFORE_DELETE: &str = "before_delete";
pub const AFTER_DELETE: &str = "after_delete";

/// Every event name accepted by `hook(...)`.
pub const VALID_HOOKS: &[&str] = &[
    BEFORE_CREATE,
    AFTER_CREATE,
    BEFORE_UPDATE,
    AFTER_UPDATE,
    BEFORE_SAVE,
    AFTER_SAVE,
    BEFORE_DELETE,
    AFTER_DELETE,
];

/// Points in a model's persistence lifecycle where hooks fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Before a model that was never persisted is written.
    BeforeCreate,
    /// After a model that was never persisted has been written.
    AfterCreate,
    /// Before an already persisted model is written.
    BeforeUpdate,
    /// After an already persisted model has been written.
    AfterUpdate,
    /// Before any write, create or update.
    BeforeSave,
    /// After any write, create or update.
    AfterSave,
    /// Before the model is removed from storage.
    BeforeDelete,
    /// After the model has been removed from storage.
    AfterDelete,
}

impl LifecycleEvent {
    /// All events, in the order they are listed in [`VALID_HOOKS`].
    pub const ALL: [LifecycleEvent; 8] = [
        LifecycleEvent::BeforeCreate,
        LifecycleEvent::AfterCreate,
        LifecycleEvent::BeforeUpdate,
        LifecycleEvent::AfterUpdate,
        LifecycleEvent::BeforeSave,
        LifecycleEvent::AfterSave,
        LifecycleEvent::BeforeDelete,
        LifecycleEvent::AfterDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::BeforeCreate => BEFORE_CREATE,
            LifecycleEvent::AfterCreate => AFTER_CREATE,
            LifecycleEvent::BeforeUpdate => BEFORE_UPDATE,
            LifecycleEvent::AfterUpdate => AFTER_UPDATE,
            LifecycleEvent::BeforeSave => BEFORE_SAVE,
            LifecycleEvent::AfterSave => AFTER_SAVE,
            LifecycleEvent::BeforeDelete => BEFORE_DELETE,
            LifecycleEvent::AfterDelete => AFTER_DELETE,
        }
    }

    /// Whether the event fires before the persistence delegate runs.
    pub fn is_before(&self) -> bool {
        matches!(
            self,
            LifecycleEvent::BeforeCreate
                | LifecycleEvent::BeforeUpdate
                | LifecycleEvent::BeforeSave
                | LifecycleEvent::BeforeDelete
        )
    }
}

impl AsRef<str> for LifecycleEvent {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleEvent {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LifecycleEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownHook {
                hook: s.to_string(),
                valid: VALID_HOOKS.join(", "),
            })
    }
}
