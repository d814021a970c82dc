//! The boundary between hooks and the host persistence layer.
//!
//! A model implements [`LifecycleModel`] to describe how its state is read,
//! how it is written and removed, and which hooks it declares. Everything else
//! (snapshots, condition checks, event dispatch) comes from the blanket
//! [`Lifecycle`](crate::Lifecycle) implementation.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::LifecycleError;
use crate::hooks::{ConfigError, HookRegistry};
use crate::state::Snapshot;

/// Field metadata reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldKind {
    /// A field stored under its own name.
    #[default]
    Plain,
    /// A relation stored as an identifier under `attname`.
    ForeignKey {
        /// Name of the attribute holding the related identifier.
        attname: String,
    },
}

impl FieldKind {
    /// A foreign key stored under `<field>_id`.
    pub fn foreign_key(field: &str) -> Self {
        FieldKind::ForeignKey {
            attname: format!("{}_id", field),
        }
    }
}

/// Why a related entity could not be read.
///
/// These never reach callers: a failed read resolves to `null`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The model has no relation with this name.
    #[error("unknown relation '{0}'")]
    UnknownRelation(String),

    /// The relation points at an entity that no longer exists.
    #[error("related '{0}' does not exist")]
    DoesNotExist(String),

    /// Host specific failure.
    #[error("{0}")]
    Other(String),
}

/// Per-instance bookkeeping kept next to a model's own fields.
///
/// Store it in a `#[serde(skip)]` field so it never shows up in the model's
/// attribute state.
#[derive(Debug, Clone, Default)]
pub struct LifecycleState {
    initial: Option<Snapshot>,
}

impl LifecycleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot taken at load or after the last save, if any.
    pub fn initial(&self) -> Option<&Snapshot> {
        self.initial.as_ref()
    }

    pub fn is_tracked(&self) -> bool {
        self.initial.is_some()
    }

    pub(crate) fn replace(&mut self, snapshot: Snapshot) {
        self.initial = Some(snapshot);
    }
}

/// A persisted model that can carry lifecycle hooks.
///
/// # Example
///
/// ```
/// use lifecycle_hooks::prelude::*;
/// use serde::Serialize;
/// use serde_json::Value;
///
/// #[derive(Serialize)]
/// struct Account {
///     id: Option<i64>,
///     email: Option<String>,
///     #[serde(skip)]
///     lifecycle: LifecycleState,
/// }
///
/// impl Account {
///     fn lowercase_email(&mut self) -> Result<()> {
///         self.email = self.email.as_ref().map(|e| e.to_lowercase());
///         Ok(())
///     }
/// }
///
/// impl LifecycleModel for Account {
///     type Error = LifecycleError;
///
///     fn lifecycle_state(&self) -> &LifecycleState {
///         &self.lifecycle
///     }
///
///     fn lifecycle_state_mut(&mut self) -> &mut LifecycleState {
///         &mut self.lifecycle
///     }
///
///     fn register_hooks(hooks: &mut HookRegistry<Self>) -> std::result::Result<(), ConfigError> {
///         hooks
///             .method("lowercase_email", Self::lowercase_email)
///             .hook(hook(BEFORE_SAVE).when("email").is_not(Value::Null))?;
///         Ok(())
///     }
///
///     fn is_adding(&self) -> bool {
///         self.id.is_none()
///     }
///
///     fn persist(&mut self) -> Result<()> {
///         self.id.get_or_insert(1);
///         Ok(())
///     }
///
///     fn remove(&mut self) -> Result<()> {
///         Ok(())
///     }
/// }
///
/// let mut account = Account {
///     id: None,
///     email: Some("Foo@Bar.com".into()),
///     lifecycle: LifecycleState::new(),
/// }
/// .tracked()?;
/// account.save()?;
/// assert_eq!(account.email.as_deref(), Some("foo@bar.com"));
/// # Ok::<(), LifecycleError>(())
/// ```
pub trait LifecycleModel: Serialize + Sized + 'static {
    /// Error returned by hook bodies and the persistence delegates.
    type Error: From<LifecycleError> + 'static;

    fn lifecycle_state(&self) -> &LifecycleState;

    fn lifecycle_state_mut(&mut self) -> &mut LifecycleState;

    /// Declare the hooks of this model type.
    ///
    /// Called once per type; the result is cached for the life of the process.
    fn register_hooks(hooks: &mut HookRegistry<Self>) -> Result<(), ConfigError> {
        let _ = hooks;
        Ok(())
    }

    /// Whether the instance has never been persisted.
    fn is_adding(&self) -> bool;

    /// Write the instance to storage (insert or update).
    fn persist(&mut self) -> Result<(), Self::Error>;

    /// Remove the instance from storage.
    fn remove(&mut self) -> Result<(), Self::Error>;

    /// Visible attribute state, keyed by stored attribute name.
    ///
    /// The default serializes the model; fields marked `#[serde(skip)]` are not
    /// part of the state.
    fn attributes(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!(
                    model = Self::model_name(),
                    "model did not serialize to an object; attribute state is empty"
                );
                Map::new()
            }
            Err(err) => {
                warn!(
                    model = Self::model_name(),
                    error = %err,
                    "model could not be serialized; attribute state is empty"
                );
                Map::new()
            }
        }
    }

    /// Metadata for a field, by logical name.
    fn field_kind(field: &str) -> FieldKind {
        let _ = field;
        FieldKind::Plain
    }

    /// The related entity behind `relation`, as a JSON object.
    ///
    /// `Ok(None)` means the relation is unset.
    fn related(&self, relation: &str) -> Result<Option<Value>, ResolveError> {
        Err(ResolveError::UnknownRelation(relation.to_string()))
    }

    /// Drop any cached copy of the entity behind `relation`.
    fn clear_cached_relation(&mut self, relation: &str) {
        let _ = relation;
    }

    fn model_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}
