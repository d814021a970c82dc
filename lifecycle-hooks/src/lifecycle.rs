//! Caller-facing lifecycle operations, available on every [`LifecycleModel`].

use serde_json::Value;
use tracing::warn;

use crate::LifecycleError;
use crate::dispatcher::{self, FiredHook, SaveOptions};
use crate::hooks::registered_hooks;
use crate::model::LifecycleModel;
use crate::state::{self, Diff, FieldState, Snapshot};

/// Lifecycle operations on a model.
///
/// Implemented for every [`LifecycleModel`]; not meant to be implemented by
/// hand.
pub trait Lifecycle: LifecycleModel {
    /// Declare the model's hooks if needed and record the current state as the
    /// initial snapshot.
    ///
    /// Call this when an instance is constructed or loaded. An instance that was
    /// never tracked reports no changes until its first hooked save.
    fn track(&mut self) -> Result<(), LifecycleError> {
        let registry = registered_hooks::<Self>()?;
        let snapshot = state::snapshot(self, registry.watched_related_fields());
        self.lifecycle_state_mut().replace(snapshot);
        Ok(())
    }

    /// [`track`](Lifecycle::track), by value.
    fn tracked(mut self) -> Result<Self, LifecycleError> {
        self.track()?;
        Ok(self)
    }

    /// The live attribute state plus every watched `relation.field` path.
    fn snapshot(&self) -> Snapshot {
        match registered_hooks::<Self>() {
            Ok(registry) => state::snapshot(self, registry.watched_related_fields()),
            Err(err) => {
                warn!(
                    model = Self::model_name(),
                    error = %err,
                    "hooks could not be declared; snapshot has no related fields"
                );
                state::snapshot(self, &[])
            }
        }
    }

    /// Fields changed since the initial snapshot.
    fn diff(&self) -> Diff {
        match self.lifecycle_state().initial() {
            Some(initial) => Diff::between(initial, &self.snapshot()),
            None => Diff::default(),
        }
    }

    /// Value of `field` recorded in the initial snapshot, `null` if none.
    fn initial_value(&self, field: &str) -> Value {
        let field = state::sanitize_field_name::<Self>(field);
        self.lifecycle_state()
            .initial()
            .and_then(|snapshot| snapshot.get(field.as_ref()))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Live value of `field` or a `relation.field` path.
    fn current_value(&self, field: &str) -> Value {
        state::current_value(self, field)
    }

    /// Whether `field` differs from its value in the initial snapshot.
    fn has_changed(&self, field: &str) -> bool {
        FieldState::read(self, field).changed
    }

    /// Save with hooks.
    fn save(&mut self) -> Result<Vec<FiredHook>, Self::Error> {
        dispatcher::save(self, SaveOptions::default())
    }

    fn save_with(&mut self, options: SaveOptions) -> Result<Vec<FiredHook>, Self::Error> {
        dispatcher::save(self, options)
    }

    /// Delete with hooks.
    fn delete(&mut self) -> Result<Vec<FiredHook>, Self::Error> {
        dispatcher::delete(self)
    }
}

impl<M: LifecycleModel> Lifecycle for M {}
