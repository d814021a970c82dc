//! Event dispatch around save and delete.
//!
//! A hooked save runs, in order:
//!
//! - create: `before_create`, `before_save`, persist, `after_save`, `after_create`
//! - update: `before_update`, `before_save`, persist, `after_save`, `after_update`
//!
//! and then replaces the instance's snapshot. A delete runs `before_delete`,
//! remove, `after_delete`. An error from a hook stops the sequence where it is
//! raised: a failing before-hook means the delegate never runs, a failing
//! after-hook is reported after the delegate has already committed.

use lazy_static::lazy_static;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

use crate::LifecycleError;
use crate::config::DispatchConfig;
use crate::evaluator;
use crate::hooks::{FieldSelector, HookRegistry, HookedMethod, LifecycleEvent, registered_hooks};
use crate::model::LifecycleModel;
use crate::state;

lazy_static! {
    static ref SETTINGS: RwLock<DispatchConfig> = RwLock::new(DispatchConfig::default());
}

/// Install process-wide dispatch settings.
pub fn configure(settings: DispatchConfig) {
    *SETTINGS.write().unwrap_or_else(PoisonError::into_inner) = settings;
}

/// The dispatch settings currently in effect.
pub fn settings() -> DispatchConfig {
    SETTINGS.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Options for a single save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Persist without running any hook and without refreshing the snapshot.
    pub skip_hooks: bool,
}

impl SaveOptions {
    pub fn skip_hooks() -> Self {
        Self { skip_hooks: true }
    }
}

/// Record of one hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredHook {
    pub event: LifecycleEvent,
    pub method: String,
    /// The watched field that matched, if the spec watches fields.
    pub field: Option<String>,
}

/// Run every hook registered for `event` whose conditions hold.
///
/// `event` selects the methods; once selected, every spec of a method is
/// evaluated, including specs declared for other events. Methods run in
/// declaration order and, within a method, specs run in declaration order. A
/// spec without fields fires once, a `when` spec fires once if its field
/// matches, and a `when_any` spec fires once per matching field.
pub fn run_hooked_methods<M: LifecycleModel>(
    model: &mut M,
    registry: &HookRegistry<M>,
    event: LifecycleEvent,
) -> Result<Vec<FiredHook>, M::Error> {
    let mut fired = Vec::new();

    for method in registry.methods_for(event) {
        for spec in method.specs() {
            match &spec.selector {
                FieldSelector::All => fire(model, method, event, None, &mut fired)?,
                FieldSelector::Field(field) => {
                    if evaluator::matches(model, field, spec) {
                        fire(model, method, event, Some(field.as_str()), &mut fired)?;
                    }
                }
                FieldSelector::AnyOf(fields) => {
                    for field in fields {
                        if evaluator::matches(model, field, spec) {
                            fire(model, method, event, Some(field.as_str()), &mut fired)?;
                        }
                    }
                }
            }
        }
    }

    Ok(fired)
}

fn fire<M: LifecycleModel>(
    model: &mut M,
    method: &HookedMethod<M>,
    event: LifecycleEvent,
    field: Option<&str>,
    fired: &mut Vec<FiredHook>,
) -> Result<(), M::Error> {
    debug!(
        model = M::model_name(),
        hook = %event,
        method = method.name(),
        field,
        "Firing hook"
    );

    method.call(model).inspect_err(|_| {
        if event.is_before() {
            debug!(
                model = M::model_name(),
                hook = %event,
                method = method.name(),
                "Hook failed, storage left untouched"
            );
        } else {
            debug!(
                model = M::model_name(),
                hook = %event,
                method = method.name(),
                "Hook failed after storage committed"
            );
        }
    })?;
    fired.push(FiredHook {
        event,
        method: method.name().to_string(),
        field: field.map(str::to_string),
    });
    Ok(())
}

/// Save `model`, running its hooks unless told not to.
pub fn save<M: LifecycleModel>(
    model: &mut M,
    options: SaveOptions,
) -> Result<Vec<FiredHook>, M::Error> {
    let settings = settings();

    if options.skip_hooks || !settings.enabled {
        debug!(model = M::model_name(), "Saving without hooks");
        model.persist()?;
        return Ok(Vec::new());
    }

    let registry = registered_hooks::<M>().map_err(LifecycleError::from)?;

    if settings.clear_related_cache {
        for relation in registry.watched_relations() {
            model.clear_cached_relation(relation);
        }
    }

    let (before, after) = if model.is_adding() {
        (LifecycleEvent::BeforeCreate, LifecycleEvent::AfterCreate)
    } else {
        (LifecycleEvent::BeforeUpdate, LifecycleEvent::AfterUpdate)
    };

    let mut fired = run_hooked_methods(model, &registry, before)?;
    fired.extend(run_hooked_methods(model, &registry, LifecycleEvent::BeforeSave)?);

    model.persist()?;

    fired.extend(run_hooked_methods(model, &registry, LifecycleEvent::AfterSave)?);
    fired.extend(run_hooked_methods(model, &registry, after)?);

    let snapshot = state::snapshot(model, registry.watched_related_fields());
    model.lifecycle_state_mut().replace(snapshot);

    Ok(fired)
}

/// Delete `model`, running its delete hooks.
pub fn delete<M: LifecycleModel>(model: &mut M) -> Result<Vec<FiredHook>, M::Error> {
    if !settings().enabled {
        debug!(model = M::model_name(), "Deleting without hooks");
        model.remove()?;
        return Ok(Vec::new());
    }

    let registry = registered_hooks::<M>().map_err(LifecycleError::from)?;

    let mut fired = run_hooked_methods(model, &registry, LifecycleEvent::BeforeDelete)?;
    model.remove()?;
    fired.extend(run_hooked_methods(model, &registry, LifecycleEvent::AfterDelete)?);

    Ok(fired)
}
