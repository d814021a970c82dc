//! Condition evaluation for a single watched field.
//!
//! A spec fires for a field only when all six checks pass. They run in a fixed
//! order and stop at the first failure; the order only decides which check is
//! reported in trace output.

use tracing::trace;

use crate::hooks::HookSpec;
use crate::model::LifecycleModel;
use crate::state::FieldState;

/// One of the checks applied to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    HasChanged,
    IsNow,
    Was,
    WasNot,
    IsNot,
    ChangesTo,
}

/// Whether `spec` is satisfied by `field` on `model`.
pub fn matches<M: LifecycleModel>(model: &M, field: &str, spec: &HookSpec) -> bool {
    let state = FieldState::read(model, field);

    match failed_check(&state, spec) {
        None => true,
        Some(check) => {
            trace!(
                model = M::model_name(),
                hook = %spec.event,
                field,
                check = ?check,
                "hook condition not met"
            );
            false
        }
    }
}

/// The first check `state` fails, or `None` if every check passes.
pub fn failed_check(state: &FieldState, spec: &HookSpec) -> Option<Check> {
    if !check_has_changed(state, spec) {
        return Some(Check::HasChanged);
    }
    if !check_is_now(state, spec) {
        return Some(Check::IsNow);
    }
    if !check_was(state, spec) {
        return Some(Check::Was);
    }
    if !check_was_not(state, spec) {
        return Some(Check::WasNot);
    }
    if !check_is_not(state, spec) {
        return Some(Check::IsNot);
    }
    if !check_changes_to(state, spec) {
        return Some(Check::ChangesTo);
    }
    None
}

fn check_has_changed(state: &FieldState, spec: &HookSpec) -> bool {
    spec.has_changed.is_none_or(|expected| expected == state.changed)
}

fn check_is_now(state: &FieldState, spec: &HookSpec) -> bool {
    spec.is_now.matches(&state.current)
}

fn check_was(state: &FieldState, spec: &HookSpec) -> bool {
    spec.was.matches(&state.initial)
}

// Exclusions compare literally; a predicate here never excludes.
fn check_was_not(state: &FieldState, spec: &HookSpec) -> bool {
    spec.was_not
        .as_ref()
        .is_none_or(|excluded| !excluded.equals_literal(&state.initial))
}

fn check_is_not(state: &FieldState, spec: &HookSpec) -> bool {
    spec.is_not
        .as_ref()
        .is_none_or(|excluded| !excluded.equals_literal(&state.current))
}

fn check_changes_to(state: &FieldState, spec: &HookSpec) -> bool {
    spec.changes_to.as_ref().is_none_or(|target| {
        !target.matches(&state.initial) && target.matches(&state.current)
    })
}
