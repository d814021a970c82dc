//! Hook declaration
//!
//! This module provides the declarative side of the crate: the lifecycle
//! events, the conditions a hook can be gated on, and the per-model registry
//! of hooked methods.
//!
//! # Architecture
//!
//! - `event.rs`: `LifecycleEvent` and the event name constants
//! - `condition.rs`: `Condition`, the wildcard / literal / predicate value check
//! - `spec.rs`: `HookSpec`, its builder and declaration-time validation
//! - `registry.rs`: `HookRegistry` and the process-wide per-type cache
//! - `error.rs`: `ConfigError`

pub mod condition;
pub mod error;
pub mod event;
pub mod registry;
pub mod spec;

pub use condition::{Condition, ValuePredicate, WILDCARD};
pub use error::ConfigError;
pub use event::{
    AFTER_CREATE, AFTER_DELETE, AFTER_SAVE, AFTER_UPDATE, BEFORE_CREATE, BEFORE_DELETE,
    BEFORE_SAVE, BEFORE_UPDATE, LifecycleEvent, VALID_HOOKS,
};
pub use registry::{HookCallback, HookRegistry, HookedMethod, MethodDecl, registered_hooks};
pub use spec::{FieldSelector, HookBuilder, HookParams, HookSpec, hook, validate_hook_params};
