//! # Lifecycle Hooks
//!
//! Declarative lifecycle hooks for persisted models: run a method before or
//! after a model is created, updated, saved or deleted, optionally gated on how
//! a field's value changed since the instance was loaded.
//!
//! ## Quick Start
//!
//! ```rust
//! use lifecycle_hooks::prelude::*;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Order {
//!     id: Option<u64>,
//!     status: String,
//!     #[serde(skip)]
//!     lifecycle: LifecycleState,
//!     #[serde(skip)]
//!     notified: u32,
//! }
//!
//! impl LifecycleModel for Order {
//!     type Error = LifecycleError;
//!
//!     fn lifecycle_state(&self) -> &LifecycleState {
//!         &self.lifecycle
//!     }
//!
//!     fn lifecycle_state_mut(&mut self) -> &mut LifecycleState {
//!         &mut self.lifecycle
//!     }
//!
//!     fn register_hooks(hooks: &mut HookRegistry<Self>) -> std::result::Result<(), ConfigError> {
//!         hooks
//!             .method("notify_shipped", |order: &mut Order| {
//!                 order.notified += 1;
//!                 Ok(())
//!             })
//!             .hook(hook(AFTER_UPDATE).when("status").was("paid").is_now("shipped"))?;
//!         Ok(())
//!     }
//!
//!     fn is_adding(&self) -> bool {
//!         self.id.is_none()
//!     }
//!
//!     fn persist(&mut self) -> Result<()> {
//!         self.id.get_or_insert(7);
//!         Ok(())
//!     }
//!
//!     fn remove(&mut self) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let mut order = Order {
//!     id: Some(7),
//!     status: "paid".into(),
//!     lifecycle: LifecycleState::new(),
//!     notified: 0,
//! }
//! .tracked()?;
//!
//! order.status = "shipped".into();
//! let fired = order.save()?;
//! assert_eq!(order.notified, 1);
//! assert_eq!(fired[0].method, "notify_shipped");
//! # Ok::<(), LifecycleError>(())
//! ```
//!
//! ## Architecture
//!
//! - **hooks**: events, conditions, hook specs and the per-model registry
//! - **state**: snapshots of a model's attributes and the diff against them
//! - **evaluator**: decides whether a spec's conditions hold for one field
//! - **dispatcher**: runs the hooks of each event around `persist` and `remove`
//! - **config** / **logging**: process settings and tracing setup

pub mod config;
pub mod dispatcher;
pub mod evaluator;
pub mod hooks;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod state;

pub use lifecycle::Lifecycle;

/// The prelude re-exports commonly used types for convenience
pub mod prelude {
    // Hook declaration
    pub use crate::hooks::{
        AFTER_CREATE, AFTER_DELETE, AFTER_SAVE, AFTER_UPDATE, BEFORE_CREATE, BEFORE_DELETE,
        BEFORE_SAVE, BEFORE_UPDATE, Condition, ConfigError, FieldSelector, HookBuilder,
        HookParams, HookRegistry, HookSpec, LifecycleEvent, WILDCARD, hook,
    };

    // Model integration
    pub use crate::lifecycle::Lifecycle;
    pub use crate::model::{FieldKind, LifecycleModel, LifecycleState, ResolveError};

    // Dispatch
    pub use crate::dispatcher::{FiredHook, SaveOptions};
    pub use crate::state::{Diff, Snapshot};

    // Config types
    pub use crate::config::{ConfigBuilder, ConfigLoader, DispatchConfig, LifecycleConfig};

    // Core initialization functions
    pub use crate::{init, init_with_defaults};

    // Essential result type
    pub use crate::{LifecycleError, Result};
}

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error type for lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// A hook declaration was rejected
    #[error("Hook configuration error: {0}")]
    Config(#[from] hooks::ConfigError),

    /// Settings could not be loaded or validated
    #[error("Settings error: {0}")]
    Settings(#[from] config::SettingsError),

    /// Logging could not be set up
    #[error("Logging error: {0}")]
    Logging(#[from] logging::LogError),

    /// Any other error, typically raised by a hook body or persistence delegate
    #[error("{0}")]
    Other(String),
}

impl From<String> for LifecycleError {
    fn from(message: String) -> Self {
        LifecycleError::Other(message)
    }
}

impl From<&str> for LifecycleError {
    fn from(message: &str) -> Self {
        LifecycleError::Other(message.to_string())
    }
}

/// Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;

lazy_static::lazy_static! {
    // Flushes the file writer installed by `init` when dropped.
    static ref LOG_GUARD: std::sync::Mutex<Option<tracing_appender::non_blocking::WorkerGuard>> =
        std::sync::Mutex::new(None);
}

/// Apply process-wide settings: install the tracing subscriber and the
/// dispatch settings.
///
/// A subscriber that is already installed is left in place.
pub fn init(config: &config::LifecycleConfig) -> Result<()> {
    config::validate_config(config)?;

    if let Some(guard) = logging::init(&config.logging)? {
        *LOG_GUARD
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(guard);
    }

    dispatcher::configure(config.dispatch.clone());
    tracing::debug!(
        version = VERSION,
        enabled = config.dispatch.enabled,
        clear_related_cache = config.dispatch.clear_related_cache,
        "Lifecycle hooks initialized"
    );

    Ok(())
}

/// Load settings from the default files and the environment, then [`init`].
pub fn init_with_defaults() -> Result<config::LifecycleConfig> {
    let config = config::ConfigLoader::new()
        .load_default_files()
        .load_env()
        .extract()?;
    init(&config)?;
    Ok(config)
}
