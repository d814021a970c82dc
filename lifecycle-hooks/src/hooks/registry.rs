//! Hook registry for a model type
//!
//! This module provides the `HookRegistry` that holds the hooked methods a model
//! declares, and the process-wide cache that builds each registry once per
//! model type. The registry handles:
//! - Attaching one or more specs to a named callback, in declaration order
//! - Looking up the methods registered for a lifecycle event
//! - Collecting the `relation.field` paths that snapshots must resolve

use lazy_static::lazy_static;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use super::error::ConfigError;
use super::event::LifecycleEvent;
use super::spec::{HookBuilder, HookSpec};
use crate::model::LifecycleModel;
use crate::state::PATH_SEPARATOR;

/// Callback run when a hook fires.
pub type HookCallback<M> =
    Arc<dyn Fn(&mut M) -> Result<(), <M as LifecycleModel>::Error> + Send + Sync>;

/// A named callback together with the specs it was declared with.
pub struct HookedMethod<M: LifecycleModel> {
    name: String,
    specs: Vec<HookSpec>,
    callback: HookCallback<M>,
}

impl<M: LifecycleModel> HookedMethod<M> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Specs in declaration order.
    pub fn specs(&self) -> &[HookSpec] {
        &self.specs
    }

    /// Run the callback directly, without checking any condition.
    pub fn call(&self, model: &mut M) -> Result<(), M::Error> {
        (self.callback)(model)
    }
}

impl<M: LifecycleModel> fmt::Debug for HookedMethod<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookedMethod")
            .field("name", &self.name)
            .field("specs", &self.specs)
            .finish_non_exhaustive()
    }
}

/// Handle returned by [`HookRegistry::method`] for attaching specs.
pub struct MethodDecl<'a, M: LifecycleModel> {
    registry: &'a mut HookRegistry<M>,
    index: usize,
}

impl<'a, M: LifecycleModel> MethodDecl<'a, M> {
    /// Validate and attach a spec. Specs fire in the order they are attached.
    pub fn hook(self, spec: impl Into<HookBuilder>) -> Result<Self, ConfigError> {
        let spec = spec.into().build()?;
        self.registry.methods[self.index].specs.push(spec);
        Ok(self)
    }
}

/// Registry of the hooked methods declared by one model type
///
/// Methods are kept in declaration order, which is also the order in which
/// they fire for an event.
pub struct HookRegistry<M: LifecycleModel> {
    methods: Vec<HookedMethod<M>>,
    watched_related_fields: Vec<String>,
}

impl<M: LifecycleModel> HookRegistry<M> {
    /// Create a new empty hook registry
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
            watched_related_fields: Vec::new(),
        }
    }

    /// Build the registry from the model's own declarations.
    pub fn declare() -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        M::register_hooks(&mut registry)?;
        registry.collect_watched_related_fields();

        debug!(
            model = M::model_name(),
            methods = registry.methods.len(),
            watched = ?registry.watched_related_fields,
            "Hook registry declared"
        );

        Ok(registry)
    }

    /// Register a callback under `name` and start attaching specs to it.
    ///
    /// Declaring the same name again attaches further specs to the first
    /// callback registered under it.
    pub fn method<F>(&mut self, name: impl Into<String>, callback: F) -> MethodDecl<'_, M>
    where
        F: Fn(&mut M) -> Result<(), M::Error> + Send + Sync + 'static,
    {
        let name = name.into();
        let index = match self.methods.iter().position(|m| m.name == name) {
            Some(index) => index,
            None => {
                self.methods.push(HookedMethod {
                    name,
                    specs: Vec::new(),
                    callback: Arc::new(callback),
                });
                self.methods.len() - 1
            }
        };

        MethodDecl {
            registry: self,
            index,
        }
    }

    /// All hooked methods, in declaration order.
    pub fn methods(&self) -> &[HookedMethod<M>] {
        &self.methods
    }

    /// Methods with at least one spec for `event`, in declaration order.
    pub fn methods_for(&self, event: LifecycleEvent) -> impl Iterator<Item = &HookedMethod<M>> {
        self.methods
            .iter()
            .filter(move |method| method.specs.iter().any(|spec| spec.event == event))
    }

    pub fn get(&self, name: &str) -> Option<&HookedMethod<M>> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// `relation.field` paths referenced by any spec.
    pub fn watched_related_fields(&self) -> &[String] {
        &self.watched_related_fields
    }

    /// Relation names behind [`watched_related_fields`](Self::watched_related_fields).
    pub fn watched_relations(&self) -> Vec<&str> {
        let mut relations: Vec<&str> = Vec::new();
        for path in &self.watched_related_fields {
            if let Some((relation, _)) = path.split_once(PATH_SEPARATOR)
                && !relations.contains(&relation)
            {
                relations.push(relation);
            }
        }
        relations
    }

    /// Get the number of hooked methods
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    fn collect_watched_related_fields(&mut self) {
        let mut watched: Vec<String> = Vec::new();
        for path in self
            .methods
            .iter()
            .flat_map(|method| method.specs.iter())
            .flat_map(HookSpec::related_paths)
        {
            if !watched.iter().any(|w| w == path) {
                watched.push(path.to_string());
            }
        }
        self.watched_related_fields = watched;
    }
}

impl<M: LifecycleModel> Default for HookRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: LifecycleModel> fmt::Debug for HookRegistry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("model", &M::model_name())
            .field("methods", &self.methods)
            .field("watched_related_fields", &self.watched_related_fields)
            .finish()
    }
}

type CachedRegistry = Arc<dyn Any + Send + Sync>;

lazy_static! {
    static ref REGISTRIES: RwLock<HashMap<TypeId, CachedRegistry>> = RwLock::new(HashMap::new());
}

/// The cached registry for `M`, declaring it on first use.
///
/// Declaration runs outside the lock. If two threads race on first use, both
/// declare and the first insert wins, so every caller sees the same registry.
/// A failed declaration is not cached.
pub fn registered_hooks<M: LifecycleModel>() -> Result<Arc<HookRegistry<M>>, ConfigError> {
    let key = TypeId::of::<M>();

    let cached = REGISTRIES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();
    if let Some(cached) = cached {
        return downcast(cached);
    }

    let declared: CachedRegistry = Arc::new(HookRegistry::<M>::declare()?);
    let cached = REGISTRIES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert(declared)
        .clone();

    downcast(cached)
}

fn downcast<M: LifecycleModel>(cached: CachedRegistry) -> Result<Arc<HookRegistry<M>>, ConfigError> {
    cached
        .downcast::<HookRegistry<M>>()
        .map_err(|_| ConfigError::Declaration {
            model: M::model_name().to_string(),
            message: "cached registry has an unexpected type".to_string(),
        })
}
