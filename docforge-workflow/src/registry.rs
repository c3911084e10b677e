//! Resolution of task keys to content-producing units.
//!
//! Built-in processors are registered as constructors keyed by task. Tasks
//! contributed by external configuration carry a [`ProcessorRef`] (location
//! plus exported symbol) that is resolved through a [`UnitLoader`]; the
//! default loader is a [`ModuleTable`] populated explicitly at startup.
//! Successful resolutions are cached for the lifetime of the registry.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use docforge_core::{Processor, ProcessorError, ProcessorRef, TaskKey};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::TaskCatalog;

/// Constructor for a processor instance.
pub type ProcessorFactory = Arc<dyn Fn() -> anyhow::Result<Arc<dyn Processor>> + Send + Sync>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadFailure {
    #[error("unit '{0}' is not registered")]
    UnknownLocation(String),

    #[error("unit '{location}' does not export '{symbol}'")]
    MissingSymbol { location: String, symbol: String },
}

/// Locates the constructor an external [`ProcessorRef`] points at.
pub trait UnitLoader: Send + Sync {
    fn load(&self, reference: &ProcessorRef) -> Result<ProcessorFactory, LoadFailure>;
}

/// Explicit registration table standing in for runtime module loading:
/// each location is a named module exporting constructors by symbol.
#[derive(Default, Clone)]
pub struct ModuleTable {
    modules: HashMap<String, HashMap<String, ProcessorFactory>>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_module(&mut self, location: impl Into<String>) -> &mut Self {
        self.modules.entry(location.into()).or_default();
        self
    }

    pub fn export<F>(
        &mut self,
        location: impl Into<String>,
        symbol: impl Into<String>,
        factory: F,
    ) -> &mut Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn Processor>> + Send + Sync + 'static,
    {
        self.modules
            .entry(location.into())
            .or_default()
            .insert(symbol.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, reference: &ProcessorRef) -> bool {
        self.modules
            .get(&reference.location)
            .is_some_and(|exports| exports.contains_key(&reference.symbol))
    }
}

impl fmt::Debug for ModuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modules: Vec<_> = self
            .modules
            .iter()
            .map(|(location, exports)| (location, exports.keys().collect::<Vec<_>>()))
            .collect();
        modules.sort();
        f.debug_struct("ModuleTable").field("modules", &modules).finish()
    }
}

impl UnitLoader for ModuleTable {
    fn load(&self, reference: &ProcessorRef) -> Result<ProcessorFactory, LoadFailure> {
        let exports = self
            .modules
            .get(&reference.location)
            .ok_or_else(|| LoadFailure::UnknownLocation(reference.location.clone()))?;

        exports
            .get(&reference.symbol)
            .cloned()
            .ok_or_else(|| LoadFailure::MissingSymbol {
                location: reference.location.clone(),
                symbol: reference.symbol.clone(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingSource {
    Builtin,
    External(ProcessorRef),
}

/// A resolved, ready-to-invoke processor for one task key.
#[derive(Clone)]
pub struct ProcessorBinding {
    pub key: TaskKey,
    pub source: BindingSource,
    pub processor: Arc<dyn Processor>,
}

impl ProcessorBinding {
    /// Whether both bindings share the same processor instance.
    pub fn same_processor(&self, other: &ProcessorBinding) -> bool {
        Arc::ptr_eq(&self.processor, &other.processor)
    }
}

impl fmt::Debug for ProcessorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorBinding")
            .field("key", &self.key)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

pub struct ProcessorRegistry {
    builtin: HashMap<TaskKey, ProcessorFactory>,
    external: HashMap<TaskKey, ProcessorRef>,
    loader: Arc<dyn UnitLoader>,
    cache: DashMap<TaskKey, ProcessorBinding>,
}

impl ProcessorRegistry {
    pub fn new(loader: Arc<dyn UnitLoader>) -> Self {
        Self {
            builtin: HashMap::new(),
            external: HashMap::new(),
            loader,
            cache: DashMap::new(),
        }
    }

    /// Registry with a processor for every built-in document type.
    pub fn with_builtin_processors(loader: Arc<dyn UnitLoader>) -> Self {
        let mut registry = Self::new(loader);
        crate::tasks::register_builtin_processors(&mut registry);
        registry
    }

    pub fn register_builtin<F>(&mut self, key: impl Into<TaskKey>, factory: F) -> &mut Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn Processor>> + Send + Sync + 'static,
    {
        let key = key.into();
        self.cache.remove(&key);
        self.builtin.insert(key, Arc::new(factory));
        self
    }

    /// Registers an existing instance; every resolution shares it.
    pub fn register_builtin_processor(
        &mut self,
        key: impl Into<TaskKey>,
        processor: Arc<dyn Processor>,
    ) -> &mut Self {
        self.register_builtin(key, move || Ok(processor.clone()))
    }

    /// Records the processor references of every externally configured task.
    pub fn configure_external(&mut self, catalog: &TaskCatalog) -> &mut Self {
        for task in catalog.tasks() {
            if let Some(reference) = &task.processor {
                self.external.insert(task.key.clone(), reference.clone());
            }
        }
        info!(external = self.external.len(), "Configured external processor bindings");
        self
    }

    pub fn has_binding(&self, key: &TaskKey) -> bool {
        self.builtin.contains_key(key) || self.external.contains_key(key)
    }

    pub fn is_cached(&self, key: &TaskKey) -> bool {
        self.cache.contains_key(key)
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Resolves `key` to a processor, consulting the cache, then the
    /// built-in constructors, then the external configuration.
    pub fn resolve(&self, key: &TaskKey) -> Result<ProcessorBinding, ProcessorError> {
        if let Some(binding) = self.cache.get(key) {
            debug!(%key, "Processor cache hit");
            return Ok(binding.clone());
        }

        let binding = self.load_binding(key)?;

        // Concurrent first resolutions may both load; the first insert wins.
        let binding = match self.cache.entry(key.clone()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => slot.insert(binding).clone(),
        };
        Ok(binding)
    }

    fn load_binding(&self, key: &TaskKey) -> Result<ProcessorBinding, ProcessorError> {
        if let Some(factory) = self.builtin.get(key) {
            let processor = instantiate(key, factory)?;
            debug!(%key, "Resolved built-in processor");
            return Ok(ProcessorBinding {
                key: key.clone(),
                source: BindingSource::Builtin,
                processor,
            });
        }

        let reference = self
            .external
            .get(key)
            .ok_or_else(|| ProcessorError::NotFound(key.clone()))?;

        let factory = self
            .loader
            .load(reference)
            .map_err(|failure| ProcessorError::Load {
                key: key.clone(),
                location: reference.location.clone(),
                symbol: reference.symbol.clone(),
                reason: failure.to_string(),
            })?;

        let processor = instantiate(key, &factory)?;
        debug!(%key, %reference, "Resolved external processor");
        Ok(ProcessorBinding {
            key: key.clone(),
            source: BindingSource::External(reference.clone()),
            processor,
        })
    }
}

fn instantiate(key: &TaskKey, factory: &ProcessorFactory) -> Result<Arc<dyn Processor>, ProcessorError> {
    factory().map_err(|err| ProcessorError::Instantiation {
        key: key.clone(),
        reason: format!("{:#}", err),
    })
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("builtin", &self.builtin.len())
            .field("external", &self.external)
            .field("cached", &self.cache.len())
            .finish()
    }
}
