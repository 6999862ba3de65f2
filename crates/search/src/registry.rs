//! Plugin registry
//!
//! Index strategies and result post-processors are looked up by name. The
//! four built-in strategies are always present; applications add their own
//! through [`PluginsBuilder`] before constructing the engine.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use quarry_core::{Error, IndexKind, Result};
use tracing::debug;

use crate::result::ResultProcessor;
use crate::strategy::{
    IndexStrategy, NumberStrategy, PhoneticStrategy, SortStrategy, TextStrategy,
};

/// Named strategies and post-processors available to an engine
#[derive(Clone)]
pub struct Plugins {
    strategies: HashMap<String, Arc<dyn IndexStrategy>>,
    processors: HashMap<String, Arc<dyn ResultProcessor>>,
}

impl Plugins {
    /// Registry holding only the built-in strategies
    pub fn builtin() -> Self {
        Self::builder().build()
    }

    /// Builder seeded with the built-in strategies
    pub fn builder() -> PluginsBuilder {
        PluginsBuilder {
            plugins: Plugins {
                strategies: HashMap::new(),
                processors: HashMap::new(),
            },
        }
        .strategy(TextStrategy)
        .strategy(PhoneticStrategy)
        .strategy(NumberStrategy)
        .strategy(SortStrategy)
    }

    /// Strategy for `kind`
    ///
    /// # Errors
    ///
    /// `InvalidIndexKind` when no strategy is registered under that name.
    pub fn strategy(&self, kind: &IndexKind) -> Result<Arc<dyn IndexStrategy>> {
        self.strategies
            .get(&strategy_key(kind.as_str()))
            .cloned()
            .ok_or_else(|| Error::InvalidIndexKind(kind.as_str().to_string()))
    }

    /// Post-processor registered as `name`
    ///
    /// # Errors
    ///
    /// `UnknownProcessor` when nothing is registered under that name.
    pub fn processor(&self, name: &str) -> Result<Arc<dyn ResultProcessor>> {
        self.processors
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownProcessor(name.to_string()))
    }

    /// Whether a strategy named `name` exists
    pub fn has_strategy(&self, name: &str) -> bool {
        self.strategies.contains_key(&strategy_key(name))
    }

    /// Registered strategy names, sorted
    pub fn strategy_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered post-processor names, sorted
    pub fn processor_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.processors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for Plugins {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for Plugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugins")
            .field("strategies", &self.strategy_names())
            .field("processors", &self.processor_names())
            .finish()
    }
}

/// Strategy names are case-insensitive, as `IndexKind` parses them
fn strategy_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Builder for [`Plugins`]
pub struct PluginsBuilder {
    plugins: Plugins,
}

impl PluginsBuilder {
    /// Register a strategy under its name, replacing any previous one
    ///
    /// Names are case-insensitive.
    pub fn strategy(mut self, strategy: impl IndexStrategy + 'static) -> Self {
        let name = strategy_key(strategy.name());
        if self
            .plugins
            .strategies
            .insert(name.clone(), Arc::new(strategy))
            .is_some()
        {
            debug!(strategy = %name, "replaced index strategy");
        }
        self
    }

    /// Register a post-processor under its name, replacing any previous one
    pub fn processor(mut self, processor: impl ResultProcessor + 'static) -> Self {
        let name = processor.name().to_string();
        if self
            .plugins
            .processors
            .insert(name.clone(), Arc::new(processor))
            .is_some()
        {
            debug!(processor = %name, "replaced result processor");
        }
        self
    }

    /// Finish the registry
    pub fn build(self) -> Plugins {
        self.plugins
    }
}
