//! Named cache key generators.

use outcache_core::{CacheKeyGenerator, DefaultKeyGenerator, OutcacheError, OutcacheResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Key generators a route may select by name.
///
/// Routes that name no generator use [`DefaultKeyGenerator`].
#[derive(Debug, Clone)]
pub struct KeyGeneratorRegistry {
    default: Arc<dyn CacheKeyGenerator>,
    generators: HashMap<String, Arc<dyn CacheKeyGenerator>>,
}

impl Default for KeyGeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyGeneratorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            default: Arc::new(DefaultKeyGenerator),
            generators: HashMap::new(),
        }
    }

    /// Registers a generator under `name`, replacing any previous one.
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, generator: Arc<dyn CacheKeyGenerator>) -> Self {
        self.generators.insert(name.into(), generator);
        self
    }

    /// Replaces the generator used by routes that name none.
    #[must_use]
    pub fn with_default(mut self, generator: Arc<dyn CacheKeyGenerator>) -> Self {
        self.default = generator;
        self
    }

    /// Resolves a route's generator selection.
    pub fn resolve(&self, name: Option<&str>) -> OutcacheResult<Arc<dyn CacheKeyGenerator>> {
        match name {
            None => Ok(Arc::clone(&self.default)),
            Some(name) => self.generators.get(name).cloned().ok_or_else(|| {
                OutcacheError::configuration(format!("Unknown cache key generator '{}'", name))
            }),
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }
}
