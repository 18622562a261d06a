//! Route registration.
//!
//! [`OutputCache`] owns the store and the shared settings; a
//! [`ControllerScope`] names the controller every route registered through it
//! belongs to.

use crate::invalidation::{Invalidation, InvalidationTarget, ResolvedTarget};
use crate::key_generator::KeyGeneratorRegistry;
use crate::operation::CacheableOperation;
use crate::policy::OutputCachePolicy;
use crate::settings::CacheSettings;
use outcache_core::{OutcacheError, OutcacheResult, RouteIdentity};
use outcache_store::OutputStore;
use std::sync::Arc;
use tracing::debug;

/// Entry point for configuring cached and invalidating routes.
#[derive(Clone)]
pub struct OutputCache {
    store: Arc<dyn OutputStore>,
    settings: Arc<CacheSettings>,
    registry: Arc<KeyGeneratorRegistry>,
}

impl OutputCache {
    pub fn new(store: Arc<dyn OutputStore>) -> Self {
        Self {
            store,
            settings: Arc::new(CacheSettings::default()),
            registry: Arc::new(KeyGeneratorRegistry::default()),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: CacheSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: KeyGeneratorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn OutputStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Opens a scope for the routes of one controller.
    pub fn controller(&self, name: impl Into<String>) -> OutcacheResult<ControllerScope> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(OutcacheError::invalid_argument("controller identity must not be empty"));
        }
        Ok(ControllerScope {
            controller: name,
            cache: self.clone(),
        })
    }
}

impl std::fmt::Debug for OutputCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputCache")
            .field("backend", &self.store.backend())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Routes of one controller.
#[derive(Debug, Clone)]
pub struct ControllerScope {
    controller: String,
    cache: OutputCache,
}

impl ControllerScope {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.controller
    }

    /// Resolves the state for [`cache_output`](crate::cache_output) on the
    /// route handling `action`.
    ///
    /// Fails when the action is empty, the policy is invalid or the policy
    /// names an unregistered key generator.
    pub fn cache(
        &self,
        action: impl Into<String>,
        policy: impl OutputCachePolicy,
    ) -> OutcacheResult<Arc<CacheableOperation>> {
        let identity = RouteIdentity::new(self.controller.clone(), action)?;
        let (freshness, options) = policy.into_parts()?;
        let key_generator = self.cache.registry.resolve(options.key_generator.as_deref())?;

        debug!(route = %identity, ?freshness, "Registered cached route");
        Ok(Arc::new(CacheableOperation::new(
            identity,
            freshness,
            key_generator,
            options,
            Arc::clone(&self.cache.store),
            Arc::clone(&self.cache.settings),
        )))
    }

    /// Resolves the state for [`invalidate_output`](crate::invalidate_output)
    /// removing every cached variant of `action` in this controller.
    pub fn invalidate(&self, action: impl Into<String>) -> OutcacheResult<Arc<Invalidation>> {
        self.invalidate_targets([InvalidationTarget::action(action)])
    }

    /// Like [`invalidate`](Self::invalidate), for several targets.
    pub fn invalidate_targets(
        &self,
        targets: impl IntoIterator<Item = InvalidationTarget>,
    ) -> OutcacheResult<Arc<Invalidation>> {
        let resolved = targets
            .into_iter()
            .map(|target| self.resolve_target(target))
            .collect::<OutcacheResult<Vec<_>>>()?;

        if resolved.is_empty() {
            return Err(OutcacheError::invalid_argument(
                "invalidation needs at least one target",
            ));
        }

        Ok(Arc::new(Invalidation::new(resolved, Arc::clone(&self.cache.store))))
    }

    fn resolve_target(&self, target: InvalidationTarget) -> OutcacheResult<ResolvedTarget> {
        let controller = target
            .controller
            .unwrap_or_else(|| self.controller.clone());
        let identity = RouteIdentity::new(controller, target.action)?;
        let generator = self
            .cache
            .registry
            .resolve(target.key_generator.as_deref())?;

        Ok(ResolvedTarget {
            base_key: generator.make_base_key(&identity),
            argument_names: target.argument_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{CacheOutputConfig, CacheUntilConfig};
    use outcache_store::LocalOutputStore;

    fn cache() -> OutputCache {
        OutputCache::new(Arc::new(LocalOutputStore::default()))
    }

    #[test]
    fn test_controller_requires_name() {
        assert!(cache().controller(" ").is_err());
        assert_eq!(cache().controller("WidgetsController").unwrap().name(), "WidgetsController");
    }

    #[test]
    fn test_cache_resolves_operation() {
        let scope = cache().controller("WidgetsController").unwrap();
        let operation = scope.cache("GetWidgets", CacheOutputConfig::new(60)).unwrap();
        assert_eq!(operation.base_key(), "widgetscontroller-getwidgets");
        assert!(scope.cache("", CacheOutputConfig::new(60)).is_err());
    }

    #[test]
    fn test_cache_rejects_unknown_generator() {
        let scope = cache().controller("WidgetsController").unwrap();
        let result = scope.cache("GetWidgets", CacheOutputConfig::new(60).key_generator("nope"));
        assert!(matches!(result, Err(OutcacheError::Configuration(_))));
    }

    #[test]
    fn test_cache_rejects_bad_schedule() {
        let scope = cache().controller("WidgetsController").unwrap();
        assert!(scope.cache("GetWidgets", CacheUntilConfig::new("noon")).is_err());
    }

    #[test]
    fn test_invalidation_targets() {
        let scope = cache().controller("WidgetsController").unwrap();
        let invalidation = scope
            .invalidate_targets([
                InvalidationTarget::action("GetWidgets"),
                InvalidationTarget::action("GetWidget").with_arguments(["id"]),
                InvalidationTarget::in_controller("ReportsController", "Summary"),
            ])
            .unwrap();

        let bound = vec![("id".to_string(), "3".to_string())];
        assert_eq!(
            invalidation.group_keys(&bound),
            vec![
                "widgetscontroller-getwidgets".to_string(),
                "widgetscontroller-getwidget-*id=3[&:]*".to_string(),
                "reportscontroller-summary".to_string(),
            ]
        );
    }

    #[test]
    fn test_invalidation_needs_targets() {
        let scope = cache().controller("WidgetsController").unwrap();
        assert!(scope.invalidate_targets(Vec::new()).is_err());
    }
}
