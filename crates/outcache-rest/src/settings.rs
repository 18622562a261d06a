//! Settings shared by every cached route.

use crate::anonymity::{AnonymityPredicate, AuthorizationHeaderPredicate};
use outcache_config::CacheConfig;
use std::sync::Arc;

/// Largest captured body when no configuration is given.
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Media negotiation, capture limits and caller classification.
#[derive(Clone)]
pub struct CacheSettings {
    default_media_type: String,
    supported_media_types: Vec<String>,
    max_body_bytes: usize,
    anonymity: Arc<dyn AnonymityPredicate>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl CacheSettings {
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            default_media_type: config.default_media_type.clone(),
            supported_media_types: config.supported_media_types.clone(),
            max_body_bytes: config.max_body_bytes,
            anonymity: Arc::new(AuthorizationHeaderPredicate),
        }
    }

    /// Replaces the predicate used for `anonymous_only` routes.
    #[must_use]
    pub fn with_anonymity_predicate(mut self, predicate: Arc<dyn AnonymityPredicate>) -> Self {
        self.anonymity = predicate;
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    #[must_use]
    pub fn default_media_type(&self) -> &str {
        &self.default_media_type
    }

    #[must_use]
    pub fn supported_media_types(&self) -> &[String] {
        &self.supported_media_types
    }

    #[must_use]
    pub const fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    #[must_use]
    pub fn anonymity(&self) -> &dyn AnonymityPredicate {
        self.anonymity.as_ref()
    }
}

impl std::fmt::Debug for CacheSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSettings")
            .field("default_media_type", &self.default_media_type)
            .field("supported_media_types", &self.supported_media_types)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}
