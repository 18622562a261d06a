//! A cacheable route, fully resolved.

use crate::context::SkipOutputCache;
use crate::headers::CacheDirectives;
use crate::negotiation::negotiate_media_type;
use crate::policy::CacheOptions;
use crate::settings::CacheSettings;
use axum::{
    body::Body,
    http::{HeaderMap, Method, Request},
};
use chrono::{DateTime, Utc};
use outcache_core::{
    ArgumentValue, CacheKeyGenerator, FreshnessPolicy, FreshnessWindow, KeyRequest, RouteIdentity,
};
use outcache_store::OutputStore;
use std::sync::Arc;

/// Everything the interceptor needs to cache one route.
///
/// Built by [`ControllerScope::cache`](crate::ControllerScope::cache) and
/// shared as middleware state.
#[derive(Clone)]
pub struct CacheableOperation {
    identity: RouteIdentity,
    freshness: Arc<dyn FreshnessPolicy>,
    key_generator: Arc<dyn CacheKeyGenerator>,
    options: CacheOptions,
    store: Arc<dyn OutputStore>,
    settings: Arc<CacheSettings>,
}

impl CacheableOperation {
    pub fn new(
        identity: RouteIdentity,
        freshness: Arc<dyn FreshnessPolicy>,
        key_generator: Arc<dyn CacheKeyGenerator>,
        options: CacheOptions,
        store: Arc<dyn OutputStore>,
        settings: Arc<CacheSettings>,
    ) -> Self {
        Self {
            identity,
            freshness,
            key_generator,
            options,
            store,
            settings,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &RouteIdentity {
        &self.identity
    }

    #[must_use]
    pub fn store(&self) -> &dyn OutputStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    #[must_use]
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    #[must_use]
    pub fn directives(&self) -> &CacheDirectives {
        &self.options.directives
    }

    #[must_use]
    pub fn freshness_policy(&self) -> &dyn FreshnessPolicy {
        self.freshness.as_ref()
    }

    /// Group key shared by every variant of this route.
    #[must_use]
    pub fn base_key(&self) -> String {
        self.key_generator.make_base_key(&self.identity)
    }

    /// Checks if a request may be served from or written to the cache.
    #[must_use]
    pub fn allowed(&self, request: &Request<Body>) -> bool {
        if request.method() != Method::GET {
            return false;
        }
        if request.extensions().get::<SkipOutputCache>().is_some() {
            return false;
        }
        !self.options.anonymous_only || self.settings.anonymity().is_anonymous(request)
    }

    #[must_use]
    pub fn freshness(&self, now: DateTime<Utc>) -> FreshnessWindow {
        self.freshness.evaluate(now)
    }

    /// Media type the request's variant is keyed under.
    #[must_use]
    pub fn media_type(&self, headers: &HeaderMap) -> String {
        match &self.options.media_type {
            Some(media_type) => media_type.clone(),
            None => negotiate_media_type(
                headers,
                self.settings.supported_media_types(),
                self.settings.default_media_type(),
            ),
        }
    }

    #[must_use]
    pub fn cache_key(
        &self,
        arguments: &[(String, ArgumentValue)],
        query: &[(String, String)],
        media_type: &str,
    ) -> String {
        self.key_generator.make_cache_key(&KeyRequest {
            identity: &self.identity,
            arguments,
            query,
            media_type,
            exclude_query_string: self.options.exclude_query_string,
        })
    }
}

impl std::fmt::Debug for CacheableOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheableOperation")
            .field("identity", &self.identity)
            .field("freshness", &self.freshness)
            .field("key_generator", &self.key_generator)
            .field("options", &self.options)
            .field("backend", &self.store.backend())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{ACCEPT, AUTHORIZATION};
    use outcache_core::{DefaultKeyGenerator, FixedDuration};
    use outcache_store::LocalOutputStore;

    fn operation(options: CacheOptions) -> CacheableOperation {
        CacheableOperation::new(
            RouteIdentity::new("WidgetsController", "GetWidget").unwrap(),
            Arc::new(FixedDuration::new(60, None, None)),
            Arc::new(DefaultKeyGenerator),
            options,
            Arc::new(LocalOutputStore::default()),
            Arc::new(CacheSettings::default()),
        )
    }

    fn get() -> Request<Body> {
        Request::builder().uri("/widgets/1").body(Body::empty()).unwrap()
    }

    #[test]
    fn test_only_get_is_allowed() {
        let operation = operation(CacheOptions::default());
        assert!(operation.allowed(&get()));

        let post = Request::builder()
            .method(Method::POST)
            .body(Body::empty())
            .unwrap();
        assert!(!operation.allowed(&post));
    }

    #[test]
    fn test_skip_marker_disallows() {
        let operation = operation(CacheOptions::default());
        let mut request = get();
        request.extensions_mut().insert(SkipOutputCache);
        assert!(!operation.allowed(&request));
    }

    #[test]
    fn test_anonymous_only() {
        let operation = operation(CacheOptions {
            anonymous_only: true,
            ..CacheOptions::default()
        });
        assert!(operation.allowed(&get()));

        let authenticated = Request::builder()
            .header(AUTHORIZATION, "Bearer abc")
            .body(Body::empty())
            .unwrap();
        assert!(!operation.allowed(&authenticated));
    }

    #[test]
    fn test_media_type_override() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, "text/xml".parse().unwrap());

        assert_eq!(operation(CacheOptions::default()).media_type(&headers), "text/xml");

        let forced = operation(CacheOptions {
            media_type: Some("text/plain".to_string()),
            ..CacheOptions::default()
        });
        assert_eq!(forced.media_type(&headers), "text/plain");
    }

    #[test]
    fn test_cache_key() {
        let operation = operation(CacheOptions::default());
        let arguments = vec![("id".to_string(), ArgumentValue::from("1"))];
        assert_eq!(
            operation.cache_key(&arguments, &[], "application/json"),
            "widgetscontroller-getwidget-id=1:application/json"
        );
        assert_eq!(operation.base_key(), "widgetscontroller-getwidget");
    }
}
