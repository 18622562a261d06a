//! Per-request cache state.

use chrono::{DateTime, Utc};
use outcache_core::{FreshnessPolicy, FreshnessWindow};

/// Marker extension that turns caching off.
///
/// Inserted into request extensions it bypasses the cache entirely; inserted
/// into response extensions by a handler it keeps that response out of the
/// store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SkipOutputCache;

/// How the interceptor handled a request. Added to response extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOutcome {
    /// Served from the store.
    Hit,
    /// Answered with 304 from the stored etag.
    NotModified,
    /// Handler ran; its response may have been stored.
    Miss,
    /// Caching was not allowed for this request.
    Bypass,
}

impl CacheOutcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::NotModified => "not_modified",
            Self::Miss => "miss",
            Self::Bypass => "bypass",
        }
    }
}

impl std::fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State the interceptor carries through one request.
#[derive(Debug, Clone)]
pub struct RequestCacheContext {
    key: String,
    media_type: String,
    started_at: DateTime<Utc>,
    window: Option<FreshnessWindow>,
    served_from_cache: bool,
}

impl RequestCacheContext {
    pub fn new(key: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self::at(key, media_type, Utc::now())
    }

    /// Creates a context for a request that started at `started_at`.
    pub fn at(key: impl Into<String>, media_type: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            media_type: media_type.into(),
            started_at,
            window: None,
            served_from_cache: false,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub const fn served_from_cache(&self) -> bool {
        self.served_from_cache
    }

    pub fn mark_served_from_cache(&mut self) {
        self.served_from_cache = true;
    }

    /// Returns the freshness window, evaluating `policy` on first use.
    pub fn window(&mut self, policy: &dyn FreshnessPolicy) -> FreshnessWindow {
        let started_at = self.started_at;
        *self.window.get_or_insert_with(|| policy.evaluate(started_at))
    }
}
