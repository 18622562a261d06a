//! Freshness response headers.

use axum::http::{
    header::{CACHE_CONTROL, ETAG, IF_NONE_MATCH, LAST_MODIFIED, PRAGMA},
    HeaderMap, HeaderValue,
};
use chrono::{DateTime, Utc};
use outcache_core::{FreshnessWindow, HTTP_DATE_FORMAT};

/// `Cache-Control` directives configured on a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDirectives {
    pub no_cache: bool,
    pub must_revalidate: bool,
    pub private: bool,
    pub public: bool,
}

impl Default for CacheDirectives {
    fn default() -> Self {
        Self {
            no_cache: false,
            must_revalidate: false,
            private: true,
            public: false,
        }
    }
}

/// Renders the `Cache-Control` value, or `None` when no directive applies.
///
/// `public` wins over `private` when both are set.
#[must_use]
pub fn cache_control_value(directives: &CacheDirectives, window: &FreshnessWindow) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if directives.public {
        parts.push("public".to_string());
    } else if directives.private {
        parts.push("private".to_string());
    }
    if directives.no_cache {
        parts.push("no-cache".to_string());
    }
    if directives.must_revalidate {
        parts.push("must-revalidate".to_string());
    }
    if let Some(client) = window.client_ttl {
        parts.push(format!("max-age={}", client.as_secs()));
    }
    if let Some(shared) = window.shared_ttl {
        parts.push(format!("s-maxage={}", shared.as_secs()));
    }

    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Writes `Cache-Control`, `Pragma` and `Last-Modified` onto a response.
pub fn apply_freshness_headers(
    headers: &mut HeaderMap,
    directives: &CacheDirectives,
    window: &FreshnessWindow,
    last_modified: Option<DateTime<Utc>>,
) {
    if let Some(value) = cache_control_value(directives, window) {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(CACHE_CONTROL, value);
        }
    }

    if directives.no_cache {
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    }

    if let Some(last_modified) = last_modified {
        let formatted = last_modified.format(HTTP_DATE_FORMAT).to_string();
        if let Ok(value) = HeaderValue::from_str(&formatted) {
            headers.insert(LAST_MODIFIED, value);
        }
    }
}

/// Sets the `ETag` header from an already quoted value.
pub fn set_etag(headers: &mut HeaderMap, quoted: &str) {
    if let Ok(value) = HeaderValue::from_str(quoted) {
        headers.insert(ETAG, value);
    }
}

/// Reads `If-None-Match`, if present and valid text.
#[must_use]
pub fn if_none_match(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
