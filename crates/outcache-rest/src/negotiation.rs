//! Media type selection for cache keys.

use axum::http::{header::ACCEPT, HeaderMap};

/// Picks the media type a response variant is cached under.
///
/// Only the first `Accept` entry is considered; quality values and other
/// parameters are ignored. Returns the supported entry as configured, so
/// differently cased requests share one key.
#[must_use]
pub fn negotiate_media_type(headers: &HeaderMap, supported: &[String], default: &str) -> String {
    headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .and_then(|accept| accept.split(',').next())
        .and_then(|first| first.split(';').next())
        .map(str::trim)
        .and_then(|requested| {
            supported
                .iter()
                .find(|candidate| candidate.eq_ignore_ascii_case(requested))
        })
        .map_or_else(|| default.to_string(), Clone::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn supported() -> Vec<String> {
        vec!["application/json".to_string(), "text/xml".to_string()]
    }

    fn negotiate(accept: Option<&'static str>) -> String {
        let mut headers = HeaderMap::new();
        if let Some(accept) = accept {
            headers.insert(ACCEPT, HeaderValue::from_static(accept));
        }
        negotiate_media_type(&headers, &supported(), "application/json")
    }

    #[test]
    fn test_missing_accept_uses_default() {
        assert_eq!(negotiate(None), "application/json");
    }

    #[test]
    fn test_first_supported_entry_wins() {
        assert_eq!(negotiate(Some("text/xml")), "text/xml");
        assert_eq!(negotiate(Some("Text/XML;q=0.9, application/json")), "text/xml");
    }

    #[test]
    fn test_only_first_entry_is_considered() {
        assert_eq!(negotiate(Some("text/html, text/xml")), "application/json");
        assert_eq!(negotiate(Some("*/*")), "application/json");
    }
}
