//! Metadata stored alongside every cached payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of the `Last-Modified` header.
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Response details needed to replay a cached payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Entity tag without surrounding quotes.
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

impl ResponseMetadata {
    pub fn new(
        status_code: u16,
        content_type: Option<String>,
        etag: impl Into<String>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            status_code,
            content_type,
            etag: etag.into(),
            last_modified,
        }
    }

    /// Returns the etag as a quoted header value.
    #[must_use]
    pub fn etag_header(&self) -> String {
        format!("\"{}\"", self.etag)
    }

    /// Returns the last-modified time as an HTTP date.
    #[must_use]
    pub fn last_modified_header(&self) -> String {
        self.last_modified.format(HTTP_DATE_FORMAT).to_string()
    }

    /// Checks an `If-None-Match` header value against the stored etag.
    ///
    /// Surrounding quotes and a weak `W/` prefix are ignored; `*` matches any
    /// etag.
    #[must_use]
    pub fn matches_etag(&self, if_none_match: &str) -> bool {
        if_none_match.split(',').any(|candidate| {
            let candidate = candidate.trim();
            if candidate == "*" {
                return true;
            }
            let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
            candidate.trim_matches('"') == self.etag
        })
    }
}
