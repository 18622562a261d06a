//! Per-route cache policies.
//!
//! [`CacheOutputConfig`] caches for fixed durations, [`CacheUntilConfig`]
//! caches until the next configured time of day. Both carry the same
//! [`CacheOptions`] and resolve into a freshness policy through
//! [`OutputCachePolicy`].

use crate::headers::CacheDirectives;
use chrono::FixedOffset;
use outcache_core::{FixedDuration, FreshnessPolicy, OutcacheResult, ScheduleOfDay};
use std::sync::Arc;

/// Route options shared by every policy kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Serve and store only for anonymous callers.
    pub anonymous_only: bool,
    /// Build keys from bound arguments only.
    pub exclude_query_string: bool,
    /// Media type forced into every key of the route.
    pub media_type: Option<String>,
    /// Name of a registered key generator.
    pub key_generator: Option<String>,
    pub directives: CacheDirectives,
}

/// Converts a route configuration into its freshness policy and options.
pub trait OutputCachePolicy {
    fn into_parts(self) -> OutcacheResult<(Arc<dyn FreshnessPolicy>, CacheOptions)>;
}

/// Caching for fixed durations, in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOutputConfig {
    server_time_span: i64,
    client_time_span: Option<i64>,
    shared_time_span: Option<i64>,
    options: CacheOptions,
}

impl CacheOutputConfig {
    /// Keeps responses on the server for `server_time_span` seconds.
    #[must_use]
    pub fn new(server_time_span: i64) -> Self {
        Self {
            server_time_span,
            client_time_span: None,
            shared_time_span: None,
            options: CacheOptions::default(),
        }
    }

    /// Sets `max-age`.
    #[must_use]
    pub fn client_time_span(mut self, seconds: i64) -> Self {
        self.client_time_span = Some(seconds);
        self
    }

    /// Sets `s-maxage`.
    #[must_use]
    pub fn shared_time_span(mut self, seconds: i64) -> Self {
        self.shared_time_span = Some(seconds);
        self
    }
}

impl OutputCachePolicy for CacheOutputConfig {
    fn into_parts(self) -> OutcacheResult<(Arc<dyn FreshnessPolicy>, CacheOptions)> {
        let policy = FixedDuration::new(
            self.server_time_span,
            self.client_time_span,
            self.shared_time_span,
        );
        Ok((Arc::new(policy), self.options))
    }
}

/// Caching until the next configured time of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheUntilConfig {
    server_times_of_day: String,
    client_times_of_day: Option<String>,
    utc_offset: Option<FixedOffset>,
    options: CacheOptions,
}

impl CacheUntilConfig {
    /// Expires stored responses at each of the comma-separated
    /// `HH:MM[:SS]` times.
    #[must_use]
    pub fn new(server_times_of_day: impl Into<String>) -> Self {
        Self {
            server_times_of_day: server_times_of_day.into(),
            client_times_of_day: None,
            utc_offset: None,
            options: CacheOptions::default(),
        }
    }

    /// Times bounding `max-age`. Defaults to the server times.
    #[must_use]
    pub fn client_times_of_day(mut self, times: impl Into<String>) -> Self {
        self.client_times_of_day = Some(times.into());
        self
    }

    /// Reads times of day on a clock at `offset` from UTC.
    #[must_use]
    pub fn utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = Some(offset);
        self
    }
}

impl OutputCachePolicy for CacheUntilConfig {
    fn into_parts(self) -> OutcacheResult<(Arc<dyn FreshnessPolicy>, CacheOptions)> {
        let client = self
            .client_times_of_day
            .as_deref()
            .unwrap_or(&self.server_times_of_day);
        let mut policy = ScheduleOfDay::parse(&self.server_times_of_day, client)?;
        if let Some(offset) = self.utc_offset {
            policy = policy.with_offset(offset);
        }
        Ok((Arc::new(policy), self.options))
    }
}

macro_rules! cache_option_setters {
    ($config:ty) => {
        impl $config {
            #[must_use]
            pub fn anonymous_only(mut self, enabled: bool) -> Self {
                self.options.anonymous_only = enabled;
                self
            }

            #[must_use]
            pub fn exclude_query_string(mut self, enabled: bool) -> Self {
                self.options.exclude_query_string = enabled;
                self
            }

            #[must_use]
            pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
                self.options.media_type = Some(media_type.into());
                self
            }

            #[must_use]
            pub fn key_generator(mut self, name: impl Into<String>) -> Self {
                self.options.key_generator = Some(name.into());
                self
            }

            #[must_use]
            pub fn must_revalidate(mut self, enabled: bool) -> Self {
                self.options.directives.must_revalidate = enabled;
                self
            }

            #[must_use]
            pub fn no_cache(mut self, enabled: bool) -> Self {
                self.options.directives.no_cache = enabled;
                self
            }

            #[must_use]
            pub fn private(mut self, enabled: bool) -> Self {
                self.options.directives.private = enabled;
                self
            }

            #[must_use]
            pub fn public(mut self, enabled: bool) -> Self {
                self.options.directives.public = enabled;
                self
            }

            #[must_use]
            pub fn options(&self) -> &CacheOptions {
                &self.options
            }
        }
    };
}

cache_option_setters!(CacheOutputConfig);
cache_option_setters!(CacheUntilConfig);
