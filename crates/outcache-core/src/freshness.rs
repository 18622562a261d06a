//! Freshness policies.
//!
//! A policy turns the current instant into a [`FreshnessWindow`]: how long the
//! client and shared caches may keep the response and when the stored copy
//! expires on the server.

use crate::{OutcacheError, OutcacheResult};
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, Timelike, Utc};
use std::fmt::Debug;
use std::time::Duration;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Lifetimes computed for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow {
    pub client_ttl: Option<Duration>,
    pub shared_ttl: Option<Duration>,
    pub absolute_expiration: DateTime<Utc>,
}

impl FreshnessWindow {
    /// Checks if a response stored now would still be alive at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.absolute_expiration > now
    }

    /// Time left until the server-side copy expires.
    #[must_use]
    pub fn server_ttl(&self, now: DateTime<Utc>) -> Duration {
        (self.absolute_expiration - now).to_std().unwrap_or_default()
    }
}

/// Strategy computing the freshness window of a cached response.
pub trait FreshnessPolicy: Send + Sync + Debug {
    fn evaluate(&self, now: DateTime<Utc>) -> FreshnessWindow;
}

/// Constant lifetimes in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDuration {
    server: u64,
    client: Option<u64>,
    shared: Option<u64>,
}

impl FixedDuration {
    /// Creates a fixed policy. Negative values clamp to zero.
    #[must_use]
    pub fn new(server: i64, client: Option<i64>, shared: Option<i64>) -> Self {
        let clamp = |secs: i64| secs.max(0).unsigned_abs();
        Self {
            server: clamp(server),
            client: client.map(clamp),
            shared: shared.map(clamp),
        }
    }
}

impl FreshnessPolicy for FixedDuration {
    fn evaluate(&self, now: DateTime<Utc>) -> FreshnessWindow {
        let server = i64::try_from(self.server).unwrap_or(i64::MAX);
        let absolute_expiration = ChronoDuration::try_seconds(server)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        FreshnessWindow {
            client_ttl: self.client.map(Duration::from_secs),
            shared_ttl: self.shared.map(Duration::from_secs),
            absolute_expiration,
        }
    }
}

/// Lifetimes that end at the next configured time of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleOfDay {
    server_times: Vec<NaiveTime>,
    client_times: Vec<NaiveTime>,
    offset: Option<FixedOffset>,
}

impl ScheduleOfDay {
    pub fn new(
        mut server_times: Vec<NaiveTime>,
        mut client_times: Vec<NaiveTime>,
    ) -> OutcacheResult<Self> {
        if server_times.is_empty() {
            return Err(OutcacheError::invalid_argument("server times of day must not be empty"));
        }
        if client_times.is_empty() {
            return Err(OutcacheError::invalid_argument("client times of day must not be empty"));
        }
        server_times.sort();
        server_times.dedup();
        client_times.sort();
        client_times.dedup();

        Ok(Self {
            server_times,
            client_times,
            offset: None,
        })
    }

    /// Parses comma-separated `HH:MM[:SS]` lists.
    pub fn parse(server_times: &str, client_times: &str) -> OutcacheResult<Self> {
        Self::new(parse_times_of_day(server_times)?, parse_times_of_day(client_times)?)
    }

    /// Evaluates times of day on a wall clock shifted by `offset`.
    #[must_use]
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    fn time_of_day(&self, now: DateTime<Utc>) -> NaiveTime {
        match self.offset {
            Some(offset) => now.with_timezone(&offset).time(),
            None => now.time(),
        }
    }
}

impl FreshnessPolicy for ScheduleOfDay {
    fn evaluate(&self, now: DateTime<Utc>) -> FreshnessWindow {
        let time_of_day = self.time_of_day(now);
        let server = until_next(&self.server_times, time_of_day);
        let client = until_next(&self.client_times, time_of_day);

        FreshnessWindow {
            client_ttl: Some(client.to_std().unwrap_or_default()),
            shared_ttl: None,
            absolute_expiration: now + server,
        }
    }
}

/// Duration from `time_of_day` to the first entry strictly after it,
/// wrapping to the first entry of the next day.
fn until_next(sorted: &[NaiveTime], time_of_day: NaiveTime) -> ChronoDuration {
    match sorted.iter().find(|t| **t > time_of_day) {
        Some(next) => *next - time_of_day,
        None => {
            let first = sorted.first().copied().unwrap_or(NaiveTime::MIN);
            ChronoDuration::seconds(SECONDS_PER_DAY) - (time_of_day - first)
        }
    }
}

/// Parses a comma-separated list of `HH:MM` or `HH:MM:SS` times.
pub fn parse_times_of_day(input: &str) -> OutcacheResult<Vec<NaiveTime>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            NaiveTime::parse_from_str(part, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(part, "%H:%M"))
                .map(|time| time.with_nanosecond(0).unwrap_or(time))
                .map_err(|e| {
                    OutcacheError::invalid_argument(format!("invalid time of day '{}': {}", part, e))
                })
        })
        .collect()
}
