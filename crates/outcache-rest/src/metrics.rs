//! Output cache metrics.
//!
//! Counters go through the `metrics` facade; the server installs the
//! Prometheus recorder when metrics are enabled.

use crate::context::CacheOutcome;
use metrics::{counter, describe_counter};

/// Metric names.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "outcache_requests_total";
    pub const STORE_ERRORS_TOTAL: &str = "outcache_store_errors_total";
    pub const INVALIDATIONS_TOTAL: &str = "outcache_invalidations_total";
    pub const INVALIDATED_KEYS_TOTAL: &str = "outcache_invalidated_keys_total";
}

/// Registers metric descriptions with the installed recorder.
pub fn register_metrics() {
    describe_counter!(
        names::REQUESTS_TOTAL,
        "Requests seen by the output cache, by outcome"
    );
    describe_counter!(
        names::STORE_ERRORS_TOTAL,
        "Output store calls that failed, by operation"
    );
    describe_counter!(
        names::INVALIDATIONS_TOTAL,
        "Group invalidations issued after mutating requests"
    );
    describe_counter!(
        names::INVALIDATED_KEYS_TOTAL,
        "Keys removed by group invalidation"
    );
}

pub fn record_outcome(outcome: CacheOutcome) {
    counter!(names::REQUESTS_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

pub fn record_store_error(operation: &'static str) {
    counter!(names::STORE_ERRORS_TOTAL, "operation" => operation).increment(1);
}

pub fn record_invalidation(removed: u64) {
    counter!(names::INVALIDATIONS_TOTAL).increment(1);
    counter!(names::INVALIDATED_KEYS_TOTAL).increment(removed);
}
