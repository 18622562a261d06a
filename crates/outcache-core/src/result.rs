//! Result type alias for Outcache.

use crate::OutcacheError;

/// A specialized `Result` type for Outcache operations.
pub type OutcacheResult<T> = Result<T, OutcacheError>;
