//! Cache key derivation.
//!
//! A cache key has the shape `base[-pairs]:media-type` where `base` is the
//! lower-cased `controller-action` pair shared by every cached variant of one
//! handler. The base key doubles as the group name used for invalidation.

use crate::{OutcacheError, OutcacheResult};
use std::fmt::{self, Debug, Display};

/// Suffix appended to a cache key to address its response metadata entry.
pub const METADATA_KEY_SUFFIX: &str = ":meta";

/// Query parameter carrying a JSONP callback name.
pub const JSONP_CALLBACK_PARAMETER: &str = "callback";

/// Glob marker that turns a group key into a pattern.
pub const GLOB_MARKER: char = '*';

/// Stable identity of a cacheable handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteIdentity {
    controller: String,
    action: String,
}

impl RouteIdentity {
    /// Creates a route identity, rejecting empty names.
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> OutcacheResult<Self> {
        let controller = controller.into();
        let action = action.into();
        make_base_key(&controller, &action)?;
        Ok(Self { controller, action })
    }

    /// Returns the controller identity.
    #[must_use]
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Returns the action identity.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns the group key for every variant of this handler.
    #[must_use]
    pub fn base_key(&self) -> String {
        format!(
            "{}-{}",
            self.controller.to_lowercase(),
            self.action.to_lowercase()
        )
    }
}

impl Display for RouteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.controller, self.action)
    }
}

/// Builds the base key `controller-action`, lower-cased.
pub fn make_base_key(controller: &str, action: &str) -> OutcacheResult<String> {
    if controller.trim().is_empty() {
        return Err(OutcacheError::invalid_argument("controller identity must not be empty"));
    }
    if action.trim().is_empty() {
        return Err(OutcacheError::invalid_argument("action identity must not be empty"));
    }
    Ok(format!("{}-{}", controller.to_lowercase(), action.to_lowercase()))
}

/// A bound handler argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentValue {
    /// Argument present in the signature but not bound.
    Null,
    /// Single value in its natural string form.
    Scalar(String),
    /// Ordered sequence of values.
    Sequence(Vec<String>),
}

impl ArgumentValue {
    /// Renders the value as it appears in a key, `None` for null.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Scalar(value) => Some(value.clone()),
            Self::Sequence(values) => Some(values.join(";")),
        }
    }
}

impl From<&str> for ArgumentValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for ArgumentValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<i64> for ArgumentValue {
    fn from(value: i64) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl<T: ToString> From<Vec<T>> for ArgumentValue {
    fn from(values: Vec<T>) -> Self {
        Self::Sequence(values.iter().map(ToString::to_string).collect())
    }
}

impl<T: Into<ArgumentValue>> From<Option<T>> for ArgumentValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Everything the key codec needs to know about one request.
#[derive(Debug, Clone, Copy)]
pub struct KeyRequest<'a> {
    pub identity: &'a RouteIdentity,
    pub arguments: &'a [(String, ArgumentValue)],
    pub query: &'a [(String, String)],
    pub media_type: &'a str,
    pub exclude_query_string: bool,
}

/// Builds the cache key for one response variant.
///
/// Parameter pairs are de-duplicated and sorted before joining, so the same
/// set of arguments and query parameters always yields the same key.
#[must_use]
pub fn make_cache_key(request: &KeyRequest<'_>) -> String {
    let mut pairs = argument_pairs(request.arguments);

    if !request.exclude_query_string {
        for (name, value) in request.query {
            if is_callback(name) {
                continue;
            }
            pairs.push((name.clone(), value.clone()));
        }

        if jsonp_callback(request.query).is_some() {
            pairs.retain(|(name, _)| !is_callback(name));
        }
    }

    pairs.sort();
    pairs.dedup();

    let joined = pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&");

    let base = request.identity.base_key();
    if joined.is_empty() {
        format!("{}:{}", base, request.media_type)
    } else {
        format!("{}-{}:{}", base, joined, request.media_type)
    }
}

/// Returns the key of the metadata entry stored next to `cache_key`.
#[must_use]
pub fn metadata_key(cache_key: &str) -> String {
    format!("{}{}", cache_key, METADATA_KEY_SUFFIX)
}

/// Checks if a group key is a glob pattern.
#[must_use]
pub fn is_pattern(key: &str) -> bool {
    key.contains(GLOB_MARKER)
}

/// Builds a glob matching every variant of `base_key` whose parameters
/// include all of `pairs`.
///
/// Pairs are sorted the same way [`make_cache_key`] sorts them, and each one
/// must be followed by `&` or the `:` that starts the media type, so `id=4`
/// does not match `id=42`.
#[must_use]
pub fn narrowing_pattern(base_key: &str, pairs: &[(String, String)]) -> String {
    let mut pairs = pairs.to_vec();
    pairs.sort();
    pairs.dedup();

    let mut pattern = format!("{}-*", escape_glob(base_key));
    for (name, value) in &pairs {
        pattern.push_str(&escape_glob(name));
        pattern.push('=');
        pattern.push_str(&escape_glob(value));
        pattern.push_str("[&:]*");
    }
    pattern
}

/// Escapes glob metacharacters so the text matches literally.
#[must_use]
pub fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Renders bound arguments as `name=value` pairs, skipping nulls.
#[must_use]
pub fn argument_pairs(arguments: &[(String, ArgumentValue)]) -> Vec<(String, String)> {
    arguments
        .iter()
        .filter_map(|(name, value)| value.render().map(|rendered| (name.clone(), rendered)))
        .collect()
}

fn is_callback(name: &str) -> bool {
    name.eq_ignore_ascii_case(JSONP_CALLBACK_PARAMETER)
}

fn jsonp_callback(query: &[(String, String)]) -> Option<&str> {
    query
        .iter()
        .find(|(name, _)| is_callback(name))
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.trim().is_empty())
}

/// Strategy that turns a request into a cache key.
///
/// Implementations must keep the key prefixed by the base key, otherwise
/// group invalidation cannot reach the variants they produce.
pub trait CacheKeyGenerator: Send + Sync + Debug {
    /// Builds the cache key for one response variant.
    fn make_cache_key(&self, request: &KeyRequest<'_>) -> String;

    /// Builds the group key for a handler.
    fn make_base_key(&self, identity: &RouteIdentity) -> String {
        identity.base_key()
    }
}

/// Key generator backed by [`make_cache_key`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultKeyGenerator;

impl CacheKeyGenerator for DefaultKeyGenerator {
    fn make_cache_key(&self, request: &KeyRequest<'_>) -> String {
        make_cache_key(request)
    }
}
