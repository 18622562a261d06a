//! Request argument extraction.
//!
//! Path parameters become bound arguments, the query string becomes query
//! parameters. Both are read without knowing the handler's signature.

use axum::{extract::RawPathParams, http::Uri};
use outcache_core::ArgumentValue;

/// Collects the matched path parameters as bound arguments.
#[must_use]
pub fn path_arguments(params: Option<&RawPathParams>) -> Vec<(String, ArgumentValue)> {
    params
        .map(|params| {
            params
                .iter()
                .map(|(name, value)| (name.to_string(), ArgumentValue::from(value)))
                .collect()
        })
        .unwrap_or_default()
}

/// Decodes the query string into name/value pairs, in request order.
#[must_use]
pub fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    uri.query()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(name, value)| (name.into_owned(), value.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

/// Values bound on a request, path parameters first.
///
/// Used by invalidation to look arguments up by name.
#[must_use]
pub fn bound_values(
    arguments: &[(String, ArgumentValue)],
    query: &[(String, String)],
) -> Vec<(String, String)> {
    let mut bound = outcache_core::argument_pairs(arguments);
    bound.extend(query.iter().cloned());
    bound
}
