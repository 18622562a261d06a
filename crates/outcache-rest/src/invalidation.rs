//! Group invalidation after mutating requests.

use crate::arguments::{bound_values, path_arguments, query_pairs};
use crate::metrics::{record_invalidation, record_store_error};
use axum::{
    body::Body,
    extract::{RawPathParams, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use outcache_core::narrowing_pattern;
use outcache_store::OutputStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// A cached route made stale by a mutating route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationTarget {
    pub(crate) controller: Option<String>,
    pub(crate) action: String,
    pub(crate) argument_names: Vec<String>,
    pub(crate) key_generator: Option<String>,
}

impl InvalidationTarget {
    /// Targets an action of the mutating route's own controller.
    pub fn action(action: impl Into<String>) -> Self {
        Self {
            controller: None,
            action: action.into(),
            argument_names: Vec::new(),
            key_generator: None,
        }
    }

    /// Targets an action of another controller.
    pub fn in_controller(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: Some(controller.into()),
            ..Self::action(action)
        }
    }

    /// Narrows invalidation to variants whose arguments match the values
    /// bound on the mutating request under the same names.
    #[must_use]
    pub fn with_arguments<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argument_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Key generator the target route was cached with.
    #[must_use]
    pub fn with_key_generator(mut self, name: impl Into<String>) -> Self {
        self.key_generator = Some(name.into());
        self
    }
}

/// A target with its group key resolved.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedTarget {
    pub(crate) base_key: String,
    pub(crate) argument_names: Vec<String>,
}

impl ResolvedTarget {
    /// Key passed to `remove_group` for the given bound values.
    ///
    /// Falls back to the whole group when none of the named arguments is
    /// bound on the request.
    fn group_key(&self, bound: &[(String, String)]) -> String {
        let pairs: Vec<(String, String)> = self
            .argument_names
            .iter()
            .filter_map(|name| {
                bound
                    .iter()
                    .find(|(bound_name, _)| bound_name == name)
                    .map(|(_, value)| (name.clone(), value.clone()))
            })
            .collect();

        if pairs.is_empty() {
            self.base_key.clone()
        } else {
            narrowing_pattern(&self.base_key, &pairs)
        }
    }
}

/// Groups removed by one mutating route.
///
/// Built by [`ControllerScope::invalidate`](crate::ControllerScope::invalidate).
pub struct Invalidation {
    targets: Vec<ResolvedTarget>,
    store: Arc<dyn OutputStore>,
}

impl Invalidation {
    pub(crate) fn new(targets: Vec<ResolvedTarget>, store: Arc<dyn OutputStore>) -> Self {
        Self { targets, store }
    }

    /// Group keys or patterns removed for the given bound values.
    #[must_use]
    pub fn group_keys(&self, bound: &[(String, String)]) -> Vec<String> {
        self.targets.iter().map(|target| target.group_key(bound)).collect()
    }

    /// Removes every target group. Failures are logged and skipped.
    ///
    /// Returns the number of keys removed.
    pub async fn invalidate(&self, bound: &[(String, String)]) -> u64 {
        let mut total = 0;
        for key in self.group_keys(bound) {
            match self.store.remove_group(&key).await {
                Ok(removed) => {
                    debug!(group = %key, removed, "Invalidated cached responses");
                    record_invalidation(removed);
                    total += removed;
                }
                Err(e) => {
                    record_store_error("remove_group");
                    warn!(group = %key, error = %e, "Failed to invalidate cached responses");
                }
            }
        }
        total
    }
}

impl std::fmt::Debug for Invalidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invalidation")
            .field("targets", &self.targets)
            .field("backend", &self.store.backend())
            .finish()
    }
}

/// Invalidates cached routes after the route it is layered on succeeds.
///
/// Runs only for 2xx and 3xx responses. Install with
/// `axum::middleware::from_fn_with_state(invalidation, invalidate_output)`.
pub async fn invalidate_output(
    State(invalidation): State<Arc<Invalidation>>,
    params: Option<RawPathParams>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let arguments = path_arguments(params.as_ref());
    let query = query_pairs(request.uri());

    let response = next.run(request).await;

    let status = response.status();
    if status.is_success() || status.is_redirection() {
        let bound = bound_values(&arguments, &query);
        invalidation.invalidate(&bound).await;
    } else {
        debug!(status = status.as_u16(), "Skipping invalidation for failed request");
    }

    response
}
