//! Anonymous caller detection.
//!
//! Routes configured with `anonymous_only` consult an [`AnonymityPredicate`] before
//! serving or storing a cached response. Authentication itself happens
//! elsewhere; the predicate only reads what earlier layers left on the request.

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request},
};
use std::marker::PhantomData;

/// Decides whether a request comes from an anonymous caller.
pub trait AnonymityPredicate: Send + Sync {
    fn is_anonymous(&self, request: &Request<Body>) -> bool;
}

/// Treats every request without an `Authorization` header as anonymous.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthorizationHeaderPredicate;

impl AnonymityPredicate for AuthorizationHeaderPredicate {
    fn is_anonymous(&self, request: &Request<Body>) -> bool {
        !request.headers().contains_key(AUTHORIZATION)
    }
}

/// Treats a request as anonymous unless an authentication layer inserted a
/// `T` into its extensions.
pub struct ExtensionPredicate<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ExtensionPredicate<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ExtensionPredicate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ExtensionPredicate<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionPredicate")
            .field("extension", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Send + Sync + 'static> AnonymityPredicate for ExtensionPredicate<T> {
    fn is_anonymous(&self, request: &Request<Body>) -> bool {
        request.extensions().get::<T>().is_none()
    }
}
