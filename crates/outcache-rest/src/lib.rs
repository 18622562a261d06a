//! # Outcache REST
//!
//! Axum integration for the Outcache HTTP output cache.
//!
//! Routes opt into caching through a [`ControllerScope`]: the scope turns a
//! per-route policy into a [`CacheableOperation`] consumed by the
//! [`cache_output`] middleware, and mutating routes attach the
//! [`invalidate_output`] middleware to drop the groups they make stale.
//!
//! ```ignore
//! let cache = OutputCache::new(store);
//! let widgets = cache.controller("WidgetsController")?;
//!
//! let router = Router::new().route(
//!     "/widgets",
//!     get(list_widgets.layer(from_fn_with_state(
//!         widgets.cache("GetWidgets", CacheOutputConfig::new(60))?,
//!         cache_output,
//!     )))
//!     .post(create_widget.layer(from_fn_with_state(
//!         widgets.invalidate("GetWidgets")?,
//!         invalidate_output,
//!     ))),
//! );
//! ```

pub mod anonymity;
pub mod arguments;
pub mod context;
pub mod headers;
pub mod interceptor;
pub mod invalidation;
pub mod key_generator;
pub mod metrics;
pub mod middleware;
pub mod negotiation;
pub mod operation;
pub mod policy;
pub mod responses;
pub mod router;
pub mod scope;
pub mod settings;

pub use anonymity::{AnonymityPredicate, AuthorizationHeaderPredicate, ExtensionPredicate};
pub use context::{CacheOutcome, RequestCacheContext, SkipOutputCache};
pub use headers::CacheDirectives;
pub use interceptor::cache_output;
pub use invalidation::{invalidate_output, Invalidation, InvalidationTarget};
pub use key_generator::KeyGeneratorRegistry;
pub use operation::CacheableOperation;
pub use policy::{CacheOptions, CacheOutputConfig, CacheUntilConfig, OutputCachePolicy};
pub use router::apply_http_layers;
pub use scope::{ControllerScope, OutputCache};
pub use settings::CacheSettings;
