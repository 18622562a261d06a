//! HTTP layers shared by every router.

use crate::middleware::logging_middleware;
use axum::{middleware, Router};
use outcache_config::ServerConfig;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Wraps a router in compression, CORS, timeout, tracing and request logging.
///
/// Compression sits outside the route layers, so cached payloads are stored
/// uncompressed.
pub fn apply_http_layers(router: Router, server_config: &ServerConfig) -> Router {
    router
        .layer(CompressionLayer::new())
        .layer(create_cors_layer(server_config))
        .layer(TimeoutLayer::new(server_config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(logging_middleware))
}

/// Creates a CORS layer based on server configuration.
fn create_cors_layer(server_config: &ServerConfig) -> CorsLayer {
    if server_config.cors_enabled {
        if server_config.cors_origins.iter().any(|origin| origin == "*") {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    }
}
