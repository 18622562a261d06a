//! Application builder.

use crate::startup::print_startup_info;
use crate::widgets::{self, WidgetRepository};
use axum::{routing::get, Json, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use outcache_config::{AppConfig, StoreBackend};
use outcache_core::{OutcacheError, OutcacheResult};
use outcache_rest::{apply_http_layers, metrics::register_metrics, CacheSettings, OutputCache};
use outcache_store::{
    pool::{create_pool, ping, redacted},
    sweeper::spawn_sweeper,
    LocalOutputStore, OutputStore, RedisOutputStore,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Creates the output store selected by configuration.
///
/// The Redis store is verified with a `PING` before it is handed out.
pub async fn create_store(config: &AppConfig) -> OutcacheResult<Arc<dyn OutputStore>> {
    match config.cache.backend {
        StoreBackend::Local => {
            info!(max_entries = config.cache.local_max_entries, "Using local output store");
            Ok(Arc::new(LocalOutputStore::new(config.cache.local_max_entries)))
        }
        StoreBackend::Redis => {
            info!(url = %redacted(&config.redis.url), "Using Redis output store");
            let pool = create_pool(&config.redis)?;
            ping(&pool, &config.redis).await?;
            Ok(Arc::new(RedisOutputStore::from_config(Arc::new(pool), &config.redis)))
        }
    }
}

/// Application builder for constructing the server.
#[derive(Default)]
pub struct AppBuilder {
    config: Option<AppConfig>,
    store: Option<Arc<dyn OutputStore>>,
    repository: Option<Arc<WidgetRepository>>,
}

impl AppBuilder {
    /// Creates a new application builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses `store` instead of the configured backend.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn OutputStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_repository(mut self, repository: Arc<WidgetRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Creates the store, starts the sweeper and assembles the router.
    pub async fn build(self) -> OutcacheResult<App> {
        let config = self.config.unwrap_or_default();
        let store = match self.store {
            Some(store) => store,
            None => create_store(&config).await?,
        };
        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(WidgetRepository::seeded()));

        let shutdown = CancellationToken::new();
        let sweeper = (config.cache.backend == StoreBackend::Local).then(|| {
            spawn_sweeper(
                Arc::clone(&store),
                config.cache.sweep_interval(),
                shutdown.clone(),
            )
        });

        let cache = OutputCache::new(Arc::clone(&store))
            .with_settings(CacheSettings::from_config(&config.cache));

        let mut router = Router::new()
            .route("/health", get(health_check))
            .merge(widgets::router(Arc::clone(&repository), &cache)?);

        if config.observability.metrics_enabled {
            let handle = install_metrics_recorder()?;
            router = router.route(
                &config.observability.metrics_path,
                get(move || std::future::ready(handle.render())),
            );
        }

        let router = apply_http_layers(router, &config.server);
        info!(backend = store.backend(), "Application assembled");

        Ok(App {
            config,
            router,
            store,
            repository,
            shutdown,
            sweeper,
        })
    }
}

fn install_metrics_recorder() -> OutcacheResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| OutcacheError::configuration(format!("Failed to install metrics recorder: {}", e)))?;
    register_metrics();
    Ok(handle)
}

/// Health check endpoint.
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// An assembled application.
pub struct App {
    config: AppConfig,
    router: Router,
    store: Arc<dyn OutputStore>,
    repository: Arc<WidgetRepository>,
    shutdown: CancellationToken,
    sweeper: Option<JoinHandle<()>>,
}

impl App {
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn OutputStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn repository(&self) -> Arc<WidgetRepository> {
        Arc::clone(&self.repository)
    }

    /// Serves until `signal` resolves, then stops background tasks.
    pub async fn serve<F>(self, signal: F) -> OutcacheResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.server.addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| OutcacheError::internal(format!("Failed to bind {}: {}", addr, e)))?;

        print_startup_info(&self.config, self.store.backend());

        let result = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| OutcacheError::internal(format!("HTTP server error: {}", e)));

        self.shutdown().await;
        result
    }

    /// Stops the sweeper and waits for it to exit.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Some(sweeper) = self.sweeper {
            if let Err(e) = sweeper.await {
                tracing::warn!(error = %e, "Sweeper task ended abnormally");
            }
        }
        info!("Application shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outcache_config::RedisConfig;

    fn quiet_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.observability.metrics_enabled = false;
        config
    }

    #[tokio::test]
    async fn test_create_local_store() {
        let store = create_store(&quiet_config()).await.unwrap();
        assert_eq!(store.backend(), "local");
    }

    #[tokio::test]
    async fn test_unreachable_redis_fails_startup() {
        let mut config = quiet_config();
        config.cache.backend = StoreBackend::Redis;
        config.redis = RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            command_timeout_ms: 200,
            ..RedisConfig::default()
        };
        let err = create_store(&config).await.err().unwrap();
        assert!(err.is_store_failure());
    }

    #[tokio::test]
    async fn test_build_and_shutdown() {
        let app = AppBuilder::new().with_config(quiet_config()).build().await.unwrap();
        assert_eq!(app.store().backend(), "local");
        assert_eq!(app.repository().reads(), 0);
        app.shutdown().await;
    }
}
