//! Configuration loader with layered sources.

use crate::{AppConfig, StoreBackend};
use config::{Config, ConfigError, Environment, File};
use outcache_core::{OutcacheError, OutcacheResult};
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment variable selecting the environment-specific config file.
pub const ENVIRONMENT_VAR: &str = "OUTCACHE_ENVIRONMENT";

/// Prefix of environment variable overrides, e.g. `OUTCACHE__CACHE__BACKEND`.
pub const ENV_PREFIX: &str = "OUTCACHE";

/// Loads and validates the layered configuration.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: AppConfig,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with `OUTCACHE__` prefix
    pub fn new(config_dir: impl Into<String>) -> OutcacheResult<Self> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string());
        Self::for_environment(config_dir, environment)
    }

    /// Creates a loader for an explicit environment name.
    pub fn for_environment(
        config_dir: impl Into<String>,
        environment: impl Into<String>,
    ) -> OutcacheResult<Self> {
        let config = Self::load_config(&config_dir.into(), &environment.into())?;
        Ok(Self { config })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> OutcacheResult<Self> {
        Self::new("./config")
    }

    /// Returns the loaded configuration.
    #[must_use]
    pub fn get(&self) -> AppConfig {
        self.config.clone()
    }

    /// Loads configuration from the specified directory.
    fn load_config(config_dir: &str, environment: &str) -> OutcacheResult<AppConfig> {
        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        // 1. Load default configuration
        let default_path = format!("{}/default.toml", config_dir);
        if Path::new(&default_path).exists() {
            debug!("Loading default config from: {}", default_path);
            builder = builder.add_source(File::with_name(&default_path).required(false));
        }

        // 2. Load environment-specific configuration
        let env_path = format!("{}/{}.toml", config_dir, environment);
        if Path::new(&env_path).exists() {
            debug!("Loading environment config from: {}", env_path);
            builder = builder.add_source(File::with_name(&env_path).required(false));
        }

        // 3. Load local overrides (not committed to version control)
        let local_path = format!("{}/local.toml", config_dir);
        if Path::new(&local_path).exists() {
            debug!("Loading local config from: {}", local_path);
            builder = builder.add_source(File::with_name(&local_path).required(false));
        }

        // 4. Override with environment variables
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error)?;
        let mut app_config: AppConfig = config.try_deserialize().map_err(config_error)?;
        app_config.app.environment = environment.to_string();

        validate_config(&app_config)?;

        Ok(app_config)
    }
}

/// Validates the configuration.
pub fn validate_config(config: &AppConfig) -> OutcacheResult<()> {
    let cache = &config.cache;
    if cache.default_media_type.trim().is_empty() {
        return Err(OutcacheError::configuration("cache.default_media_type is required"));
    }
    if cache.max_body_bytes == 0 {
        return Err(OutcacheError::configuration("cache.max_body_bytes must be positive"));
    }
    if cache.backend == StoreBackend::Local {
        if cache.local_max_entries == 0 {
            return Err(OutcacheError::configuration("cache.local_max_entries must be positive"));
        }
        if cache.sweep_interval_secs == 0 {
            return Err(OutcacheError::configuration("cache.sweep_interval_secs must be positive"));
        }
    }

    if cache.backend == StoreBackend::Redis {
        let redis = &config.redis;
        let url = url::Url::parse(&redis.url)
            .map_err(|e| OutcacheError::configuration(format!("Invalid Redis URL: {}", e)))?;
        if !matches!(url.scheme(), "redis" | "rediss" | "redis+unix" | "unix") {
            return Err(OutcacheError::configuration(format!(
                "Unsupported Redis URL scheme: {}",
                url.scheme()
            )));
        }
        if redis.pool_size == 0 {
            return Err(OutcacheError::configuration("redis.pool_size must be positive"));
        }
        if redis.command_timeout_ms == 0 {
            return Err(OutcacheError::configuration("redis.command_timeout_ms must be positive"));
        }
        if !(1..=12).contains(&redis.compression_level) {
            return Err(OutcacheError::configuration(
                "redis.compression_level must be between 1 and 12",
            ));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && !observability.metrics_path.starts_with('/') {
        return Err(OutcacheError::configuration("observability.metrics_path must start with '/'"));
    }

    if config.app.environment == "production" && cache.backend == StoreBackend::Local {
        warn!("Local output cache in production: cached responses are not shared between instances");
    }

    Ok(())
}

fn config_error(err: ConfigError) -> OutcacheError {
    OutcacheError::Configuration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use outcache_core::logging::LogFormat;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    fn dir_path(dir: &TempDir) -> String {
        dir.path().to_string_lossy().into_owned()
    }

    #[test]
    fn test_empty_directory_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::for_environment(dir_path(&dir), "test").unwrap();
        let config = loader.get();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.backend, StoreBackend::Local);
        assert_eq!(config.app.environment, "test");
    }

    #[test]
    fn test_layers_override_in_order() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "default.toml",
            r#"
            [server]
            port = 3000

            [cache]
            local_max_entries = 50
            default_media_type = "text/plain"
            "#,
        );
        write(
            &dir,
            "staging.toml",
            r#"
            [cache]
            local_max_entries = 75

            [observability]
            log_format = "json"
            "#,
        );
        write(
            &dir,
            "local.toml",
            r#"
            [server]
            port = 4000
            "#,
        );

        let loader = ConfigLoader::for_environment(dir_path(&dir), "staging").unwrap();
        let config = loader.get();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.cache.local_max_entries, 75);
        assert_eq!(config.cache.default_media_type, "text/plain");
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_redis_url_rejected() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "default.toml",
            "[cache]\nbackend = \"redis\"\n\n[redis]\nurl = \"http://localhost\"\n",
        );
        let result = ConfigLoader::for_environment(dir_path(&dir), "test");
        assert!(matches!(result, Err(OutcacheError::Configuration(_))));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "default.toml", "[cache]\nbackend = \"memcached\"\n");
        assert!(ConfigLoader::for_environment(dir_path(&dir), "test").is_err());
    }

    #[test]
    fn test_validate_config() {
        let mut config = AppConfig::default();
        assert!(validate_config(&config).is_ok());

        config.cache.local_max_entries = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.cache.backend = StoreBackend::Redis;
        config.redis.compression_level = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.observability.metrics_path = "metrics".to_string();
        assert!(validate_config(&config).is_err());
    }
}
