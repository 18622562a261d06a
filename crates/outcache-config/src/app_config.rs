//! Application configuration structures.

use outcache_core::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Output cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Redis configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "outcache".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server host.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Enable CORS.
    pub cors_enabled: bool,
    /// CORS allowed origins.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    /// Returns the HTTP server address.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the request timeout as a Duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Storage backend holding cached responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map, private to one server instance.
    #[default]
    Local,
    /// Redis, shared between instances.
    Redis,
}

impl StoreBackend {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Redis => "redis",
        }
    }
}

/// Output cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Which store holds cached responses.
    pub backend: StoreBackend,
    /// Maximum number of entries in the local store.
    pub local_max_entries: usize,
    /// Interval between sweeps of expired local entries, in seconds.
    pub sweep_interval_secs: u64,
    /// Media type used when `Accept` names nothing supported.
    pub default_media_type: String,
    /// Media types a request may select through `Accept`.
    pub supported_media_types: Vec<String>,
    /// Largest response body that is captured, in bytes.
    pub max_body_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Local,
            local_max_entries: 10_000,
            sweep_interval_secs: 60,
            default_media_type: "application/json".to_string(),
            supported_media_types: vec![
                "application/json".to_string(),
                "text/json".to_string(),
                "application/xml".to_string(),
                "text/xml".to_string(),
                "text/html".to_string(),
                "text/plain".to_string(),
            ],
            max_body_bytes: 4 * 1024 * 1024, // 4MB
        }
    }
}

impl CacheConfig {
    /// Returns the sweep interval as a Duration.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Redis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis URL.
    pub url: String,
    /// Connection pool size.
    pub pool_size: u32,
    /// Deadline for a single store call, in milliseconds.
    pub command_timeout_ms: u64,
    /// Compress cached payloads with LZ4.
    pub compression_enabled: bool,
    /// LZ4 high-compression level.
    pub compression_level: i32,
    /// Payloads smaller than this are stored raw.
    pub compression_min_size: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            command_timeout_ms: 500,
            compression_enabled: true,
            compression_level: 4,
            compression_min_size: 256,
        }
    }
}

impl RedisConfig {
    /// Returns the command timeout as a Duration.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or full filter directives.
    pub log_level: String,
    /// Log format.
    pub log_format: LogFormat,
    /// Enable metrics.
    pub metrics_enabled: bool,
    /// Metrics endpoint path.
    pub metrics_path: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_path: "/metrics".to_string(),
        }
    }
}
