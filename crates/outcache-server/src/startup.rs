//! Server startup utilities.

use outcache_config::AppConfig;
use tracing::info;

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
   ____        __                   __
  / __ \__  __/ /__________ ______/ /_  ___
 / / / / / / / __/ ___/ __ `/ ___/ __ \/ _ \
/ /_/ / /_/ / /_/ /__/ /_/ / /__/ / / /  __/
\____/\__,_/\__/\___/\__,_/\___/_/ /_/\___/
    "#);
}

/// Prints server startup information.
pub fn print_startup_info(config: &AppConfig, backend: &str) {
    let addr = config.server.addr();
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Widgets:   http://{}/widgets", addr);
    info!("Health:    http://{}/health", addr);
    if config.observability.metrics_enabled {
        info!("Metrics:   http://{}{}", addr, config.observability.metrics_path);
    }
    info!("Store:     {}", backend);
    info!("{}", separator);
}
