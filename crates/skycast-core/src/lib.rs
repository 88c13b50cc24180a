pub mod app;
pub mod config;
pub mod error;
pub mod service;

pub use app::App;
pub use config::{
    Config, GatewayConfig, SearchConfig, StorageConfig, ValidationResult, WeatherConfig,
};
pub use error::{AppError, ConfigError};
pub use service::Service;

use anyhow::Result;

/// Initialize process-wide logging.
///
/// `RUST_LOG` overrides the default `info` filter. Calling this twice is harmless.
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    tracing::info!("Skycast core initialized");
    Ok(())
}
