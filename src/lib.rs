//! YaYa Wallet webhook receiver
//!
//! Verifies and accepts payment notifications from YaYa Wallet, and signs
//! payloads with the same scheme for testing integrations.
//!
//! A webhook is accepted only if it:
//!
//! - comes from an allowlisted source address
//! - carries the signature header
//! - has all required payload fields with the right types
//! - is no older than the replay window
//! - is signed with HMAC-SHA256 over the canonical field concatenation
//!
//! Accepted payloads are handed to a [`WebhookHandler`] on a background
//! worker after the response is sent.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use yaya_webhook::{App, ConfigBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     yaya_webhook::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     App::with_config(config)?.serve().await?;
//!     Ok(())
//! }
//! ```

mod app;
mod config;
mod core;
mod error;
pub mod health;
mod http;
mod middleware;
pub mod testing;
mod utils;
pub mod webhooks;

// Re-exports for public API
pub use app::AppContext;
pub use config::{Config, ConfigBuilder, LoggingConfig, ServerConfig, WebhookConfig};
pub use crate::core::{App, AppBuilder};
pub use error::{Result, WebhookError};
pub use health::{ComponentHealth, HealthResponse, HealthStatus};
pub use http::{ClientIp, RouteModule, SignatureResponse, WebhookModule};
pub use webhooks::{
    Dispatcher, LoggingHandler, RequestGate, SignatureEngine, SourceAllowlist, ValidatedPayload,
    ValidationError, WebhookHandler, WebhookPayload,
};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "yaya_webhook=debug")
/// - `YAYA_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("YAYA_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    install_subscriber(env_filter, json_logs);
}

/// Initialize tracing from the logging section of a [`Config`]
///
/// `RUST_LOG` still wins when set, so per-module filters keep working.
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    install_subscriber(env_filter, config.logging.json);
}

fn install_subscriber(env_filter: EnvFilter, json: bool) {
    // try_init: a subscriber may already be installed (tests, embedding apps)
    if json {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init();
    }
}
