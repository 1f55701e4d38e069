use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::error::{Result, WebhookError};
use crate::utils::get_env_with_prefix;
use crate::webhooks::SourceAllowlist;

/// Main configuration for the webhook service
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum request body size in bytes (default: 1MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

/// Signature protocol and admission settings
#[derive(Debug, Deserialize, Serialize)]
pub struct WebhookConfig {
    /// HMAC key shared with the payment provider. Never serialized.
    #[serde(skip)]
    pub secret_key: Option<SecretString>,

    /// Addresses allowed to call `/webhook`
    #[serde(default = "default_allowed_ips")]
    pub allowed_ips: Vec<IpAddr>,

    /// Header carrying the hex signature
    #[serde(default = "default_signature_header")]
    pub signature_header: String,

    /// Maximum accepted payload age
    #[serde(default = "default_replay_tolerance_seconds")]
    pub replay_tolerance_seconds: u64,

    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    ///
    /// **SECURITY WARNING**: only enable behind a reverse proxy that
    /// overwrites these headers. Otherwise any caller can claim an
    /// allowlisted address.
    #[serde(default)]
    pub trust_proxy: bool,

    /// Mount `POST /generate-signature`.
    ///
    /// The endpoint signs anything it is given with the shared key and has
    /// no authentication of its own. Keep it on an internal network or turn
    /// it off.
    #[serde(default = "default_signing_endpoint_enabled")]
    pub signing_endpoint_enabled: bool,

    /// Capacity of the post-acceptance dispatch queue
    #[serde(default = "default_dispatch_queue_capacity")]
    pub dispatch_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            allowed_ips: default_allowed_ips(),
            signature_header: default_signature_header(),
            replay_tolerance_seconds: default_replay_tolerance_seconds(),
            trust_proxy: false,
            signing_endpoint_enabled: default_signing_endpoint_enabled(),
            dispatch_queue_capacity: default_dispatch_queue_capacity(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_allowed_ips() -> Vec<IpAddr> {
    SourceAllowlist::loopback().iter().copied().collect()
}

fn default_signature_header() -> String {
    "yaya-signature".to_string()
}

fn default_replay_tolerance_seconds() -> u64 {
    300
}

fn default_signing_endpoint_enabled() -> bool {
    true
}

fn default_dispatch_queue_capacity() -> usize {
    1024
}

impl ServerConfig {
    pub fn addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl WebhookConfig {
    pub fn allowlist(&self) -> SourceAllowlist {
        SourceAllowlist::new(self.allowed_ips.iter().copied())
    }

    pub fn replay_tolerance(&self) -> Duration {
        Duration::from_secs(self.replay_tolerance_seconds)
    }

    /// Raw key bytes, or a configuration error if no key is set
    pub fn secret_bytes(&self) -> Result<&[u8]> {
        self.secret_key
            .as_ref()
            .map(|key| key.expose_secret().as_bytes())
            .ok_or_else(|| WebhookError::config("SECRET_KEY is required"))
    }
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
    errors: Vec<String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            errors: Vec::new(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.config.server.max_body_size = max_body_size;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_secret_key(mut self, key: impl Into<String>) -> Self {
        self.config.webhook.secret_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_allowed_ips(mut self, ips: impl IntoIterator<Item = IpAddr>) -> Self {
        self.config.webhook.allowed_ips = ips.into_iter().collect();
        self
    }

    pub fn with_signature_header(mut self, header: impl Into<String>) -> Self {
        self.config.webhook.signature_header = header.into();
        self
    }

    pub fn with_replay_tolerance_seconds(mut self, seconds: u64) -> Self {
        self.config.webhook.replay_tolerance_seconds = seconds;
        self
    }

    pub fn with_trust_proxy(mut self, enabled: bool) -> Self {
        self.config.webhook.trust_proxy = enabled;
        self
    }

    pub fn with_signing_endpoint(mut self, enabled: bool) -> Self {
        self.config.webhook.signing_endpoint_enabled = enabled;
        self
    }

    pub fn with_dispatch_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.webhook.dispatch_queue_capacity = capacity;
        self
    }

    /// Load configuration from environment variables with YAYA_ prefix
    ///
    /// Every key is looked up as `YAYA_<KEY>` first, then `<KEY>`, so plain
    /// `SECRET_KEY` and `PORT` work as they would on most hosting platforms.
    /// Unparseable values are reported by [`build`](Self::build).
    pub fn from_env(mut self) -> Self {
        if let Some(key) = get_env_with_prefix("SECRET_KEY") {
            self.config.webhook.secret_key = Some(SecretString::from(key));
        }
        if let Some(host) = get_env_with_prefix("HOST") {
            self.config.server.host = host;
        }
        if let Some(port) = self.parsed("PORT") {
            self.config.server.port = port;
        }
        if let Some(size) = self.parsed("MAX_BODY_SIZE") {
            self.config.server.max_body_size = size;
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = self.parsed("LOG_JSON") {
            self.config.logging.json = json;
        }
        if let Some(list) = get_env_with_prefix("ALLOWED_IPS") {
            match list.parse::<SourceAllowlist>() {
                Ok(allowlist) => {
                    self.config.webhook.allowed_ips = allowlist.iter().copied().collect()
                }
                Err(e) => self.errors.push(e.to_string()),
            }
        }
        if let Some(header) = get_env_with_prefix("SIGNATURE_HEADER") {
            self.config.webhook.signature_header = header;
        }
        if let Some(seconds) = self.parsed("REPLAY_TOLERANCE_SECONDS") {
            self.config.webhook.replay_tolerance_seconds = seconds;
        }
        if let Some(trust) = self.parsed("TRUST_PROXY") {
            self.config.webhook.trust_proxy = trust;
        }
        if let Some(enabled) = self.parsed("SIGNING_ENDPOINT_ENABLED") {
            self.config.webhook.signing_endpoint_enabled = enabled;
        }
        if let Some(capacity) = self.parsed("DISPATCH_QUEUE_CAPACITY") {
            self.config.webhook.dispatch_queue_capacity = capacity;
        }

        self
    }

    fn parsed<T>(&mut self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = get_env_with_prefix(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.push(format!("Invalid {}='{}': {}", key, raw, e));
                None
            }
        }
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Config`] if:
    /// - an environment value failed to parse
    /// - no secret key is set, or it is empty
    /// - the server address, port, body size or log level is invalid
    /// - the allowlist is empty
    /// - the replay tolerance or queue capacity is zero
    /// - the signature header is not a valid header name
    pub fn build(self) -> Result<Config> {
        if let Some(first) = self.errors.into_iter().next() {
            return Err(WebhookError::config(first));
        }

        let config = self.config;

        match config.webhook.secret_key.as_ref() {
            None => return Err(WebhookError::config("SECRET_KEY is required")),
            Some(key) if key.expose_secret().is_empty() => {
                return Err(WebhookError::config("SECRET_KEY must not be empty"));
            }
            Some(_) => {}
        }

        config.server.addr().map_err(|e| {
            WebhookError::config(format!(
                "Invalid server address {}:{} - {}",
                config.server.host, config.server.port, e
            ))
        })?;

        if config.server.port == 0 {
            return Err(WebhookError::config("Server port must be greater than 0"));
        }

        if config.server.max_body_size == 0 {
            return Err(WebhookError::config("Maximum body size must be greater than 0"));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(WebhookError::config(format!(
                "Invalid log level: {}. Must be one of: {}",
                config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if config.webhook.allowed_ips.is_empty() {
            return Err(WebhookError::config("ALLOWED_IPS must list at least one address"));
        }

        if config.webhook.replay_tolerance_seconds == 0 {
            return Err(WebhookError::config(
                "Replay tolerance must be greater than 0 seconds",
            ));
        }

        if config.webhook.dispatch_queue_capacity == 0 {
            return Err(WebhookError::config(
                "Dispatch queue capacity must be greater than 0",
            ));
        }

        axum::http::HeaderName::try_from(config.webhook.signature_header.as_str()).map_err(|_| {
            WebhookError::config(format!(
                "Invalid signature header name: {}",
                config.webhook.signature_header
            ))
        })?;

        Ok(config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
