//! Server configuration
//!
//! Layered loading: optional TOML file, then environment variables with the
//! `MARKETPAY` prefix (`MARKETPAY__SERVER__PORT=8080` style), then CLI
//! overrides applied in `main`.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub settlement: SettlementSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server binding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// The socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Payment provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base URL of the provider's REST API
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// Bearer key for the provider's status API
    #[serde(default)]
    pub api_key: String,

    /// Shared secret the provider signs webhook bodies with
    #[serde(default = "default_webhook_secret")]
    pub webhook_secret: String,

    /// Wait between status polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Poll attempts before reporting a timeout
    #[serde(default = "default_poll_attempts")]
    pub poll_max_attempts: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            api_key: String::new(),
            webhook_secret: default_webhook_secret(),
            poll_interval_secs: default_poll_interval(),
            poll_max_attempts: default_poll_attempts(),
        }
    }
}

impl ProviderSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Settlement behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSettings {
    /// Shared key for admin dispute endpoints (`x-admin-key`)
    #[serde(default = "default_admin_key")]
    pub admin_key: String,

    /// Seconds between auto-release sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for SettlementSettings {
    fn default() -> Self {
        Self {
            admin_key: default_admin_key(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl SettlementSettings {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_provider_base_url() -> String {
    "https://api.monipay.example".to_string()
}

fn default_webhook_secret() -> String {
    "change-me-in-production".to_string()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_poll_attempts() -> u32 {
    30
}

fn default_admin_key() -> String {
    "change-me-in-production".to_string()
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl ServerConfig {
    /// Load configuration from environment and an optional config file
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("MARKETPAY")
                    .separator("__")
                    .try_parsing(true),
            );

        Ok(builder.build()?.try_deserialize()?)
    }
}
