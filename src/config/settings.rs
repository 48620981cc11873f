//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8003
}

/// Upstream image generation API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_generate_model")]
    pub generate_model: String,
    #[serde(default = "default_edit_model")]
    pub edit_model: String,
    #[serde(default = "default_single_timeout")]
    pub single_timeout_secs: u64,
    #[serde(default = "default_sequential_timeout")]
    pub sequential_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://ark.ap-southeast.bytepluses.com/api/v3".to_string()
}

fn default_generate_model() -> String {
    "seedream-4-0-250828".to_string()
}

fn default_edit_model() -> String {
    "seededit-3-0-i2i-250628".to_string()
}

fn default_single_timeout() -> u64 {
    120
}

fn default_sequential_timeout() -> u64 {
    300
}

fn default_connect_timeout() -> u64 {
    10
}

impl UpstreamConfig {
    /// Timeout for a call that produces a single image
    pub fn single_timeout(&self) -> Duration {
        Duration::from_secs(self.single_timeout_secs)
    }

    /// Timeout for sequential (multi-image) generation, which is much slower upstream
    pub fn sequential_timeout(&self) -> Duration {
        Duration::from_secs(self.sequential_timeout_secs)
    }

    pub fn timeout_for(&self, sequential: bool) -> Duration {
        if sequential {
            self.sequential_timeout()
        } else {
            self.single_timeout()
        }
    }
}

/// Inbound API key configuration. No keys means the gateway is open.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("upstream.base_url", default_base_url())?
            .set_default("upstream.api_key", "")?
            .set_default("upstream.generate_model", default_generate_model())?
            .set_default("upstream.edit_model", default_edit_model())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?;

        // Variable names used by earlier deployments
        if let Ok(key) = std::env::var("ARK_API_KEY") {
            builder = builder.set_default("upstream.api_key", key)?;
        }
        if let Ok(model) = std::env::var("SEEDREAM_MODEL_ID") {
            builder = builder.set_default("upstream.generate_model", model)?;
        }

        let config = builder
            .add_source(File::with_name(path.as_ref().to_str().unwrap_or("config/default")).required(false))
            // Override with environment variables (prefixed with IMAGE_GATEWAY)
            .add_source(
                Environment::with_prefix("IMAGE_GATEWAY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.api_keys")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if self.upstream.base_url.trim().is_empty() {
            return Err(invalid("Upstream base URL cannot be empty"));
        }

        if self.upstream.single_timeout_secs == 0
            || self.upstream.sequential_timeout_secs == 0
            || self.upstream.connect_timeout_secs == 0
        {
            return Err(invalid("Upstream timeouts must be greater than 0"));
        }

        if self.upstream.sequential_timeout_secs < self.upstream.single_timeout_secs {
            return Err(invalid(
                "Sequential timeout must not be shorter than the single-image timeout",
            ));
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(invalid(&format!(
                "Invalid logging format '{}'. Must be 'json' or 'pretty'",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Endpoint used for every generation call
    pub fn generations_url(&self) -> String {
        format!(
            "{}/images/generations",
            self.upstream.base_url.trim_end_matches('/')
        )
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Config(config::ConfigError::Message(message.to_string()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            upstream: UpstreamConfig {
                base_url: default_base_url(),
                api_key: String::new(),
                generate_model: default_generate_model(),
                edit_model: default_edit_model(),
                single_timeout_secs: default_single_timeout(),
                sequential_timeout_secs: default_sequential_timeout(),
                connect_timeout_secs: default_connect_timeout(),
            },
            auth: AuthConfig::default(),
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
