//! Service configuration.

use std::env;

use config::builder::{ConfigBuilder, DefaultState};
use config::{Config as ConfigLoader, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use user_sync_common::DEFAULT_TOLERANCE_SECS;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port (default: 7000)
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite location: `sqlite:<path>`, a bare path, or `:memory:`.
    /// Without one the store stays disconnected.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Signing secret (`whsec_...`). Without one every delivery is rejected.
    #[serde(default)]
    pub secret: Option<String>,
    /// Accepted clock skew for the signature timestamp.
    #[serde(default = "default_tolerance")]
    pub tolerance_secs: i64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            tolerance_secs: default_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: DatabaseConfig::default(),
            webhook: WebhookConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// An environment variable that is set to something other than blanks.
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    7000
}
fn default_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. `PORT`, `DATABASE_URL` and `CLERK_WEBHOOK_SECRET_KEY`
    /// 2. Environment variables (USER_SYNC__SECTION__KEY format)
    /// 3. config.toml file (if present)
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("USER_SYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("port", non_empty_var("PORT"))?
            .set_override_option("database.url", non_empty_var("DATABASE_URL"))?
            .set_override_option("webhook.secret", non_empty_var("CLERK_WEBHOOK_SECRET_KEY"))?
            .build()?
            .try_deserialize()
            .map(Self::without_empty_values)
    }

    /// Load configuration from a TOML document, ignoring the environment.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map(Self::without_empty_values)
    }

    /// Blank database URL or secret values count as unset.
    fn without_empty_values(mut self) -> Self {
        self.database.url = self.database.url.filter(|url| !url.trim().is_empty());
        self.webhook.secret = self.webhook.secret.filter(|secret| !secret.trim().is_empty());
        self
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        ConfigLoader::builder()
            .set_default("host", default_host())?
            .set_default("port", default_port() as i64)?
            .set_default("webhook.tolerance_secs", default_tolerance())?
            .set_default("logging.level", default_log_level())
    }
}
