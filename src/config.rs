use std::env;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub fetcher: FetcherConfig,
    pub scheduler: SchedulerConfig,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database holding products and price history.
    pub database_url: String,
    /// JSON file with the user's product set, merged at startup.
    pub products_file: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    pub request_timeout: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub max_redirects: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub poll_interval_secs: u64,
    pub max_concurrent_checks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
    pub username: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("store.database_url", "sqlite://data/fiyat.db")?
            .set_default("store.products_file", "config.json")?
            .set_default("store.max_connections", 5)?
            .set_default("fetcher.request_timeout", 10)?
            .set_default("fetcher.retry_attempts", 2)?
            .set_default("fetcher.retry_delay_ms", 500)?
            .set_default("fetcher.max_redirects", 5)?
            .set_default("fetcher.user_agent", "fiyat-watcher/0.1")?
            .set_default("scheduler.poll_interval_secs", 300)?
            .set_default("scheduler.max_concurrent_checks", 4)?
            .set_default("notifications.discord.webhook_url", None::<String>)?
            .set_default("notifications.discord.username", "Fiyat Watcher")?
            // Optional config files layered over the defaults
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Environment variables with prefix "FIYAT_"
            .add_source(Environment::with_prefix("FIYAT").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.max_connections == 0 {
            return Err(ConfigError::Message(
                "store.max_connections must be greater than 0".into(),
            ));
        }
        if self.fetcher.request_timeout == 0 {
            return Err(ConfigError::Message(
                "fetcher.request_timeout must be greater than 0".into(),
            ));
        }
        if self.scheduler.poll_interval_secs == 0 {
            return Err(ConfigError::Message(
                "scheduler.poll_interval_secs must be greater than 0".into(),
            ));
        }
        if self.scheduler.max_concurrent_checks == 0 {
            return Err(ConfigError::Message(
                "scheduler.max_concurrent_checks must be greater than 0".into(),
            ));
        }
        if let Some(url) = &self.notifications.discord.webhook_url {
            if !url.starts_with("https://discord.com/api/webhooks/") {
                return Err(ConfigError::Message(
                    "notifications.discord.webhook_url is not a Discord webhook URL".into(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            fetcher: FetcherConfig::default(),
            scheduler: SchedulerConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/fiyat.db".to_string(),
            products_file: "config.json".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: 10,
            retry_attempts: 2,
            retry_delay_ms: 500,
            max_redirects: 5,
            user_agent: "fiyat-watcher/0.1".to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            max_concurrent_checks: 4,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig {
                webhook_url: None,
                username: "Fiyat Watcher".to_string(),
            },
        }
    }
}

/// The user-facing product set, `{"products": [{"url", "threshold"}]}`.
/// This file is the durable source of truth for which products exist; the
/// engine reloads it at startup and merges it with the history database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductsFile {
    #[serde(default)]
    pub products: Vec<ProductEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductEntry {
    pub url: String,
    pub threshold: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ProductsFile {
    /// A missing file is an empty product set, not an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "products file not found, starting empty");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(std::io::Error::other)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let raw = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, raw)
    }
}
