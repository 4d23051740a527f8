use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the NHL web API
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum retry attempts for a transient failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    15_000
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff delay before retry number `attempt` (0-based), capped.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let delay = self
            .base_backoff_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(delay.min(self.max_backoff_ms))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Concurrent record reconciliations within one operation
    #[serde(default = "default_worker_permits")]
    pub worker_permits: usize,
    /// Hours between scheduled full syncs
    #[serde(default = "default_update_interval_hours")]
    pub update_interval_hours: u64,
}

fn default_worker_permits() -> usize {
    4
}

fn default_update_interval_hours() -> u64 {
    24
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            worker_permits: default_worker_permits(),
            update_interval_hours: default_update_interval_hours(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("database.path", "nhl_stats.db")?
            .set_default("database.max_connections", 5)?
            .set_default("remote.base_url", "https://api-web.nhle.com/v1")?
            .set_default("remote.timeout_secs", 30)?
            .set_default("remote.max_retries", 3)?
            .set_default("remote.base_backoff_ms", 500)?
            .set_default("remote.max_backoff_ms", 15_000)?
            .set_default("sync.worker_permits", 4)?
            .set_default("sync.update_interval_hours", 24)?
            .set_default("logging.level", "info")?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PUCKSYNC_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (PUCKSYNC_DATABASE__PATH, etc.)
            .add_source(
                Environment::with_prefix("PUCKSYNC")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database.path.is_empty() {
            errors.push("database.path must not be empty".to_string());
        }

        if url::Url::parse(&self.remote.base_url).is_err() {
            errors.push(format!(
                "remote.base_url is not a valid URL: {}",
                self.remote.base_url
            ));
        }

        if self.remote.timeout_secs == 0 {
            errors.push("remote.timeout_secs must be positive".to_string());
        }

        if self.remote.base_backoff_ms > self.remote.max_backoff_ms {
            errors.push("remote.base_backoff_ms must not exceed max_backoff_ms".to_string());
        }

        if self.sync.worker_permits == 0 {
            errors.push("sync.worker_permits must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "nhl_stats.db".to_string(),
                max_connections: default_max_connections(),
            },
            remote: RemoteConfig {
                base_url: "https://api-web.nhle.com/v1".to_string(),
                timeout_secs: default_timeout_secs(),
                max_retries: default_max_retries(),
                base_backoff_ms: default_base_backoff_ms(),
                max_backoff_ms: default_max_backoff_ms(),
            },
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_schedule_doubles_and_caps() {
        let remote = RemoteConfig {
            base_url: "https://api-web.nhle.com/v1".to_string(),
            timeout_secs: 30,
            max_retries: 5,
            base_backoff_ms: 500,
            max_backoff_ms: 3_000,
        };

        assert_eq!(remote.backoff_duration(0), Duration::from_millis(500));
        assert_eq!(remote.backoff_duration(1), Duration::from_millis(1_000));
        assert_eq!(remote.backoff_duration(2), Duration::from_millis(2_000));
        // Capped at max
        assert_eq!(remote.backoff_duration(3), Duration::from_millis(3_000));
        assert_eq!(remote.backoff_duration(10), Duration::from_millis(3_000));
    }

    #[test]
    fn default_config_validates() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.remote.base_url = "not a url".to_string();
        cfg.sync.worker_permits = 0;

        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
