//! Configuration management for the kurator worker
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::llm::LlmConfig;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Autoposting engine configuration
    pub autoposting: AutopostingSettings,

    /// Telegram fetcher configuration
    pub telegram: TelegramSettings,

    /// LLM endpoint configuration
    pub llm: LlmConfig,

    /// Draft generation configuration
    pub generation: GenerationSettings,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Engine cadence and candidate limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutopostingSettings {
    /// Seconds to sleep between full scheduler cycles
    pub cycle_interval_secs: u64,

    /// Seconds to sleep after a cycle-level failure before retrying
    pub error_backoff_secs: u64,

    /// Maximum number of recent posts fetched per channel
    pub fetch_limit: usize,

    /// Maximum accepted candidates per channel per cycle
    pub per_channel_cap: usize,

    /// Recency window as a multiple of a config's period. The window is
    /// deliberately wider than the due cadence so posts published between
    /// cycles are not lost.
    pub lookback_factor: i64,
}

/// Telegram preview-page fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSettings {
    /// Base URL of the public preview host
    pub base_url: String,

    /// Rate limit (requests per second)
    pub rate_limit: f64,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum retries per fetch
    pub max_retries: u32,

    /// User agent string
    pub user_agent: String,
}

/// Draft generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Image service endpoint, used for configs that require an image
    pub image_endpoint: String,

    /// Request timeout in seconds for the image service
    pub image_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub postgres_url: String,

    /// Maximum pool size
    pub pool_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let cycle_interval_secs = std::env::var("KURATOR_CYCLE_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1800);

        let error_backoff_secs = std::env::var("KURATOR_ERROR_BACKOFF_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        let fetch_limit = std::env::var("KURATOR_FETCH_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(100);

        let telegram_base_url = std::env::var("KURATOR_TELEGRAM_BASE_URL")
            .unwrap_or_else(|_| String::from("https://t.me"));

        let rate_limit = std::env::var("KURATOR_TELEGRAM_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(2.0);

        let request_timeout_secs = std::env::var("KURATOR_TELEGRAM_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let user_agent = std::env::var("KURATOR_USER_AGENT")
            .unwrap_or_else(|_| format!("kurator/{}", env!("CARGO_PKG_VERSION")));

        let image_endpoint = std::env::var("KURATOR_IMAGE_ENDPOINT")
            .unwrap_or_else(|_| String::from("http://localhost:8188"));

        let postgres_url = std::env::var("POSTGRES_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .unwrap_or_else(|_| String::from("postgresql://localhost/kurator"));

        let log_level = std::env::var("KURATOR_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format =
            std::env::var("KURATOR_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            autoposting: AutopostingSettings {
                cycle_interval_secs,
                error_backoff_secs,
                fetch_limit,
                per_channel_cap: 3,
                lookback_factor: 3,
            },
            telegram: TelegramSettings {
                base_url: telegram_base_url,
                rate_limit,
                request_timeout_secs,
                max_retries: 3,
                user_agent,
            },
            llm: LlmConfig::from_env(),
            generation: GenerationSettings {
                image_endpoint,
                image_timeout_secs: 120,
            },
            database: DatabaseConfig {
                postgres_url,
                pool_size: 10,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.autoposting.cycle_interval_secs == 0 {
            anyhow::bail!("cycle_interval_secs must be greater than 0");
        }

        if self.autoposting.fetch_limit == 0 {
            anyhow::bail!("fetch_limit must be greater than 0");
        }

        if self.autoposting.per_channel_cap == 0 {
            anyhow::bail!("per_channel_cap must be greater than 0");
        }

        if self.autoposting.lookback_factor < 1 {
            anyhow::bail!("lookback_factor must be at least 1");
        }

        if self.telegram.rate_limit <= 0.0 {
            anyhow::bail!("rate_limit must be positive");
        }

        if self.database.pool_size == 0 {
            anyhow::bail!("pool_size must be greater than 0");
        }

        for (name, value) in [
            ("telegram.base_url", &self.telegram.base_url),
            ("llm.endpoint", &self.llm.endpoint),
            ("generation.image_endpoint", &self.generation.image_endpoint),
        ] {
            Url::parse(value).with_context(|| format!("{name} is not a valid URL: {value}"))?;
        }

        Ok(())
    }

    /// Get scheduler cycle interval as Duration
    #[must_use]
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.autoposting.cycle_interval_secs)
    }

    /// Get scheduler error backoff as Duration
    #[must_use]
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.autoposting.error_backoff_secs)
    }

    /// Get Telegram request timeout as Duration
    #[must_use]
    pub fn telegram_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            autoposting: AutopostingSettings {
                cycle_interval_secs: 1800,
                error_backoff_secs: 60,
                fetch_limit: 100,
                per_channel_cap: 3,
                lookback_factor: 3,
            },
            telegram: TelegramSettings {
                base_url: String::from("https://t.me"),
                rate_limit: 2.0,
                request_timeout_secs: 30,
                max_retries: 3,
                user_agent: format!("kurator/{}", env!("CARGO_PKG_VERSION")),
            },
            llm: LlmConfig::default(),
            generation: GenerationSettings {
                image_endpoint: String::from("http://localhost:8188"),
                image_timeout_secs: 120,
            },
            database: DatabaseConfig {
                postgres_url: String::from("postgresql://localhost/kurator"),
                pool_size: 10,
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}
