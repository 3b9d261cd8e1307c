//! Configuration infrastructure
//!
//! Settings are grouped by concern: crawl scope and concurrency, HTTP,
//! report storage, and logging. Missing sections or fields fall back to
//! the values in [`defaults`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::domain::catalog::City;
use crate::domain::constants::site;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Crawl scope and concurrency
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Site root, without trailing slash
    pub domain: String,

    /// City served from the bare domain
    pub root_city: String,

    /// Cities crawled by a run, in launch order
    pub cities: Vec<String>,

    /// Top-level category skipped during discovery (exact trimmed text)
    pub excluded_category: String,

    /// Cities crawled at the same time
    pub city_concurrency: usize,

    /// Product pages fetched at the same time within one listing
    pub product_concurrency: usize,

    /// Pause after a failed fetch, in milliseconds
    pub failure_pause_ms: u64,
}

impl CrawlerConfig {
    pub fn cities(&self) -> Vec<City> {
        self.cities.iter().map(City::new).collect()
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            domain: site::DOMAIN.to_string(),
            root_city: site::ROOT_CITY.to_string(),
            cities: site::CITIES.iter().map(|c| c.to_string()).collect(),
            excluded_category: site::PROMO_CATEGORY.to_string(),
            city_concurrency: defaults::CITY_CONCURRENCY,
            product_concurrency: defaults::PRODUCT_CONCURRENCY,
            failure_pause_ms: defaults::FAILURE_PAUSE_MS,
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
    pub user_agent: String,
    pub accept_language: String,
    pub follow_redirects: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            user_agent: defaults::USER_AGENT.to_string(),
            accept_language: defaults::ACCEPT_LANGUAGE.to_string(),
            follow_redirects: true,
        }
    }
}

/// Report storage layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Reports root, holding `sqlite/` and `json/`
    pub reports_dir: PathBuf,

    /// Appended to the city slug in store and export file names
    pub file_suffix: String,

    /// Aggregate export written to the reports root
    pub aggregate_file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from(defaults::REPORTS_DIR),
            file_suffix: defaults::FILE_SUFFIX.to_string(),
            aggregate_file_name: defaults::AGGREGATE_FILE_NAME.to_string(),
        }
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for log files
    pub log_dir: PathBuf,

    /// Module-specific log level filters (e.g., "sqlx": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: true,
            log_dir: PathBuf::from(defaults::LOG_DIR),
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("sqlx".to_string(), "warn".to_string());
                filters.insert("reqwest".to_string(), "warn".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "warn".to_string());
                filters.insert("santech_crawler".to_string(), "info".to_string());
                filters
            },
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("santech-crawler");

        Ok(config_dir)
    }

    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join("santech_crawler_config.json");
        Ok(Self { config_path })
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                info!("Loaded configuration from: {:?}", self.config_path);
                Ok(config)
            }
            Err(parse_error) => {
                warn!("⚠️  Configuration file could not be parsed: {}", parse_error);
                warn!("⚠️  Resetting to default configuration");

                let backup_path = self.config_path.with_extension("json.corrupted");
                if let Err(e) = fs::copy(&self.config_path, &backup_path).await {
                    warn!("Failed to create backup of corrupted config: {}", e);
                } else {
                    info!("Backed up corrupted config to: {:?}", backup_path);
                }

                let default_config = AppConfig::default();
                self.save_config(&default_config)
                    .await
                    .context("Failed to save default configuration")?;
                Ok(default_config)
            }
        }
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            create_dir_if_missing(parent).await?;
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .with_context(|| format!("Failed to write configuration file: {:?}", self.config_path))?;

        info!("Configuration saved to: {:?}", self.config_path);
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

async fn create_dir_if_missing(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create directory: {:?}", dir))
}

/// Default values
pub mod defaults {
    pub const CITY_CONCURRENCY: usize = 10;
    pub const PRODUCT_CONCURRENCY: usize = 35;
    pub const FAILURE_PAUSE_MS: u64 = 1000;

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
    pub const ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en;q=0.8";

    pub const REPORTS_DIR: &str = "reports";
    pub const FILE_SUFFIX: &str = "santech-ru";
    pub const AGGREGATE_FILE_NAME: &str = "products.json";

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_DIR: &str = "logs";
}
