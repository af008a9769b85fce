use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{ConsoleError, ConsoleErrorType};

// Default configuration values
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_METRICS_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_METRICS_RETRIES: usize = 2;
const DEFAULT_SERVER_PORT: u16 = 9400;
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_SESSION_FILE: &str = "session.json";

/// Main configuration struct for the console
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote services the console talks to
    #[serde(default)]
    pub api: ApiConfig,
    /// Session persistence settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Table defaults shared by every page
    #[serde(default)]
    pub table: TableDefaults,
    /// Local shell API the browser UI connects to
    #[serde(default)]
    pub server: ServerConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the authentication service
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Base URL of the analysis service that serves metrics
    #[serde(default = "default_metrics_base_url")]
    pub metrics_base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Extra attempts for metrics reads that fail on the network
    #[serde(default = "default_metrics_retries")]
    pub metrics_retries: usize,
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Keep the session across restarts (off means purely in-memory)
    #[serde(default = "default_persist")]
    pub persist: bool,
    /// File used when persistence is enabled
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

/// Table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefaults {
    /// Page sizes offered by the paginator
    #[serde(default = "default_page_size_options")]
    pub page_size_options: Vec<usize>,
    /// Page size used when a page first renders
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

/// Local shell API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Loopback port for the shell API
    #[serde(default = "default_server_port")]
    pub port: u16,
}

// Default functions
fn default_api_base_url() -> String {
    std::env::var("LOGVIEW_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
}

fn default_metrics_base_url() -> String {
    std::env::var("LOGVIEW_METRICS_BASE_URL")
        .unwrap_or_else(|_| DEFAULT_METRICS_BASE_URL.to_string())
}

fn default_timeout() -> u64 {
    std::env::var("LOGVIEW_TIMEOUT_SECONDS")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECONDS)
}

fn default_metrics_retries() -> usize {
    std::env::var("LOGVIEW_METRICS_RETRIES")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(DEFAULT_METRICS_RETRIES)
}

fn default_persist() -> bool {
    std::env::var("LOGVIEW_PERSIST_SESSION")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(false)
}

fn default_store_path() -> PathBuf {
    if let Ok(path) = std::env::var("LOGVIEW_SESSION_PATH") {
        return PathBuf::from(path);
    }
    config_dir()
        .map(|dir| dir.join(DEFAULT_SESSION_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE))
}

fn default_page_size_options() -> Vec<usize> {
    vec![5, 10, 20]
}

fn default_page_size() -> usize {
    std::env::var("LOGVIEW_PAGE_SIZE")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
}

fn default_server_port() -> u16 {
    std::env::var("LOGVIEW_PORT")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(DEFAULT_SERVER_PORT)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            session: SessionConfig::default(),
            table: TableDefaults::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            metrics_base_url: default_metrics_base_url(),
            timeout_seconds: default_timeout(),
            metrics_retries: default_metrics_retries(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist: default_persist(),
            store_path: default_store_path(),
        }
    }
}

impl Default for TableDefaults {
    fn default() -> Self {
        Self {
            page_size_options: default_page_size_options(),
            default_page_size: default_page_size(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
        }
    }
}

impl Config {
    /// Reject values the console cannot work with
    pub fn validate(&self) -> Result<()> {
        for (key, url) in [
            ("api.base_url", &self.api.base_url),
            ("api.metrics_base_url", &self.api.metrics_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(key, format!("not an http(s) URL: {}", url)));
            }
        }
        if self.table.default_page_size == 0 {
            return Err(invalid("table.default_page_size", "must be positive"));
        }
        if self.table.page_size_options.iter().any(|size| *size == 0) {
            return Err(invalid("table.page_size_options", "sizes must be positive"));
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> anyhow::Error {
    ConsoleError::from(ConsoleErrorType::ConfigInvalid {
        key: key.to_string(),
        reason: reason.into(),
    })
    .into()
}

/// Manages configuration for the console
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Config>>,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a configuration manager backed by the default config path
    pub async fn new() -> Result<Self> {
        let config_path = get_config_path()?;
        Self::with_path(config_path).await
    }

    /// Create a configuration manager backed by an explicit file
    pub async fn with_path(config_path: PathBuf) -> Result<Self> {
        let config = load_or_create_config(&config_path).await?;
        config.validate()?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a clone of the current configuration
    pub async fn get_config(&self) -> Config {
        self.config.read().await.clone()
    }

    /// Replace the configuration and persist it
    pub async fn update_config(&self, new_config: Config) -> Result<()> {
        new_config.validate()?;
        *self.config.write().await = new_config.clone();
        save_config(&self.config_path, &new_config).await?;
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

/// Directory holding the console's files, if the platform has one
fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("logview360"))
}

/// Get the path to the configuration file
fn get_config_path() -> Result<PathBuf> {
    // Check for explicit config path from environment
    if let Ok(path) = std::env::var("LOGVIEW_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }

    if let Some(dir) = config_dir() {
        std::fs::create_dir_all(&dir)?;
        return Ok(dir.join("config.json"));
    }

    // Fallback to current directory
    Ok(PathBuf::from("config.json"))
}

/// Load configuration from file or create default
async fn load_or_create_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        let default_config = Config::default();
        save_config(path, &default_config).await?;
        info!("Created default configuration at {}", path.display());
        return Ok(default_config);
    }

    let config_str = fs::read_to_string(path).await?;
    let config: Config = serde_json::from_str(&config_str)
        .map_err(|e| anyhow!("Failed to parse configuration {}: {}", path.display(), e))?;
    debug!("Loaded configuration from {}", path.display());

    Ok(config)
}

/// Save configuration to file
async fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(path, config_str).await?;
    debug!("Saved configuration to {}", path.display());

    Ok(())
}
