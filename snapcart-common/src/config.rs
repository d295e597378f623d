//! Configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Arguments and environment variables are parsed by the binary (clap) and
//! applied on top of the file with [`ServerConfig::apply_overrides`].

use crate::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SNAPCART_CONFIG";

/// Default Google Cloud Vision annotate endpoint
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// External vision service settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Annotate endpoint URL
    pub endpoint: String,
    /// API key; without one every classification reports the service unavailable
    pub api_key: Option<String>,
    /// Maximum labels/logos requested per image
    pub max_results: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            api_key: None,
            max_results: 10,
            timeout_secs: 10,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Optional catalog override (TOML `[[items]]` table)
    pub catalog_path: Option<PathBuf>,
    /// Per-subscriber queue depth of the live event stream
    pub event_queue_capacity: usize,
    pub vision: VisionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            database_path: default_data_folder().join("snapcart.db"),
            catalog_path: None,
            event_queue_capacity: crate::events::DEFAULT_QUEUE_CAPACITY,
            vision: VisionConfig::default(),
        }
    }
}

/// Values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub vision_api_key: Option<String>,
}

impl ServerConfig {
    /// Parse configuration from TOML text; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ServerConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the first config file found, or defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match locate_config_file(explicit_path)? {
            Some(path) => {
                let content = std::fs::read_to_string(&path)?;
                let config = Self::from_toml_str(&content)?;
                tracing::info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            None => {
                tracing::info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(path) = overrides.database_path {
            self.database_path = path;
        }
        if let Some(path) = overrides.catalog_path {
            self.catalog_path = Some(path);
        }
        if let Some(key) = overrides.vision_api_key {
            self.vision.api_key = Some(key);
        }
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid listen address {}:{}: {}", self.host, self.port, e)))
    }

    fn validate(&self) -> Result<()> {
        if self.event_queue_capacity == 0 {
            return Err(Error::Config("event_queue_capacity must be at least 1".to_string()));
        }
        if self.vision.endpoint.trim().is_empty() {
            return Err(Error::Config("vision.endpoint must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Find the config file to use
///
/// An explicit path (or `$SNAPCART_CONFIG`) must exist; the per-user and
/// system locations are optional.
fn locate_config_file(explicit_path: Option<&Path>) -> Result<Option<PathBuf>> {
    let explicit = explicit_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));

    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(Error::Config(format!("Config file not found: {}", path.display())));
    }

    let user_config = dirs::config_dir().map(|d| d.join("snapcart").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/snapcart/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }
    }

    Ok(None)
}

/// OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("snapcart"))
        .unwrap_or_else(|| PathBuf::from("./snapcart_data"))
}
