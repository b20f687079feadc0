//! Configuration module
//!
//! Handles loading and saving betwire configuration. CLI flags override
//! whatever the file says; the binary applies them after loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::network::ClientConfig;
use crate::protocol::DEFAULT_PORT;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Agency settings
    #[serde(default)]
    pub agency: AgencyConfig,

    /// Batch settings
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            agency: AgencyConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

/// Server connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Draw service address, `host:port`
    #[serde(default = "default_address")]
    pub address: String,
}

fn default_address() -> String {
    format!("127.0.0.1:{}", DEFAULT_PORT)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

/// Agency identity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgencyConfig {
    /// Agency id injected into every submitted record
    #[serde(default = "default_agency_id")]
    pub id: u16,
    /// CSV file holding this agency's bets
    pub data_file: Option<PathBuf>,
}

fn default_agency_id() -> u16 {
    1
}

impl Default for AgencyConfig {
    fn default() -> Self {
        Self {
            id: default_agency_id(),
            data_file: None,
        }
    }
}

/// Batch assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Bets per batch frame
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

fn default_max_records() -> usize {
    100
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("betwire/config.toml")),
            Some(PathBuf::from("./betwire.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the protocol cannot honor
    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch.max_records == 0 {
            return Err(ConfigError::Invalid(
                "batch.max_records must be at least 1".to_string(),
            ));
        }
        if self.server.address.is_empty() {
            return Err(ConfigError::Invalid(
                "server.address must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The slice of configuration the client runtime consumes
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            server_address: self.server.address.clone(),
            agency_id: self.agency.id,
            batch_size: self.batch.max_records,
        }
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> String {
    let config = Config {
        agency: AgencyConfig {
            id: 1,
            data_file: Some(PathBuf::from("agency-1.csv")),
        },
        ..Default::default()
    };

    toml::to_string_pretty(&config).unwrap()
}
