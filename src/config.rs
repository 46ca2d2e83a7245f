use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{LensError, Result};

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Directory where article documents are stored
    pub data_dir: PathBuf,

    /// Directory for store snapshots
    pub snapshot_dir: PathBuf,

    /// Directory holding the static front-end assets
    pub assets_dir: PathBuf,

    /// Address the HTTP server binds to
    pub bind_address: String,

    /// Port the HTTP server listens on
    pub port: u16,

    /// How often to create snapshots (in hours)
    pub snapshot_frequency: u32,

    /// Maximum number of snapshots to keep (0 keeps all)
    pub max_snapshots: u32,

    /// Whether to run the snapshot scheduler alongside the server
    pub auto_snapshot: bool,

    /// API key for the geocoding provider
    #[serde(default)]
    pub geocode_api_key: Option<String>,

    /// API key for the news provider
    #[serde(default)]
    pub news_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("locallens");

        Config {
            data_dir: base.join("articles"),
            snapshot_dir: base.join("snapshots"),
            assets_dir: PathBuf::from("assets"),
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            snapshot_frequency: 12,
            max_snapshots: 5,
            auto_snapshot: true,
            geocode_api_key: None,
            news_api_key: None,
        }
    }
}

impl Config {
    /// The default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("locallens").join("config.json"))
    }

    /// Loads the configuration from `path`, or from the default location,
    /// falling back to built-in defaults when no file exists.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path(),
        };

        match candidate {
            Some(ref file) if file.exists() => {
                debug!("Loading configuration from {}", file.display());
                let content = fs::read_to_string(file)?;
                let config: Config =
                    serde_json::from_str(&content).map_err(|e| LensError::ConfigError {
                        message: format!("Invalid config file {}: {}", file.display(), e),
                    })?;
                info!("Configuration loaded from {}", file.display());
                Ok(config)
            }
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Config::default())
            }
        }
    }

    // These accessors provide environment fallbacks so keys can be kept out
    // of the config file entirely.
    pub fn geocode_key(&self) -> Option<String> {
        if let Some(key) = &self.geocode_api_key {
            return Some(key.clone());
        }

        std::env::var("GMAPS_KEY").ok()
    }

    pub fn news_key(&self) -> Option<String> {
        if let Some(key) = &self.news_api_key {
            return Some(key.clone());
        }

        std::env::var("GNEWS_KEY").ok()
    }

    /// The socket address the server should listen on.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| LensError::ConfigError {
                message: format!(
                    "Invalid bind address {}:{}: {}",
                    self.bind_address, self.port, e
                ),
            })
    }
}
