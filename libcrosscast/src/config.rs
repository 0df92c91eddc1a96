//! Configuration management for Crosscast

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub twitter: Option<TwitterConfig>,
    pub instagram: Option<InstagramConfig>,
    pub stager: Option<StagerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    pub enabled: bool,
    /// Base URL of the v2 API; overridable for gateways and tests.
    #[serde(default = "default_twitter_base_url")]
    pub api_base_url: String,
    pub token_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    pub enabled: bool,
    /// Versioned Graph API base; overridable for gateways and tests.
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
    pub token_file: String,
    /// The Instagram user id the Graph publishing paths are keyed by.
    pub account_id: String,
}

/// Where staged media bytes are PUT before Instagram fetches them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagerConfig {
    pub endpoint: String,
    pub public_base_url: String,
    pub token_file: Option<String>,
}

fn default_twitter_base_url() -> String {
    "https://api.x.com".to_string()
}

fn default_graph_base_url() -> String {
    "https://graph.instagram.com/v24.0".to_string()
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            twitter: Some(TwitterConfig {
                enabled: true,
                api_base_url: default_twitter_base_url(),
                token_file: "~/.config/crosscast/twitter.token".to_string(),
            }),
            instagram: Some(InstagramConfig {
                enabled: false,
                graph_base_url: default_graph_base_url(),
                token_file: "~/.config/crosscast/instagram.token".to_string(),
                account_id: String::new(),
            }),
            stager: None,
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CROSSCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("crosscast").join("config.toml"))
}
