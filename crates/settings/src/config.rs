//! Configuration types

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Result, SettingsError};

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Relay identity and forwarding
    #[serde(default)]
    pub node: NodeSettings,

    /// Delivery store location
    #[serde(default)]
    pub store: StoreSettings,

    /// Sentiment classifier for `/analyse`
    #[serde(default)]
    pub sentiment: SentimentSettings,

    /// HTTP server
    #[serde(default)]
    pub server: ServerSettings,

    /// Path the settings were loaded from (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from a specific path, or create defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(SettingsError::ReadError)?;
            let mut settings: Settings =
                serde_json::from_str(&content).map_err(SettingsError::ParseError)?;
            settings.config_path = Some(path.to_path_buf());
            info!("Loaded settings from {:?}", path);
            Ok(settings)
        } else {
            let mut settings = Self::default();
            settings.config_path = Some(path.to_path_buf());
            Ok(settings)
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(SettingsError::CreateDirError)?;
            }
        }

        let content = serde_json::to_string_pretty(self).map_err(SettingsError::ParseError)?;
        std::fs::write(path, content).map_err(SettingsError::WriteError)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// Relay node settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Id other hops' routing markers name this node by
    #[serde(default = "default_node_id")]
    pub id: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Next hop base URL, usually set at runtime via `POST /config`
    #[serde(default)]
    pub next_hop: Option<String>,

    /// Per-hop forward timeout in seconds
    #[serde(default = "default_timeout")]
    pub forward_timeout_secs: u64,

    /// Undelivered events a WebSocket subscriber may lag behind
    #[serde(default = "default_subscriber_capacity")]
    pub subscriber_capacity: usize,
}

fn default_node_id() -> String {
    "node1".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_subscriber_capacity() -> usize {
    64
}

impl NodeSettings {
    pub fn forward_timeout(&self) -> Duration {
        Duration::from_secs(self.forward_timeout_secs)
    }
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            id: default_node_id(),
            listen_addr: default_listen_addr(),
            next_hop: None,
            forward_timeout_secs: default_timeout(),
            subscriber_capacity: default_subscriber_capacity(),
        }
    }
}

/// Delivery store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// JSON-lines log path
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Pending appends allowed before writers wait
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("posts.jsonl")
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Sentiment classifier settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentSettings {
    /// External classifier URL; the built-in lexicon is used when unset
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Browser origins allowed by CORS
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:5174".to_string(),
    ]
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            cors_origins: default_cors_origins(),
        }
    }
}
