//! Kronos Settings
//!
//! Configuration file for a relay process.
//!
//! ## Usage
//!
//! ```no_run
//! use kronos_settings::Settings;
//!
//! let path = kronos_settings::default_settings_path();
//! let mut settings = Settings::load_from(&path)?;
//! settings.node.id = "node2".to_string();
//! settings.save_to(&path)?;
//! # Ok::<(), kronos_settings::SettingsError>(())
//! ```

mod config;

pub use config::{NodeSettings, SentimentSettings, ServerSettings, Settings, StoreSettings};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    ReadError(std::io::Error),

    #[error("Failed to write settings: {0}")]
    WriteError(std::io::Error),

    #[error("Failed to parse settings: {0}")]
    ParseError(serde_json::Error),

    #[error("Failed to create config directory: {0}")]
    CreateDirError(std::io::Error),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Settings file used when none is given on the command line
pub fn default_settings_path() -> PathBuf {
    PathBuf::from("kronos.json")
}
