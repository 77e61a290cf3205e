// src/config.rs
use crate::domain::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{instrument, trace};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncOpts {
    /// Retries before a retryable change is dropped from the queue
    /// (it stays re-derivable from the store's sync flags)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Isolate per-item failures during a drain instead of replaying the
    /// whole remainder (default: true)
    #[serde(default = "default_isolate_failures")]
    pub isolate_failures: bool,
}

fn default_max_retries() -> u32 {
    5
}

fn default_isolate_failures() -> bool {
    true
}

impl Default for SyncOpts {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            isolate_failures: default_isolate_failures(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_url: String,

    /// Base URL of the remote bookmark backend
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Identifier of the device owner, sent with every queued change
    #[serde(default)]
    pub user_id: String,

    /// Bearer token for the backend; empty means unauthenticated requests
    #[serde(default)]
    pub api_token: String,

    /// Options for the sync worker
    #[serde(default)]
    pub sync: SyncOpts,
}

fn default_db_path() -> String {
    let db_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config/linkstash");

    // Ensure directory exists
    std::fs::create_dir_all(&db_dir).ok();

    db_dir
        .join("linkstash.db")
        .to_str()
        .unwrap_or("linkstash.db")
        .to_string()
}

fn default_api_base_url() -> String {
    "https://api.linkstash.app".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_url: default_db_path(),
            api_base_url: default_api_base_url(),
            user_id: String::new(),
            api_token: String::new(),
            sync: SyncOpts::default(),
        }
    }
}

// Load settings from the config file and environment variables
#[instrument(level = "debug")]
pub fn load_settings() -> DomainResult<Settings> {
    trace!("Loading settings");

    let mut settings = Settings::default();

    let config_path = dirs::home_dir().map(|p| p.join(".config/linkstash/config.toml"));

    if let Some(config_path) = config_path {
        if config_path.exists() {
            trace!("Loading config from: {:?}", config_path);

            let config_text = std::fs::read_to_string(&config_path)?;
            let file_settings: Settings = toml::from_str(&config_text).map_err(|e| {
                DomainError::Other(format!(
                    "Invalid config file {}: {}",
                    config_path.display(),
                    e
                ))
            })?;
            settings = file_settings;
        }
    }

    // Override with environment variables
    if let Ok(db_url) = std::env::var("LINKSTASH_DB_URL") {
        trace!("Using LINKSTASH_DB_URL from environment: {}", db_url);
        settings.db_url = db_url;
    }
    if let Ok(api_url) = std::env::var("LINKSTASH_API_URL") {
        trace!("Using LINKSTASH_API_URL from environment");
        settings.api_base_url = api_url;
    }
    if let Ok(user_id) = std::env::var("LINKSTASH_USER_ID") {
        settings.user_id = user_id;
    }
    if let Ok(token) = std::env::var("LINKSTASH_API_TOKEN") {
        settings.api_token = token;
    }

    // Paths may come with a tilde from the config file
    settings.db_url = shellexpand::tilde(&settings.db_url).to_string();

    Ok(settings)
}
