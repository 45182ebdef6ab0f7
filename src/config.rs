use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::ws::store::RetentionPolicy;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated. Unset allows any origin.
    pub cors_origins: Option<String>,

    /// Database URL for the room directory. Unset keeps rooms in memory.
    pub db_url: Option<String>,

    /// What happens to a room once its last member leaves: `retain` or `evict`
    #[serde(default = "default_room_retention")]
    pub room_retention: String,

    /// With `evict`, how long an emptied room's document is kept for reconnects
    pub room_retention_ttl_secs: Option<u64>,

    /// Pending requests a single room accepts before callers wait
    #[serde(default = "default_capacity")]
    pub room_mailbox_capacity: usize,

    /// Outbound frames buffered per connection before the peer counts as failed
    #[serde(default = "default_capacity")]
    pub peer_outbox_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                config.retention_policy()?;
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "dev" || env == "development"
    }

    /// Allowed CORS origins, `None` meaning any
    pub fn cors_origin_list(&self) -> Option<Vec<String>> {
        self.cors_origins.as_ref().map(|origins| {
            origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect()
        })
    }

    pub fn retention_policy(&self) -> Result<RetentionPolicy, ConfigError> {
        match self.room_retention.to_lowercase().as_str() {
            "retain" => Ok(RetentionPolicy::Retain),
            "evict" => Ok(RetentionPolicy::Evict {
                ttl: self.room_retention_ttl_secs.map(Duration::from_secs),
            }),
            other => Err(ConfigError::InvalidValue {
                key: "ROOM_RETENTION",
                value: other.to_string(),
            }),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            cors_origins: None,
            db_url: None,
            room_retention: default_room_retention(),
            room_retention_ttl_secs: None,
            room_mailbox_capacity: default_capacity(),
            peer_outbox_capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_room_retention() -> String {
    "retain".to_string()
}

fn default_capacity() -> usize {
    256
}
