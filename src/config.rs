use std::path::PathBuf;

use thiserror::Error;

use crate::sync::SyncSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Webhook
    pub use_discourse_webhook: bool,
    pub webhook_secret: Option<String>,
    pub webhook_match_old_topics: bool,
    pub title_match_item_type: String,
    pub max_body_bytes: usize,

    // Database
    pub database_path: PathBuf,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Webhook
            use_discourse_webhook: parse_env_bool("USE_DISCOURSE_WEBHOOK", false)?,
            webhook_secret: optional_env("WEBHOOK_SECRET"),
            webhook_match_old_topics: parse_env_bool("WEBHOOK_MATCH_OLD_TOPICS", false)?,
            title_match_item_type: env_or_default("TITLE_MATCH_ITEM_TYPE", "post"),
            max_body_bytes: parse_env_usize("MAX_BODY_BYTES", 1024 * 1024)?,

            // Database
            database_path: PathBuf::from(env_or_default(
                "DATABASE_PATH",
                "./data/topic-sync.sqlite",
            )),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.use_discourse_webhook && self.webhook_secret.is_none() {
            return Err(ConfigError::MissingEnvVar("WEBHOOK_SECRET".to_string()));
        }
        if self.title_match_item_type.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "TITLE_MATCH_ITEM_TYPE".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_BODY_BYTES".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// The subset of configuration the topic sync handler reads per request.
    #[must_use]
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            match_old_topics_by_title: self.webhook_match_old_topics,
            title_match_item_type: self.title_match_item_type.clone(),
        }
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => parse_bool(name, &val),
        _ => Ok(default),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::ParseBool {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
