// omnisync/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::errors::AppError;

const DEFAULT_DATABASE_PATH: &str = "db.sqlite";

// Structs for deserializing config.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub omnidesk_domain: Option<String>,
    pub omnidesk_email: Option<String>,
    pub omnidesk_api_key: Option<String>,
    pub database_path: Option<PathBuf>,
    pub api_base_url: Option<String>,
}

impl RawJsonConfig {
    /// Overlays environment values on top of the file values.
    fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OMNIDESK_DOMAIN") {
            self.omnidesk_domain = Some(v);
        }
        if let Some(v) = lookup("OMNIDESK_EMAIL") {
            self.omnidesk_email = Some(v);
        }
        if let Some(v) = lookup("OMNIDESK_API_KEY") {
            self.omnidesk_api_key = Some(v);
        }
        if let Some(v) = lookup("DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("OMNIDESK_API_BASE_URL") {
            self.api_base_url = Some(v);
        }
        self
    }
}

/// Settings for one synchronization run.
#[derive(Clone)]
pub struct SyncConfig {
    pub api_base_url: Url,
    pub email: String,
    pub api_key: String,
    pub database_path: PathBuf,
}

// Hand-written so the API key never reaches the logs.
impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("email", &self.email)
            .field("api_key", &"***")
            .field("database_path", &self.database_path)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub raw_json_config: RawJsonConfig,
}

impl AppConfig {
    /// Reads `config_path` if it exists and overlays the process environment
    /// (after `.env` has been loaded by the caller).
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let raw_json_config = if config_path.exists() {
            let config_content = fs::read_to_string(config_path).with_context(|| {
                format!("Failed to read config file at {}", config_path.display())
            })?;
            serde_json::from_str::<RawJsonConfig>(&config_content).with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?
        } else {
            tracing::debug!(
                "No config file at {}, using environment only",
                config_path.display()
            );
            RawJsonConfig::default()
        };

        Ok(AppConfig {
            raw_json_config: raw_json_config.apply_env(|key| env::var(key).ok()),
        })
    }
}

pub fn load_sync_config_from_json(raw_config: &RawJsonConfig) -> crate::errors::Result<SyncConfig> {
    let email = required(&raw_config.omnidesk_email, "omnidesk_email / OMNIDESK_EMAIL")?;
    let api_key = required(&raw_config.omnidesk_api_key, "omnidesk_api_key / OMNIDESK_API_KEY")?;

    let api_base_url = match non_empty(&raw_config.api_base_url) {
        Some(explicit) => explicit.to_string(),
        None => {
            let domain = required(
                &raw_config.omnidesk_domain,
                "omnidesk_domain / OMNIDESK_DOMAIN (or api_base_url)",
            )?;
            format!("https://{}.omnidesk.ru/api/", domain)
        }
    };

    Ok(SyncConfig {
        api_base_url: parse_base_url(&api_base_url)?,
        email,
        api_key,
        database_path: raw_config
            .database_path
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
    })
}

/// Parses the API root, forcing a trailing slash so `Url::join` keeps the
/// last path segment.
fn parse_base_url(raw: &str) -> crate::errors::Result<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Ok(Url::parse(&normalized)?)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn required(value: &Option<String>, name: &str) -> crate::errors::Result<String> {
    non_empty(value)
        .map(str::to_string)
        .ok_or_else(|| AppError::Config(format!("{} must be set", name)))
}
