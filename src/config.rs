use std::env;

use axum::http::HeaderValue;
use dotenvy::dotenv;
use thiserror::Error;
use validator::Validate;

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_DATABASE_URL: &str = "sqlite://file_upload_manager.db";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:3001";
const DEFAULT_MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;
const MAX_UPLOAD_LIMIT: u64 = 4 * 1024 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

#[derive(Debug, Clone, Validate)]
pub struct Config {
    #[validate(range(min = 1))]
    pub port: u16,
    #[validate(length(min = 1))]
    pub database_url: String,
    #[validate(length(min = 1))]
    pub upload_dir: String,
    /// Origins allowed to call the API cross-origin. Empty means any origin.
    pub allowed_origins: Vec<String>,
    #[validate(range(min = 1, max = MAX_UPLOAD_LIMIT))]
    pub max_upload_size: u64,
}

impl Config {
    /// Load configuration from environment variables (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => parse_value("PORT", raw)?,
            None => DEFAULT_PORT,
        };

        let max_upload_size = match lookup("MAX_UPLOAD_SIZE") {
            Some(raw) => parse_value("MAX_UPLOAD_SIZE", raw)?,
            None => DEFAULT_MAX_UPLOAD_SIZE,
        };

        let allowed_origins = parse_origins(
            &lookup("ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
        )?;

        let config = Config {
            port,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            upload_dir: lookup("UPLOAD_DIR").unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string()),
            allowed_origins,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value: raw })
}

/// Splits a comma-separated origin list. `*` anywhere in the list means any origin.
/// Every other entry must be usable as an `Access-Control-Allow-Origin` value.
fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if origins.iter().any(|o| o == "*") {
        return Ok(Vec::new());
    }

    if let Some(bad) = origins.iter().find(|o| HeaderValue::from_str(o).is_err()) {
        return Err(ConfigError::InvalidValue {
            key: "ALLOWED_ORIGINS",
            value: bad.clone(),
        });
    }

    Ok(origins)
}
