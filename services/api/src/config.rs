//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: Level,
    /// Identities treated as admin-capable regardless of their profile flag.
    pub admin_emails: Vec<String>,
    pub session_ttl_days: i64,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let db_max_connections = parse_var("DB_MAX_CONNECTIONS", 5u32)?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Access and Session Settings ---
        let admin_emails = std::env::var("ADMIN_EMAILS")
            .map(|raw| parse_email_list(&raw))
            .unwrap_or_default();

        let session_ttl_days = parse_var("SESSION_TTL_DAYS", 30i64)?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be a positive number of days".to_string(),
            ));
        }

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            admin_emails,
            session_ttl_days,
            cors_origin,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Splits a comma-separated list of emails, dropping blanks.
pub fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_list_is_trimmed_and_lowercased() {
        assert_eq!(
            parse_email_list(" Fleet@Example.com ,, ops@example.com"),
            vec!["fleet@example.com", "ops@example.com"]
        );
        assert!(parse_email_list("").is_empty());
    }
}
