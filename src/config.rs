//! Configuration module for the database connection, the HTTP listener and the
//! location of the users table. Values come from environment variables, with
//! a `.env` file loaded first when present.

use http::HeaderValue;
use migration::RoleColumnTarget;
use std::env;
use thiserror::Error;

const DEFAULT_LISTENER_ADDRESS: &str = "0.0.0.0:8000";
const DEFAULT_CORS_URLS: &str = "http://localhost:5173,http://127.0.0.1:5173";
const DEFAULT_USERS_TABLE: &str = "users";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0} env var")]
    MissingVar(&'static str),
    #[error("{var} should contain comma separated origins, got {value:?}")]
    InvalidOrigin { var: &'static str, value: String },
}

/// Global application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub database_url: String,
    pub listener_address: String,
    pub cors_urls: Vec<HeaderValue>,
    pub users_schema: Option<String>,
    pub users_table: String,
}

impl AppConfig {
    /// Where the role column migration should look for the users table.
    pub fn role_column_target(&self) -> RoleColumnTarget {
        RoleColumnTarget::located(self.users_schema.clone(), Some(self.users_table.clone()))
    }
}

/// Builds application configuration from environment variables
pub fn build_app_config() -> Result<AppConfig, ConfigError> {
    build_app_config_with(None)
}

/// Like [`build_app_config`], with an explicit `database_url` taking
/// precedence over `DATABASE_URL`.
pub fn build_app_config_with(database_url: Option<String>) -> Result<AppConfig, ConfigError> {
    dotenv::dotenv().ok();
    let database_url = match database_url {
        Some(database_url) => database_url,
        None => required_var("DATABASE_URL")?,
    };
    let listener_address = optional_var("LISTENER_ADDRESS")
        .unwrap_or_else(|| DEFAULT_LISTENER_ADDRESS.to_string());
    let cors_urls = parse_cors_urls(
        &optional_var("CORS_URL").unwrap_or_else(|| DEFAULT_CORS_URLS.to_string()),
    )?;
    let users_schema = optional_var("USERS_SCHEMA");
    let users_table =
        optional_var("USERS_TABLE").unwrap_or_else(|| DEFAULT_USERS_TABLE.to_string());
    Ok(AppConfig {
        database_url,
        listener_address,
        cors_urls,
        users_schema,
        users_table,
    })
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    optional_var(name).ok_or(ConfigError::MissingVar(name))
}

/// Unset and blank variables are treated the same.
fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_cors_urls(raw: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| ConfigError::InvalidOrigin {
                var: "CORS_URL",
                value: origin.to_string(),
            })
        })
        .collect()
}
