use std::{env, path::PathBuf, time::Duration};
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_RELAY_URL: &str = "http://localhost:5001";
pub const DEFAULT_SESSION_PATH: &str = "data/session.json";
pub const DEFAULT_GATEWAY_URL: &str = "https://gate.whapi.cloud";
pub const DEFAULT_CHANNEL_ID: &str = "DRSTRG-6DCWB";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Settings of the operator console.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub port: u16,
    pub api_url: String,
    pub relay_url: String,
    pub session_path: PathBuf,
    pub timeout: Duration,
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: parsed_var("PORT", 3001)?,
            api_url: trimmed_url(var_or("CRM_API_URL", DEFAULT_API_URL)),
            relay_url: trimmed_url(var_or("CRM_RELAY_URL", DEFAULT_RELAY_URL)),
            session_path: PathBuf::from(var_or("CRM_SESSION_PATH", DEFAULT_SESSION_PATH)),
            timeout: Duration::from_secs(parsed_var("CRM_HTTP_TIMEOUT_SECS", 15)?),
        })
    }
}

/// Settings of the WhatsApp relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub gateway_url: String,
    pub token: String,
    pub channel_id: String,
    pub frontend_origin: Option<String>,
    pub timeout: Duration,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = env::var("WHATSAPP_TOKEN")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing("WHATSAPP_TOKEN"))?;

        Ok(Self {
            port: parsed_var("PORT", 5001)?,
            gateway_url: trimmed_url(var_or("WHATSAPP_API_URL", DEFAULT_GATEWAY_URL)),
            token,
            channel_id: var_or("WHATSAPP_CHANNEL_ID", DEFAULT_CHANNEL_ID),
            frontend_origin: env::var("FRONTEND_URL").ok().filter(|value| !value.is_empty()),
            timeout: Duration::from_secs(parsed_var("CRM_HTTP_TIMEOUT_SECS", 15)?),
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn trimmed_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
