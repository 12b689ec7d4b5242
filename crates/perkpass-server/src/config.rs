//! Server configuration, loaded from the environment at startup.

use perkpass_db::DbConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The signing secret is mandatory — the process refuses to start
    /// without it rather than falling back to a known constant.
    #[error("PERKPASS_CREDENTIAL_SECRET must be set")]
    MissingSecret,

    #[error("invalid value for {variable}: {message}")]
    Invalid { variable: String, message: String },
}

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (default `127.0.0.1:8080`).
    pub bind_addr: String,
    pub db: DbConfig,
    /// HMAC signing secret for credentials.
    pub credential_secret: String,
    /// Membership credential lifetime in hours (default 24).
    pub credential_ttl_hours: u64,
}

impl ServerConfig {
    /// Read configuration from `PERKPASS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let credential_secret = std::env::var("PERKPASS_CREDENTIAL_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        let credential_ttl_hours = match std::env::var("PERKPASS_CREDENTIAL_TTL_HOURS") {
            Ok(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                variable: "PERKPASS_CREDENTIAL_TTL_HOURS".into(),
                message: format!("{e}"),
            })?,
            Err(_) => 24,
        };

        Ok(Self {
            bind_addr: std::env::var("PERKPASS_BIND")
                .unwrap_or_else(|_| "127.0.0.1:8080".into()),
            db: DbConfig::from_env(),
            credential_secret,
            credential_ttl_hours,
        })
    }
}
