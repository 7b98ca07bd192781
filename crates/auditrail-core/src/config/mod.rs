//! Configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod audit;
pub mod database;
pub mod logging;

use serde::{Deserialize, Serialize};

pub use self::audit::{AuditEntityComments, AuditOptions};
pub use self::database::DatabaseConfig;
pub use self::logging::{LogFormat, LoggingConfig};

use crate::error::AppError;

/// Root configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// (base file + environment overlay + `AUDITRAIL__*` variables).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Audit capture behavior.
    #[serde(default)]
    pub audit: AuditOptions,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// The base file at `config_path` is merged with an optional
    /// `config/<env>.toml` overlay, where `env` comes from `AUDITRAIL_ENV`,
    /// and with environment variables prefixed with `AUDITRAIL`.
    pub fn load(config_path: &str) -> Result<Self, AppError> {
        let env = std::env::var("AUDITRAIL_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("AUDITRAIL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
