//! Command definitions and dispatch.

pub mod audit;
pub mod config;
pub mod migrate;

use clap::{Parser, Subcommand};

use auditrail_core::config::AppConfig;
use auditrail_core::error::AppError;
use auditrail_database::DatabasePool;

use crate::output::OutputFormat;

/// Auditrail: inspect and maintain the audit trail
#[derive(Debug, Parser)]
#[command(name = "auditrail", version, about, long_about = None)]
pub struct Cli {
    /// Path to the base configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Audit schema migrations
    Migrate(migrate::MigrateArgs),
    /// Query and maintain audit logs
    Audit(audit::AuditArgs),
    /// Effective configuration
    Config(config::ConfigArgs),
}

impl Cli {
    /// Run the selected command.
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Audit(args) => audit::execute(args, &config, self.format).await,
            Commands::Config(args) => config::execute(args, &config, self.format),
        }
    }
}

/// Load layered configuration.
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Connect to the audit database.
pub async fn connect(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}
