//! Schema migration commands.

use clap::{Args, Subcommand};

use auditrail_core::config::AppConfig;
use auditrail_core::error::AppError;
use auditrail_database::{migration, schema};

use crate::output;

/// Arguments for `migrate`
#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Apply pending migrations
    Run,
    /// List applied migrations
    Status,
    /// Document the audit columns of an audited table
    Comment {
        /// Table name
        table: String,
    },
}

/// Execute a migration command.
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    let db = super::connect(config).await?;

    match &args.command {
        MigrateCommand::Run => {
            migration::run_migrations(db.pool()).await?;
            output::print_success("Audit schema is up to date.");
        }
        MigrateCommand::Status => {
            let applied = migration::applied_migrations(db.pool()).await?;
            if applied.is_empty() {
                println!("No migrations applied.");
            }
            for m in &applied {
                let state = if m.success { "ok" } else { "FAILED" };
                output::print_kv(
                    &m.version.to_string(),
                    format!("{} ({state}, {})", m.description, m.installed_on.format("%Y-%m-%d %H:%M")),
                );
            }
        }
        MigrateCommand::Comment { table } => {
            let commented =
                schema::comment_audit_columns(db.pool(), table, &config.audit.comments).await?;
            output::print_success(&format!("Documented {commented} audit column(s) of {table}."));
        }
    }

    db.close().await;
    Ok(())
}
