//! Configuration commands.

use clap::{Args, Subcommand};

use auditrail_core::config::AppConfig;
use auditrail_core::error::AppError;
use auditrail_database::connection::redact_url;

use crate::output::{self, OutputFormat};

/// Arguments for `config`
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration after all layers are merged
    Show,
}

/// Execute a config command.
pub fn execute(args: &ConfigArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut shown = config.clone();
            shown.database.url = redact_url(&shown.database.url);

            match format {
                OutputFormat::Json => output::print_json(&shown),
                OutputFormat::Table => {
                    println!("[database]");
                    output::print_kv("url", &shown.database.url);
                    output::print_kv("max_connections", shown.database.max_connections);
                    output::print_kv("min_connections", shown.database.min_connections);
                    println!("[audit]");
                    output::print_kv("allow_anonymous_create", shown.audit.allow_anonymous_create);
                    output::print_kv("allow_anonymous_modify", shown.audit.allow_anonymous_modify);
                    output::print_kv("allow_anonymous_delete", shown.audit.allow_anonymous_delete);
                    output::print_kv(
                        "exempt_operator_type_on_create",
                        shown.audit.exempt_operator_type_on_create,
                    );
                    println!("[logging]");
                    output::print_kv("level", &shown.logging.level);
                    output::print_kv("format", shown.logging.format);
                }
            }
        }
    }
    Ok(())
}
