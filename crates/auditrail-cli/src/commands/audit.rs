//! Audit log commands.

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use auditrail_core::config::AppConfig;
use auditrail_core::error::AppError;
use auditrail_core::types::PageRequest;
use auditrail_database::{AuditLogFilter, AuditLogRepository};
use auditrail_entity::{AuditEvent, AuditLog, AuditLogDetail};

use crate::output::{self, OutputFormat};

/// Arguments for `audit`
#[derive(Debug, Args)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommand,
}

/// Audit subcommands
#[derive(Debug, Subcommand)]
pub enum AuditCommand {
    /// Search audit logs, newest first
    Search {
        /// Entity type, e.g. Order
        #[arg(short = 't', long)]
        entity_type: Option<String>,
        /// Entity key
        #[arg(short = 'i', long)]
        entity_id: Option<String>,
        /// Event: create, modify, delete, softdelete, recovery
        #[arg(short, long)]
        event: Option<AuditEvent>,
        /// Operator key
        #[arg(short, long)]
        operator: Option<String>,
        /// Page number
        #[arg(long, default_value = "1")]
        page: u64,
        /// Page size
        #[arg(long, default_value = "25")]
        page_size: u64,
    },
    /// Show one audit log with its property changes
    Show {
        /// Audit log id
        id: i64,
    },
    /// Full history of one entity
    History {
        /// Entity type
        entity_type: String,
        /// Entity key
        entity_id: String,
    },
    /// Export recent audit logs to a JSON file
    Export {
        /// Output file path
        #[arg(short, long, default_value = "audit_export.json")]
        output: String,
        /// Days of history to export
        #[arg(short, long, default_value = "30")]
        days: i64,
    },
    /// Delete audit logs older than a number of days
    Purge {
        /// Age in days
        #[arg(long)]
        before_days: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct LogRow {
    id: i64,
    time: String,
    event: String,
    entity_type: String,
    entity_id: String,
    operator: String,
    changes: usize,
}

impl From<&AuditLog> for LogRow {
    fn from(log: &AuditLog) -> Self {
        Self {
            id: log.id,
            time: log.event_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            event: log.event_type.to_string(),
            entity_type: log.entity_type.clone(),
            entity_id: log.entity_id.clone(),
            operator: log.operator_id.clone().unwrap_or_else(|| "-".to_string()),
            changes: log.details.len(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct DetailRow {
    property: String,
    original: String,
    new: String,
}

impl From<&AuditLogDetail> for DetailRow {
    fn from(detail: &AuditLogDetail) -> Self {
        Self {
            property: detail.property_name.clone(),
            original: detail.original_value.clone().unwrap_or_default(),
            new: detail.new_value.clone().unwrap_or_default(),
        }
    }
}

/// Execute an audit command.
pub async fn execute(args: &AuditArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let db = super::connect(config).await?;
    let repo = db.audit_logs();

    let result = run(&args.command, &repo, format).await;
    db.close().await;
    result
}

async fn run(command: &AuditCommand, repo: &AuditLogRepository, format: OutputFormat) -> Result<(), AppError> {
    match command {
        AuditCommand::Search {
            entity_type,
            entity_id,
            event,
            operator,
            page,
            page_size,
        } => {
            let filter = AuditLogFilter {
                entity_type: entity_type.clone(),
                entity_id: entity_id.clone(),
                event_type: *event,
                operator_id: operator.clone(),
            };
            let page = PageRequest::new(*page, *page_size);
            let response = repo.search(&filter, &page).await?;

            print_logs(&response.items, format);
            if format == OutputFormat::Table {
                println!(
                    "Page {}/{} ({} total)",
                    response.page, response.total_pages, response.total_items
                );
            }
        }
        AuditCommand::Show { id } => {
            let log = repo
                .find_by_id(*id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Audit log {id} not found")))?;

            match format {
                OutputFormat::Json => output::print_json(&log),
                OutputFormat::Table => {
                    output::print_kv("Id", log.id);
                    output::print_kv("Event", log.event_type);
                    output::print_kv("Entity", format!("{} {}", log.entity_type, log.entity_id));
                    output::print_kv("Time", log.event_time.to_rfc3339());
                    output::print_kv("Operator", log.operator_id.as_deref().unwrap_or("-"));
                    let rows: Vec<DetailRow> = log.details.iter().map(DetailRow::from).collect();
                    output::print_rows(&rows, &log.details, format);
                }
            }
        }
        AuditCommand::History {
            entity_type,
            entity_id,
        } => {
            let logs = repo.find_by_entity(entity_type, entity_id).await?;
            print_logs(&logs, format);
        }
        AuditCommand::Export { output: path, days } => {
            let since = days_ago(*days)?;
            let logs = repo.find_since(since).await?;
            let json = serde_json::to_string_pretty(&logs)?;
            tokio::fs::write(path, json).await?;
            output::print_success(&format!("Exported {} audit logs to '{path}'", logs.len()));
        }
        AuditCommand::Purge { before_days, force } => {
            let before = days_ago(*before_days)?;
            if !force && !confirm_purge(before_days)? {
                println!("Cancelled.");
                return Ok(());
            }
            let deleted = repo.delete_before(before).await?;
            output::print_success(&format!("Deleted {deleted} audit logs recorded before {}", before.to_rfc3339()));
        }
    }

    Ok(())
}

fn print_logs(logs: &[AuditLog], format: OutputFormat) {
    let rows: Vec<LogRow> = logs.iter().map(LogRow::from).collect();
    output::print_rows(&rows, logs, format);
}

/// The instant `days` days before now, rejecting spans chrono cannot represent.
fn days_ago(days: i64) -> Result<DateTime<Utc>, AppError> {
    Duration::try_days(days)
        .and_then(|span| Utc::now().checked_sub_signed(span))
        .ok_or_else(|| AppError::validation(format!("{days} days is out of range")))
}

fn confirm_purge(before_days: &i64) -> Result<bool, AppError> {
    dialoguer::Confirm::new()
        .with_prompt(format!(
            "Delete every audit log older than {before_days} days? This cannot be undone."
        ))
        .default(false)
        .interact()
        .map_err(|e| AppError::internal(format!("Prompt failed: {e}")))
}
