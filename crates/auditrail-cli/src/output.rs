//! Table and JSON rendering for command results.

use serde::Serialize;
use tabled::{Table, Tabled};

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
}

/// Print rows as a table, or the serializable items as a JSON array.
pub fn print_rows<R: Tabled, T: Serialize>(rows: &[R], items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table if rows.is_empty() => println!("(none)"),
        OutputFormat::Table => println!("{}", Table::new(rows)),
        OutputFormat::Json => print_json(items),
    }
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Cannot render JSON: {e}"),
    }
}

/// Print a success line.
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print an aligned key/value line.
pub fn print_kv(key: &str, value: impl std::fmt::Display) {
    println!("  {:<28} {value}", format!("{key}:"));
}
