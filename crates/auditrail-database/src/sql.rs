//! SQL text for tracked entity writes.
//!
//! Values travel as positional parameters. `Null` is written as a literal
//! `NULL` so no parameter ever needs a type without a value.

use auditrail_core::error::AppError;
use auditrail_core::result::AppResult;
use auditrail_core::types::FieldValue;

use crate::entry::Row;

/// Longest identifier PostgreSQL keeps without truncation.
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Quote an identifier, accepting only ASCII letters, digits and `_`.
pub(crate) fn quote_identifier(name: &str) -> AppResult<String> {
    let valid = !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LENGTH
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(AppError::validation(format!("Invalid identifier '{name}'")));
    }
    Ok(format!("\"{name}\""))
}

/// A statement with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Statement {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

impl Statement {
    fn new() -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn placeholder(&mut self, value: &FieldValue) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        self.params.push(value.clone());
        format!("${}", self.params.len())
    }

    fn key_filter(&mut self, table: &str, row: &Row, keys: &[String]) -> AppResult<String> {
        let mut terms = Vec::with_capacity(keys.len());
        for key in keys {
            let value = row.get(key).filter(|v| !v.is_null()).ok_or_else(|| {
                AppError::validation(format!("{table} has no value for key '{key}'"))
                    .for_entity(table)
            })?;
            let placeholder = self.placeholder(value);
            terms.push(format!("{} = {placeholder}", quote_identifier(key)?));
        }
        Ok(terms.join(" AND "))
    }
}

/// Insert `row` into `table`.
///
/// With `generated_key` set the key column is left to the database and
/// returned. Otherwise the insert is an upsert on `keys`, so repeating it
/// writes the same row again.
pub(crate) fn insert(
    table: &str,
    row: &Row,
    keys: &[String],
    generated_key: Option<&str>,
) -> AppResult<Statement> {
    let mut statement = Statement::new();
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (name, value) in row {
        if generated_key == Some(name.as_str()) {
            continue;
        }
        columns.push(quote_identifier(name)?);
        values.push(statement.placeholder(value));
    }

    let table_name = quote_identifier(table)?;
    let head = if columns.is_empty() {
        format!("INSERT INTO {table_name} DEFAULT VALUES")
    } else {
        format!(
            "INSERT INTO {table_name} ({}) VALUES ({})",
            columns.join(", "),
            values.join(", ")
        )
    };

    statement.sql = match generated_key {
        Some(key) => format!("{head} RETURNING {}", quote_identifier(key)?),
        None => {
            let conflict = keys
                .iter()
                .map(|k| quote_identifier(k))
                .collect::<AppResult<Vec<_>>>()?
                .join(", ");
            let updates = row
                .keys()
                .filter(|name| !keys.contains(*name))
                .map(|name| quote_identifier(name).map(|q| format!("{q} = EXCLUDED.{q}")))
                .collect::<AppResult<Vec<_>>>()?;
            if updates.is_empty() {
                format!("{head} ON CONFLICT ({conflict}) DO NOTHING")
            } else {
                format!(
                    "{head} ON CONFLICT ({conflict}) DO UPDATE SET {}",
                    updates.join(", ")
                )
            }
        }
    };
    Ok(statement)
}

/// Update every non-key column of the row identified by `keys`.
///
/// `None` when the row has nothing besides its key.
pub(crate) fn update(table: &str, row: &Row, keys: &[String]) -> AppResult<Option<Statement>> {
    let mut statement = Statement::new();
    let mut assignments = Vec::new();
    for (name, value) in row.iter().filter(|(name, _)| !keys.contains(*name)) {
        let placeholder = statement.placeholder(value);
        assignments.push(format!("{} = {placeholder}", quote_identifier(name)?));
    }
    if assignments.is_empty() {
        return Ok(None);
    }
    let filter = statement.key_filter(table, row, keys)?;
    statement.sql = format!(
        "UPDATE {} SET {} WHERE {filter}",
        quote_identifier(table)?,
        assignments.join(", ")
    );
    Ok(Some(statement))
}

/// Delete the row identified by `keys`.
pub(crate) fn delete(table: &str, row: &Row, keys: &[String]) -> AppResult<Statement> {
    let mut statement = Statement::new();
    let filter = statement.key_filter(table, row, keys)?;
    statement.sql = format!("DELETE FROM {} WHERE {filter}", quote_identifier(table)?);
    Ok(statement)
}
