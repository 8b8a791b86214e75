//! Table file formats
//!
//! CSV and JSON (array of row objects) in both directions. Missing cells are
//! written as empty CSV fields or JSON `null`.

use clap::ValueEnum;
use serde_json::{Map, Number, Value};
use std::path::Path;
use thiserror::Error;

use sentinel_core::{Cell, Table, TableError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Render a table in the requested format
pub fn render(table: &Table, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Csv => Ok(to_csv(table)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&to_json_rows(table))?),
    }
}

pub fn to_csv(table: &Table) -> String {
    let mut out = String::new();
    let header: Vec<String> = table.columns.iter().map(|c| csv_field(&c.name)).collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for row in 0..table.row_count() {
        for (i, column) in table.columns.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            match column.cells.get(row) {
                Some(Cell::Number(v)) => out.push_str(&v.to_string()),
                Some(Cell::Text(s)) => out.push_str(&csv_field(s)),
                Some(Cell::Missing) | None => {}
            }
        }
        out.push('\n');
    }
    out
}

pub fn to_json_rows(table: &Table) -> Value {
    let rows = (0..table.row_count())
        .map(|row| {
            let object: Map<String, Value> = table
                .columns
                .iter()
                .map(|column| {
                    let value = match column.cells.get(row) {
                        Some(Cell::Number(v)) => {
                            Number::from_f64(*v).map_or(Value::Null, Value::Number)
                        }
                        Some(Cell::Text(s)) => Value::String(s.clone()),
                        Some(Cell::Missing) | None => Value::Null,
                    };
                    (column.name.clone(), value)
                })
                .collect();
            Value::Object(object)
        })
        .collect();
    Value::Array(rows)
}

/// Decode table text. A body starting with `[` is read as JSON rows,
/// anything else as CSV.
pub fn parse_table(raw: &str) -> Result<Table, FormatError> {
    if raw.trim_start().starts_with('[') {
        Ok(Table::from_json_rows(raw)?)
    } else {
        Ok(Table::from_csv(raw)?)
    }
}

pub fn load_table(path: impl AsRef<Path>) -> Result<Table, FormatError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| FormatError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_table(&raw)
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
