//! Tabular Telemetry Input
//!
//! A [`Table`] is an ordered set of named columns of equal length. Rows are
//! time-ordered, oldest first. Cells are numbers, text, or missing; only
//! columns whose present cells are all numbers take part in scoring.
//!
//! Decoders:
//! - [`Table::from_rows`] - ordered (name, cell) rows, first-seen column order
//! - [`Table::from_json_rows`] / [`Table::from_json_value`] - array of objects
//! - [`Table::from_csv`] - header record plus comma-separated records

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::TableError;

/// A single table cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl Cell {
    /// NaN is stored as missing
    pub fn number(value: f64) -> Self {
        if value.is_nan() {
            Self::Missing
        } else {
            Self::Number(value)
        }
    }

    /// Interpret a raw CSV field
    pub fn parse(raw: &str) -> Self {
        let field = raw.trim();
        if field.is_empty() {
            return Self::Missing;
        }
        match field.to_ascii_lowercase().as_str() {
            "na" | "n/a" | "nan" | "null" | "none" => return Self::Missing,
            _ => {}
        }
        match field.parse::<f64>() {
            Ok(v) => Self::number(v),
            Err(_) => Self::Text(field.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Fully numeric column
    pub fn numeric(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, values.into_iter().map(Cell::number).collect())
    }

    /// Numeric column with gaps
    pub fn sparse(name: impl Into<String>, values: impl IntoIterator<Item = Option<f64>>) -> Self {
        Self::new(
            name,
            values
                .into_iter()
                .map(|v| v.map(Cell::number).unwrap_or(Cell::Missing))
                .collect(),
        )
    }

    pub fn text(name: impl Into<String>, values: impl IntoIterator<Item = String>) -> Self {
        Self::new(name, values.into_iter().map(Cell::Text).collect())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Values of a numeric column, `None` for missing cells.
    ///
    /// Returns `None` when any present cell is text.
    pub fn numeric_values(&self) -> Option<Vec<Option<f64>>> {
        self.cells
            .iter()
            .map(|cell| match cell {
                Cell::Number(v) => Some(Some(*v)),
                Cell::Missing => Some(None),
                Cell::Text(_) => None,
            })
            .collect()
    }

    pub fn is_all_missing(&self) -> bool {
        self.cells.iter().all(Cell::is_missing)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Number of rows (longest column)
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Column::len).max().unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Build a table from rows of (column, cell) pairs.
    ///
    /// Columns appear in first-seen order. A row that lacks a column gets a
    /// missing cell there; a repeated key within a row keeps the last value.
    pub fn from_rows<R, K>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = (K, Cell)>,
        K: Into<String>,
    {
        let mut columns: Vec<Column> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut row_count = 0;

        for row in rows {
            for (name, cell) in row {
                let name = name.into();
                let col = match index.get(&name) {
                    Some(&i) => i,
                    None => {
                        columns.push(Column::new(name.clone(), vec![Cell::Missing; row_count]));
                        index.insert(name, columns.len() - 1);
                        columns.len() - 1
                    }
                };
                let cells = &mut columns[col].cells;
                if cells.len() > row_count {
                    cells[row_count] = cell;
                } else {
                    cells.push(cell);
                }
            }
            row_count += 1;
            for column in &mut columns {
                column.cells.resize(row_count, Cell::Missing);
            }
        }

        Self { columns }
    }

    /// Decode a JSON array of row objects
    pub fn from_json_rows(raw: &str) -> Result<Self, TableError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| TableError::Json(e.to_string()))?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self, TableError> {
        let rows = value.as_array().ok_or(TableError::NotAnArray)?;
        let mut decoded = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let object = row.as_object().ok_or(TableError::NotAnObject(i))?;
            decoded.push(
                object
                    .iter()
                    .map(|(k, v)| (k.clone(), json_cell(v)))
                    .collect::<Vec<_>>(),
            );
        }
        Ok(Self::from_rows(decoded))
    }

    /// Decode CSV text: a header record, then one record per row.
    ///
    /// Fields may be double-quoted; `""` inside quotes is a literal quote and
    /// a quoted field may span lines. Blank lines are skipped. Errors carry
    /// the line on which the offending record starts.
    pub fn from_csv(raw: &str) -> Result<Self, TableError> {
        let mut records = csv_records(raw)?.into_iter();

        let Some(header) = records.next() else {
            return Ok(Self::new());
        };
        let mut columns: Vec<Column> = header
            .fields
            .into_iter()
            .map(|name| Column::new(name.trim(), Vec::new()))
            .collect();

        for record in records {
            if record.fields.len() != columns.len() {
                return Err(TableError::FieldCount {
                    line: record.line,
                    expected: columns.len(),
                    found: record.fields.len(),
                });
            }
            for (column, field) in columns.iter_mut().zip(record.fields) {
                column.cells.push(Cell::parse(&field));
            }
        }

        Ok(Self { columns })
    }
}

fn json_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Missing,
        Value::Number(n) => n.as_f64().map(Cell::number).unwrap_or(Cell::Missing),
        Value::String(s) => Cell::Text(s.clone()),
        Value::Bool(b) => Cell::Text(b.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

struct CsvRecord {
    /// 1-based line the record starts on
    line: usize,
    fields: Vec<String>,
}

impl CsvRecord {
    fn is_blank(&self, quoted: bool) -> bool {
        !quoted && self.fields.len() == 1 && self.fields[0].trim().is_empty()
    }
}

fn csv_records(raw: &str) -> Result<Vec<CsvRecord>, TableError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            ('"', false) => {
                in_quotes = true;
                quoted = true;
            }
            (',', false) => fields.push(std::mem::take(&mut field)),
            ('\r', false) if chars.peek() == Some(&'\n') => {}
            ('\n', false) => {
                fields.push(std::mem::take(&mut field));
                let record = CsvRecord {
                    line: record_line,
                    fields: std::mem::take(&mut fields),
                };
                if !record.is_blank(quoted) {
                    records.push(record);
                }
                quoted = false;
                line += 1;
                record_line = line;
            }
            ('\n', true) => {
                field.push('\n');
                line += 1;
            }
            (c, _) => field.push(c),
        }
    }

    if in_quotes {
        return Err(TableError::UnterminatedQuote(record_line));
    }
    // Last record without a trailing newline
    if quoted || !fields.is_empty() || !field.is_empty() {
        fields.push(field);
        let record = CsvRecord {
            line: record_line,
            fields,
        };
        if !record.is_blank(quoted) {
            records.push(record);
        }
    }
    Ok(records)
}
