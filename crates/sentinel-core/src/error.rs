//! Error taxonomy for the decision pipeline
//!
//! Data conditions ([`DataError`]) are not fatal: the scorer degrades and
//! records them on the summary. Scoring, analyst and planner errors route the
//! orchestrator into its fallback path and never reach the caller.

use thiserror::Error;

use crate::signal::{Pattern, RiskLevel};

/// Failures decoding raw input into a [`crate::Table`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("record on line {line} has {found} fields, header has {expected}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("unterminated quoted field in record starting on line {0}")]
    UnterminatedQuote(usize),
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("expected a JSON array of row objects")]
    NotAnArray,
    #[error("row {0} is not a JSON object")]
    NotAnObject(usize),
}

/// Degenerate-but-valid input conditions. The scorer keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("no numeric columns")]
    NoNumericColumns,
    #[error("column `{0}` is entirely missing")]
    EmptyColumn(String),
    #[error("only {rows} row(s); model fit skipped")]
    InsufficientHistory { rows: usize },
}

/// Malformed input the scorer refuses to model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("column `{column}` holds a non-finite value at row {row}")]
    NonFinite { column: String, row: usize },
    #[error("column `{column}` has {found} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("analyst produced an empty narrative")]
    EmptyNarrative,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    #[error("no action resolved for {level} risk with {pattern} pattern")]
    EmptyAction { level: RiskLevel, pattern: Pattern },
}

/// Any stage failure, as carried by [`crate::PipelineOutcome`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("scoring failed: {0}")]
    Score(#[from] ScoreError),
    #[error("analysis failed: {0}")]
    Agent(#[from] AgentError),
    #[error("planning failed: {0}")]
    Planner(#[from] PlannerError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
