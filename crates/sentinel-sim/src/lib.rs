//! # sentinel-sim - Synthetic Operations Telemetry
//!
//! Seeded scenario generators that produce tables for the SentinelAI
//! decision pipeline, plus CSV/JSON readers and writers.
//!
//! ```text
//!   Scenario (normal | medium | high)
//!        │  generate(rows, &mut StdRng)
//!        ▼
//!      Table ──► format::render (csv | json) ──► file / stdout
//!        │
//!        └────► sentinel_core::DecisionOrchestrator ──► Decision JSON
//! ```
//!
//! The simulator holds no detection logic; scoring lives in `sentinel-core`.

pub mod format;
pub mod scenarios;

pub use format::{FormatError, OutputFormat, load_table, parse_table, render};
pub use scenarios::{
    DEFAULT_ROWS, DEFAULT_SEED, HighRiskOps, MediumRiskOps, NormalOps, Scenario, ScenarioError,
    create_scenario, generate, list_scenarios,
};
