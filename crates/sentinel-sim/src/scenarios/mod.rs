//! Demo Scenarios
//!
//! Seeded generators for synthetic operations telemetry:
//! - **normal**: steady transactions inside tight bounds
//! - **medium**: mild drift, a periodic swing and occasional spikes
//! - **high**: strong upward pressure, volatility and extreme outliers
//!
//! Every scenario emits the same four columns, oldest row first.

pub mod operations;

use rand::SeedableRng;
use rand::rngs::StdRng;
use sentinel_core::Table;
use thiserror::Error;
use tracing::debug;

pub use operations::{HighRiskOps, MediumRiskOps, NormalOps};

pub const DEFAULT_ROWS: usize = 200;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("unknown scenario '{0}'")]
    Unknown(String),
    #[error("a scenario needs at least one row")]
    NoRows,
}

/// A synthetic telemetry generator
pub trait Scenario: Send {
    /// Canonical name, as accepted by [`create_scenario`]
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Generate `rows` rows drawing all randomness from `rng`
    fn generate(&self, rows: usize, rng: &mut StdRng) -> Table;
}

/// Create a scenario by name
pub fn create_scenario(name: &str) -> Option<Box<dyn Scenario>> {
    match name.to_lowercase().as_str() {
        "normal" | "normal_ops" => Some(Box::new(NormalOps)),
        "medium" | "medium_risk" | "medium_risk_ops" => Some(Box::new(MediumRiskOps)),
        "high" | "high_risk" | "high_risk_ops" => Some(Box::new(HighRiskOps)),
        _ => None,
    }
}

/// All scenarios as (name, description)
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    [
        Box::new(NormalOps) as Box<dyn Scenario>,
        Box::new(MediumRiskOps),
        Box::new(HighRiskOps),
    ]
    .iter()
    .map(|s| (s.name(), s.description()))
    .collect()
}

/// Generate a named scenario with its own seeded RNG
pub fn generate(name: &str, rows: usize, seed: u64) -> Result<Table, ScenarioError> {
    let scenario = create_scenario(name).ok_or_else(|| ScenarioError::Unknown(name.to_string()))?;
    if rows == 0 {
        return Err(ScenarioError::NoRows);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let table = scenario.generate(rows, &mut rng);
    debug!(scenario = scenario.name(), rows, seed, "Scenario generated.");
    Ok(table)
}
