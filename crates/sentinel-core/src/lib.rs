//! SentinelAI decision core
//!
//! Turns a snapshot of tabular telemetry into a graded risk decision with a
//! recommended response action.
//!
//! ```text
//!   Table ──► FeatureAnomalyScorer ──► NarrativeAnalyst ──► RiskArbiter ──► ActionPlanner
//!                 (summary, score)        (narrative,        (level,          (action,
//!                                          severity hint)     modifier)        alternatives)
//!                                                 │
//!                              DecisionOrchestrator assembles the Decision,
//!                              or the safe fallback when any stage fails
//! ```
//!
//! Every invocation is stateless. The only randomness lives in the isolation
//! forest and is seeded, so identical inputs give identical decisions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sentinel_core::{DecisionOrchestrator, Table};
//!
//! let table = Table::from_csv("latency_ms\n100\n100\n100\n100\n500\n").unwrap();
//! let decision = DecisionOrchestrator::default().decide(&table, Some("Keep checkout online"));
//! println!("{} -> {}", decision.risk_level, decision.recommended_action);
//! ```

pub mod algo;
pub mod analyst;
pub mod arbiter;
pub mod config;
pub mod decision;
pub mod error;
pub mod orchestrator;
pub mod planner;
pub mod scorer;
pub mod signal;
pub mod table;

pub use analyst::{Analyst, NarrativeAnalyst};
pub use arbiter::{Arbiter, RiskArbiter};
pub use config::{PipelineConfig, ScoringConfig};
pub use decision::{CommandOption, Decision, MissionStatus};
pub use error::{
    AgentError, ConfigError, DataError, PipelineError, PlannerError, ScoreError, TableError,
};
pub use orchestrator::{DecisionOrchestrator, PipelineOutcome, PipelineStage};
pub use planner::{ActionPlanner, Planner};
pub use scorer::{AnomalyScorer, FeatureAnomalyScorer};
pub use signal::{
    ActionPlan, AnalystReport, AnomalySummary, Direction, FeatureDeviation, Pattern, RiskDecision,
    RiskLevel, Trend,
};
pub use table::{Cell, Column, Table};
