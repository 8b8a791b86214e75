//! Decision Orchestrator
//!
//! Runs the stages in order and guarantees a complete decision:
//!
//! ```text
//! SCORING ─► ANALYZING ─► ARBITRATING ─► PLANNING ─► ASSEMBLED
//!    │            │             │             │
//!    └────────────┴─────────────┴─────────────┴─────► FALLBACK
//! ```
//!
//! Each stage returns a `Result`; the first `Err` moves the run to FALLBACK.
//! Signals the scorer produced before a later failure survive into the
//! fallback record.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::analyst::{Analyst, NarrativeAnalyst};
use crate::arbiter::{Arbiter, RiskArbiter};
use crate::config::PipelineConfig;
use crate::decision::Decision;
use crate::error::{DataError, PipelineError};
use crate::planner::{ActionPlanner, Planner};
use crate::scorer::{AnomalyScorer, FeatureAnomalyScorer};
use crate::signal::AnomalySummary;
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Scoring,
    Analyzing,
    Arbitrating,
    Planning,
    Assembled,
    Fallback,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scoring => "SCORING",
            Self::Analyzing => "ANALYZING",
            Self::Arbitrating => "ARBITRATING",
            Self::Planning => "PLANNING",
            Self::Assembled => "ASSEMBLED",
            Self::Fallback => "FALLBACK",
        })
    }
}

/// A decision plus how the run ended
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub decision: Decision,
    /// `Assembled` or `Fallback`
    pub stage: PipelineStage,
    /// Stage that was running when the pipeline fell back
    pub failed_stage: Option<PipelineStage>,
    pub error: Option<PipelineError>,
    /// Degenerate-input conditions the scorer reported
    pub conditions: Vec<DataError>,
}

impl PipelineOutcome {
    pub fn is_fallback(&self) -> bool {
        self.stage == PipelineStage::Fallback
    }
}

pub struct DecisionOrchestrator {
    scorer: Box<dyn AnomalyScorer>,
    analyst: Box<dyn Analyst>,
    arbiter: Box<dyn Arbiter>,
    planner: Box<dyn Planner>,
    default_mission: String,
}

impl Default for DecisionOrchestrator {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl DecisionOrchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            scorer: Box::new(FeatureAnomalyScorer::new(config.scoring)),
            analyst: Box::new(NarrativeAnalyst),
            arbiter: Box::new(RiskArbiter),
            planner: Box::new(ActionPlanner),
            default_mission: config.default_mission,
        }
    }

    pub fn with_scorer(mut self, scorer: impl AnomalyScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn with_analyst(mut self, analyst: impl Analyst + 'static) -> Self {
        self.analyst = Box::new(analyst);
        self
    }

    pub fn with_arbiter(mut self, arbiter: impl Arbiter + 'static) -> Self {
        self.arbiter = Box::new(arbiter);
        self
    }

    pub fn with_planner(mut self, planner: impl Planner + 'static) -> Self {
        self.planner = Box::new(planner);
        self
    }

    /// Trimmed mission text, or the configured default
    pub fn mission_brief(&self, mission: Option<&str>) -> String {
        mission
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_mission)
            .to_string()
    }

    /// Always returns a complete decision
    pub fn decide(&self, table: &Table, mission: Option<&str>) -> Decision {
        self.run(table, mission).decision
    }

    pub fn run(&self, table: &Table, mission: Option<&str>) -> PipelineOutcome {
        let mission_brief = self.mission_brief(mission);

        debug!(
            stage = %PipelineStage::Scoring,
            rows = table.row_count(),
            columns = table.column_count()
        );
        let summary = match self.scorer.score(table) {
            Ok(summary) => summary,
            Err(e) => return fallback(PipelineStage::Scoring, e.into(), None),
        };

        let mut stage = PipelineStage::Analyzing;
        match self.reason(&mission_brief, &summary, &mut stage) {
            Ok(decision) => {
                info!(
                    risk_level = %decision.risk_level,
                    confidence = decision.confidence,
                    action = %decision.recommended_action,
                    "Decision assembled."
                );
                PipelineOutcome {
                    decision,
                    stage: PipelineStage::Assembled,
                    failed_stage: None,
                    error: None,
                    conditions: summary.conditions,
                }
            }
            Err(e) => fallback(stage, e, Some(&summary)),
        }
    }

    /// ANALYZING through ASSEMBLED. `stage` tracks progress for diagnostics.
    fn reason(
        &self,
        mission_brief: &str,
        summary: &AnomalySummary,
        stage: &mut PipelineStage,
    ) -> Result<Decision, PipelineError> {
        debug!(stage = %stage);
        let report = self.analyst.analyze(summary)?;

        *stage = PipelineStage::Arbitrating;
        debug!(
            stage = %stage,
            severity_hint = %report.severity_hint,
            score = summary.score,
            max_deviation = ?summary.max_deviation()
        );
        let risk = self.arbiter.arbitrate(report.severity_hint, summary.score);

        *stage = PipelineStage::Planning;
        debug!(stage = %stage, risk_level = %risk.risk_level);
        let plan = self.planner.plan(risk.risk_level, summary)?;

        *stage = PipelineStage::Assembled;
        Ok(Decision::assemble(mission_brief, summary, &report, &risk, &plan))
    }
}

fn fallback(
    failed_stage: PipelineStage,
    error: PipelineError,
    summary: Option<&AnomalySummary>,
) -> PipelineOutcome {
    warn!(stage = %failed_stage, error = %error, "Pipeline fell back to safe decision.");
    PipelineOutcome {
        decision: Decision::safe_fallback(summary.map(|s| s.signals.as_slice())),
        stage: PipelineStage::Fallback,
        failed_stage: Some(failed_stage),
        error: Some(error),
        conditions: summary.map(|s| s.conditions.clone()).unwrap_or_default(),
    }
}
