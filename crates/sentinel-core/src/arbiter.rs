//! Risk Arbiter
//!
//! Reconciles the statistical score with the analyst's severity hint. The
//! more severe opinion always wins; the wider the disagreement, the larger
//! the confidence penalty.

use tracing::debug;

use crate::signal::{RiskDecision, RiskLevel};

pub const NOTE_AGREE: &str = "Risk score corroborates analyst narrative.";
pub const NOTE_SCORE_HIGHER: &str =
    "Score indicates higher risk than analyst summary; conservative stance applied.";
pub const NOTE_ANALYST_HIGHER: &str =
    "Analyst highlighted greater pressure than score; hedging with uncertainty.";

/// Confidence modifier indexed by the level gap
const GAP_MODIFIERS: [f64; 3] = [1.0, 0.85, 0.75];

/// Third pipeline stage
pub trait Arbiter: Send + Sync {
    fn arbitrate(&self, severity_hint: RiskLevel, score: f64) -> RiskDecision;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskArbiter;

impl Arbiter for RiskArbiter {
    fn arbitrate(&self, severity_hint: RiskLevel, score: f64) -> RiskDecision {
        let score_level = RiskLevel::from_score(score);
        let gap = score_level.index().abs_diff(severity_hint.index());

        let note = match score_level.cmp(&severity_hint) {
            std::cmp::Ordering::Equal => NOTE_AGREE,
            std::cmp::Ordering::Greater => NOTE_SCORE_HIGHER,
            std::cmp::Ordering::Less => NOTE_ANALYST_HIGHER,
        };
        let risk_level = score_level.max(severity_hint);
        let confidence_modifier = GAP_MODIFIERS[gap.min(GAP_MODIFIERS.len() - 1)];

        debug!(
            %score_level,
            %severity_hint,
            %risk_level,
            gap,
            "Risk arbitrated."
        );

        RiskDecision {
            risk_level,
            note: note.to_string(),
            confidence_modifier,
        }
    }
}
