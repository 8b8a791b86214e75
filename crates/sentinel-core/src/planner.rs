//! Action Planner
//!
//! Maps (risk level, pattern) to a recommended action through a fixed lookup
//! table built once per process. Alternatives depend on the risk level only.
//!
//! Pattern detection looks at the rank-0 feature alone: the single worst
//! signal decides the shape, while the narrative may mention up to three.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;

use crate::error::PlannerError;
use crate::signal::{
    ActionPlan, AnomalySummary, Direction, FeatureDeviation, Pattern, RiskLevel, Trend,
};

/// One row of the action table
#[derive(Debug, Clone, Copy)]
pub struct ActionTemplate {
    pub action: &'static str,
    pub base_confidence: f64,
    pub rationale: &'static str,
}

const fn template(
    action: &'static str,
    base_confidence: f64,
    rationale: &'static str,
) -> ActionTemplate {
    ActionTemplate {
        action,
        base_confidence,
        rationale,
    }
}

pub static ACTION_TABLE: Lazy<HashMap<(RiskLevel, Pattern), ActionTemplate>> = Lazy::new(|| {
    use Pattern::*;
    use RiskLevel::*;

    HashMap::from([
        (
            (High, Surge),
            template(
                "Freeze affected flows and escalate to incident lead",
                0.9,
                "Rapid upward pressure warrants an immediate halt.",
            ),
        ),
        (
            (High, Drop),
            template(
                "Pause payouts, validate data feeds, and alert finance oversight",
                0.88,
                "Sharp drop could signal tampering or outages.",
            ),
        ),
        (
            (High, Broad),
            template(
                "Lock down impacted services and convene crisis bridge",
                0.89,
                "Coordinated anomalies require cross-team response.",
            ),
        ),
        (
            (High, Default),
            template(
                "Enforce manual approval on all risky operations",
                0.87,
                "General instability detected at high risk.",
            ),
        ),
        (
            (Medium, Surge),
            template(
                "Rate-limit transactions and queue secondary screening",
                0.75,
                "Upward drift manageable with throttling.",
            ),
        ),
        (
            (Medium, Drop),
            template(
                "Hold low-signal workloads and request operator check",
                0.73,
                "Falling metric needs verification before resuming.",
            ),
        ),
        (
            (Medium, Broad),
            template(
                "Schedule rapid review with ops and tighten monitoring thresholds",
                0.74,
                "Multiple pressure points need coordinated scrutiny.",
            ),
        ),
        (
            (Medium, Default),
            template(
                "Keep workflows running with elevated watch",
                0.72,
                "Moderate anomaly without clear pattern.",
            ),
        ),
        (
            (Low, Surge),
            template(
                "Apply soft caps and re-check in next cycle",
                0.6,
                "Minor uptick observed; gentle dampening is enough.",
            ),
        ),
        (
            (Low, Drop),
            template(
                "Log deviation and verify sensors during routine checks",
                0.58,
                "Small dip likely noise but worth logging.",
            ),
        ),
        (
            (Low, Broad),
            template(
                "Document pattern and expand automated watchlist",
                0.59,
                "Light multi-signal variance detected.",
            ),
        ),
        (
            (Low, Default),
            template(
                "Continue operations with automated monitoring",
                0.55,
                "No acute pressure despite anomaly flag.",
            ),
        ),
    ])
});

pub static COMMAND_SETS: Lazy<HashMap<RiskLevel, [&'static str; 3]>> = Lazy::new(|| {
    HashMap::from([
        (
            RiskLevel::High,
            [
                "Escalate to incident command and freeze flows",
                "Quarantine affected services and require manual overrides",
                "Route transactions through safe path with human approval",
            ],
        ),
        (
            RiskLevel::Medium,
            [
                "Throttle high-risk operations and schedule rapid review",
                "Enable enhanced monitoring for flagged segments",
                "Run secondary verification on suspect batches",
            ],
        ),
        (
            RiskLevel::Low,
            [
                "Continue with monitoring enabled",
                "Log deviation and re-evaluate next cycle",
                "Notify ops lead of minor variance",
            ],
        ),
    ])
});

/// Fourth pipeline stage
pub trait Planner: Send + Sync {
    fn plan(
        &self,
        risk_level: RiskLevel,
        summary: &AnomalySummary,
    ) -> Result<ActionPlan, PlannerError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActionPlanner;

impl Planner for ActionPlanner {
    fn plan(
        &self,
        risk_level: RiskLevel,
        summary: &AnomalySummary,
    ) -> Result<ActionPlan, PlannerError> {
        let (pattern, reason) = detect_pattern(&summary.top_features);

        let template = ACTION_TABLE
            .get(&(risk_level, pattern))
            .or_else(|| ACTION_TABLE.get(&(risk_level, Pattern::Default)));
        let Some(template) = template.filter(|t| !t.action.trim().is_empty()) else {
            return Err(PlannerError::EmptyAction {
                level: risk_level,
                pattern,
            });
        };

        let alternatives = COMMAND_SETS
            .get(&risk_level)
            .map(|set| set.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();

        debug!(%risk_level, %pattern, action = template.action, "Action planned.");

        Ok(ActionPlan {
            action: template.action.to_string(),
            base_confidence: template.base_confidence,
            rationale: format!("{} {}", reason, template.rationale).trim().to_string(),
            alternatives,
            pattern,
        })
    }
}

/// Classify the shape of the rank-0 feature, with a short reason
pub fn detect_pattern(top_features: &[FeatureDeviation]) -> (Pattern, String) {
    let Some(primary) = top_features.first() else {
        return (
            Pattern::Default,
            "Signals stable; precautionary oversight recommended.".to_string(),
        );
    };

    match (primary.direction, primary.trend) {
        (Direction::Above, Trend::Increasing) => (
            Pattern::Surge,
            format!("{} is accelerating upward.", primary.name),
        ),
        (Direction::Below, Trend::Decreasing) => (
            Pattern::Drop,
            format!("{} is sliding below safe bounds.", primary.name),
        ),
        _ if top_features.len() > 1 => (
            Pattern::Broad,
            "Multiple metrics are moving together.".to_string(),
        ),
        _ => (
            Pattern::Default,
            format!("{} is unstable versus baseline.", primary.name),
        ),
    }
}
