//! Final Decision Record
//!
//! The structure handed to presentation layers. It is always complete:
//! either an assembled COMPLETED decision or the fixed DEFERRED fallback.
//! Field names on the wire follow the front-end contract.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signal::{ActionPlan, AnalystReport, AnomalySummary, RiskDecision, RiskLevel};

pub const MIN_CONFIDENCE: f64 = 0.6;
pub const MAX_CONFIDENCE: f64 = 0.99;
/// Signals carried on a completed decision
pub const MAX_SIGNALS: usize = 4;

pub const FALLBACK_ACTION: &str = "Manual review required";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MissionStatus {
    Completed,
    Deferred,
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "COMPLETED",
            Self::Deferred => "DEFERRED",
        })
    }
}

/// One selectable command, recommended first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    pub label: String,
    pub action: String,
    pub note: String,
    pub recommended: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub risk_level: RiskLevel,
    pub signals: Vec<String>,
    #[serde(rename = "analysis")]
    pub analysis_text: String,
    pub recommended_action: String,
    /// In [0.6, 0.99]
    pub confidence: f64,
    pub system_summary: String,
    pub reasoning_trace: Vec<String>,
    pub mission_brief: String,
    pub decision_flow: Vec<String>,
    pub command_options: Vec<String>,
    pub command_options_detail: Vec<CommandOption>,
    pub execution_log: Vec<String>,
    #[serde(rename = "mission_status")]
    pub status: MissionStatus,
}

impl Decision {
    /// Build a completed decision from the outputs of every stage.
    ///
    /// Trace, flow and log lines restate facts already computed upstream.
    pub fn assemble(
        mission_brief: &str,
        summary: &AnomalySummary,
        report: &AnalystReport,
        risk: &RiskDecision,
        plan: &ActionPlan,
    ) -> Self {
        let level = risk.risk_level;

        let reasoning_trace = vec![
            format!("Analyst: {}", report.narrative),
            format!("Risk check: {}", risk.note),
            format!("Action rationale: {}", plan.rationale),
        ];
        let analysis_text = reasoning_trace.join(". ");

        let decision_flow = vec![
            format!("Mission: {}", mission_brief),
            format!("Intelligence: {}", report.narrative),
            format!("Decision: {} with {}", level, risk.note),
            format!("Action: {}", plan.action),
        ];
        let execution_log = vec![
            format!("Mission received: {}", mission_brief),
            format!("Intel compiled: {}", report.narrative),
            format!("Decision framed: {}", level),
            format!("Action proposed: {}", plan.action),
        ];

        let mut command_options_detail = vec![CommandOption {
            label: "Execute recommended".to_string(),
            action: plan.action.clone(),
            note: plan.rationale.clone(),
            recommended: true,
        }];
        command_options_detail.extend(
            plan.alternatives
                .iter()
                .filter(|alt| **alt != plan.action)
                .map(|alt| CommandOption {
                    label: alt.clone(),
                    action: alt.clone(),
                    note: "Alternative command option".to_string(),
                    recommended: false,
                }),
        );

        Self {
            risk_level: level,
            signals: summary.signals.iter().take(MAX_SIGNALS).cloned().collect(),
            analysis_text,
            recommended_action: plan.action.clone(),
            confidence: apply_confidence(plan.base_confidence, risk.confidence_modifier),
            system_summary: format!(
                "SentinelAI assessed {} risk for the mission and advises: {}.",
                level, plan.action
            ),
            reasoning_trace,
            mission_brief: mission_brief.to_string(),
            decision_flow,
            command_options: plan.alternatives.clone(),
            command_options_detail,
            execution_log,
            status: MissionStatus::Completed,
        }
    }

    /// The fixed conservative decision.
    ///
    /// Non-blank `signals` computed before the failure replace the default
    /// signal line when there are any.
    pub fn safe_fallback(signals: Option<&[String]>) -> Self {
        let mut signals: Vec<String> = signals
            .unwrap_or_default()
            .iter()
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .collect();
        if signals.is_empty() {
            signals.push("Automated safeguard engaged".to_string());
        }

        Self {
            risk_level: RiskLevel::Medium,
            signals,
            analysis_text: "System could not complete reasoning path. Manual review required."
                .to_string(),
            recommended_action: FALLBACK_ACTION.to_string(),
            confidence: MIN_CONFIDENCE,
            system_summary:
                "SentinelAI defaulted to a safe manual review due to incomplete reasoning."
                    .to_string(),
            reasoning_trace: vec!["Fallback engaged: manual review required.".to_string()],
            mission_brief: "Mission not provided; defaulting to protection mode.".to_string(),
            decision_flow: vec![
                "Mission: default protection".to_string(),
                "Intelligence: unavailable".to_string(),
                "Decision: hold".to_string(),
                "Action: manual review".to_string(),
            ],
            command_options: vec![
                FALLBACK_ACTION.to_string(),
                "Hold operations, increase sampling".to_string(),
                "Escalate to duty officer".to_string(),
            ],
            command_options_detail: vec![CommandOption {
                label: "Manual review".to_string(),
                action: FALLBACK_ACTION.to_string(),
                note: "Safe default while intel is incomplete.".to_string(),
                recommended: true,
            }],
            execution_log: vec!["Decision deferred pending manual review.".to_string()],
            status: MissionStatus::Deferred,
        }
    }

    pub fn is_deferred(&self) -> bool {
        self.status == MissionStatus::Deferred
    }
}

/// Scale the base confidence, round to 2 decimals and clamp into
/// [`MIN_CONFIDENCE`], [`MAX_CONFIDENCE`]
pub fn apply_confidence(base: f64, modifier: f64) -> f64 {
    let adjusted = (base * modifier * 100.0).round() / 100.0;
    if adjusted.is_nan() {
        return MIN_CONFIDENCE;
    }
    adjusted.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Pattern;

    fn plan() -> ActionPlan {
        ActionPlan {
            action: "Continue with monitoring enabled".to_string(),
            base_confidence: 0.9,
            rationale: "v is accelerating upward. Rapid upward pressure warrants an immediate halt."
                .to_string(),
            alternatives: vec![
                "Continue with monitoring enabled".to_string(),
                "Log deviation and re-evaluate next cycle".to_string(),
                "Notify ops lead of minor variance".to_string(),
            ],
            pattern: Pattern::Surge,
        }
    }

    fn report() -> AnalystReport {
        AnalystReport {
            narrative: "Situation: v running above norms (3.00σ) with increasing momentum."
                .to_string(),
            severity_hint: RiskLevel::High,
            focus_feature: Some("v".to_string()),
        }
    }

    fn risk() -> RiskDecision {
        RiskDecision {
            risk_level: RiskLevel::High,
            note: "Risk score corroborates analyst narrative.".to_string(),
            confidence_modifier: 1.0,
        }
    }

    #[test]
    fn test_apply_confidence_bounds() {
        assert_eq!(apply_confidence(0.9, 1.0), 0.9);
        assert_eq!(apply_confidence(0.87, 0.85), 0.74);
        assert_eq!(apply_confidence(0.55, 0.75), MIN_CONFIDENCE);
        assert_eq!(apply_confidence(0.0, 1.0), MIN_CONFIDENCE);
        assert_eq!(apply_confidence(1.5, 1.0), MAX_CONFIDENCE);
        assert_eq!(apply_confidence(f64::NAN, 1.0), MIN_CONFIDENCE);
    }

    #[test]
    fn test_assemble_lines() {
        let mut summary = AnomalySummary::no_numeric_fields();
        summary.signals = (0..6).map(|i| format!("signal {}", i)).collect();
        let d = Decision::assemble("Keep payments flowing", &summary, &report(), &risk(), &plan());

        assert_eq!(d.status, MissionStatus::Completed);
        assert_eq!(d.signals.len(), MAX_SIGNALS);
        assert_eq!(d.reasoning_trace.len(), 3);
        assert_eq!(d.decision_flow.len(), 4);
        assert_eq!(d.execution_log.len(), 4);
        assert_eq!(d.decision_flow[0], "Mission: Keep payments flowing");
        assert_eq!(
            d.decision_flow[2],
            "Decision: HIGH with Risk score corroborates analyst narrative."
        );
        assert_eq!(d.execution_log[2], "Decision framed: HIGH");
        assert!(d.analysis_text.starts_with("Analyst: Situation: v running above"));
        assert!(d.analysis_text.contains(". Risk check: "));
        assert_eq!(
            d.system_summary,
            "SentinelAI assessed HIGH risk for the mission and advises: Continue with monitoring enabled."
        );
    }

    #[test]
    fn test_command_options_skip_duplicate_of_recommended() {
        let d = Decision::assemble(
            "m",
            &AnomalySummary::no_numeric_fields(),
            &report(),
            &risk(),
            &plan(),
        );
        assert_eq!(d.command_options.len(), 3);
        assert_eq!(d.command_options_detail.len(), 3);
        assert!(d.command_options_detail[0].recommended);
        assert_eq!(d.command_options_detail[0].label, "Execute recommended");
        assert!(d.command_options_detail[1..].iter().all(|o| !o.recommended));
        assert!(
            d.command_options_detail[1..]
                .iter()
                .all(|o| o.action != d.recommended_action)
        );
    }

    #[test]
    fn test_fallback_shape() {
        let d = Decision::safe_fallback(None);
        assert_eq!(d.status, MissionStatus::Deferred);
        assert_eq!(d.risk_level, RiskLevel::Medium);
        assert_eq!(d.confidence, MIN_CONFIDENCE);
        assert_eq!(d.signals, vec!["Automated safeguard engaged"]);
        assert_eq!(d.decision_flow.len(), 4);
        assert_eq!(d.recommended_action, FALLBACK_ACTION);
    }

    #[test]
    fn test_fallback_keeps_partial_signals() {
        let partial =
            vec!["latency_ms running above baseline (1.79σ) with increasing trend".to_string()];
        let d = Decision::safe_fallback(Some(partial.as_slice()));
        assert_eq!(d.signals, partial);

        let d = Decision::safe_fallback(Some(&[][..]));
        assert_eq!(d.signals, vec!["Automated safeguard engaged"]);

        let blank = vec!["  ".to_string()];
        let d = Decision::safe_fallback(Some(blank.as_slice()));
        assert_eq!(d.signals, vec!["Automated safeguard engaged"]);
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(Decision::safe_fallback(None)).unwrap();
        assert_eq!(value["mission_status"], "DEFERRED");
        assert_eq!(value["risk_level"], "MEDIUM");
        assert!(value["analysis"].is_string());
        assert!(value.get("analysis_text").is_none());
        assert_eq!(value["command_options_detail"][0]["recommended"], true);
    }
}
