//! Narrative Analyst
//!
//! Reads the ranked deviations and writes the situation narrative plus a
//! coarse severity hint. The hint ignores the anomaly score on purpose so
//! the arbiter can weigh two independent opinions.

use crate::error::AgentError;
use crate::signal::{AnalystReport, AnomalySummary, FeatureDeviation, RiskLevel};

pub const EMPTY_NARRATIVE: &str = "No numeric metrics available for analysis.";

/// Second pipeline stage
pub trait Analyst: Send + Sync {
    fn analyze(&self, summary: &AnomalySummary) -> Result<AnalystReport, AgentError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NarrativeAnalyst;

impl Analyst for NarrativeAnalyst {
    fn analyze(&self, summary: &AnomalySummary) -> Result<AnalystReport, AgentError> {
        let features = &summary.top_features;

        let narrative = match features.split_first() {
            Some((primary, rest)) => {
                let mut text = format!(
                    "Situation: {} running {} norms ({:.2}σ) with {} momentum.",
                    primary.name, primary.direction, primary.deviation_sigma, primary.trend
                );
                let secondary: Vec<String> = rest
                    .iter()
                    .take(2)
                    .map(|f| format!("{} ({})", f.name, f.direction))
                    .collect();
                if !secondary.is_empty() {
                    text.push_str(&format!(" Secondary pressure on {}.", secondary.join(", ")));
                }
                text
            }
            None => summary
                .signals
                .first()
                .cloned()
                .unwrap_or_else(|| EMPTY_NARRATIVE.to_string()),
        };

        if narrative.trim().is_empty() {
            return Err(AgentError::EmptyNarrative);
        }

        Ok(AnalystReport {
            narrative,
            severity_hint: severity_from_features(features),
            focus_feature: summary.primary_feature().map(|f| f.name.clone()),
        })
    }
}

/// Severity from the ranked deviations alone.
///
/// HIGH at 2.5σ or three deviating features, MEDIUM at 1.5σ or two, LOW
/// otherwise.
pub fn severity_from_features(features: &[FeatureDeviation]) -> RiskLevel {
    let Some(max_dev) = features.iter().map(|f| f.deviation_sigma).reduce(f64::max) else {
        return RiskLevel::Low;
    };
    if max_dev >= 2.5 || features.len() >= 3 {
        RiskLevel::High
    } else if max_dev >= 1.5 || features.len() >= 2 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
