//! Stage Outputs
//!
//! Typed records passed forward through the pipeline: the scorer's
//! [`AnomalySummary`], the analyst's [`AnalystReport`], the arbiter's
//! [`RiskDecision`] and the planner's [`ActionPlan`]. All are plain values
//! created per invocation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::DataError;

/// Signal emitted when the table carries nothing numeric
pub const NO_NUMERIC_SIGNAL: &str = "no numeric fields detected";
/// Signal emitted when numeric data exists but no feature was ranked
pub const GENERIC_SIGNAL: &str = "statistical deviation detected";

/// Risk and severity levels, ordered LOW < MEDIUM < HIGH
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Bucket a normalized anomaly score
    pub fn from_score(score: f64) -> Self {
        if score >= 0.67 {
            Self::High
        } else if score >= 0.33 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    Unclear,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
            Self::Unclear => "unclear",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the dominant anomalous feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    /// Above baseline and still rising
    Surge,
    /// Below baseline and still falling
    Drop,
    /// Several features deviating without a clear surge or drop
    Broad,
    Default,
}

impl Pattern {
    pub const ALL: [Pattern; 4] = [Self::Surge, Self::Drop, Self::Broad, Self::Default];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Surge => "surge",
            Self::Drop => "drop",
            Self::Broad => "broad",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far one feature's latest value sits from its own history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDeviation {
    pub name: String,
    pub mean: f64,
    pub std: f64,
    pub latest_value: f64,
    /// |latest - mean| / std, rounded to 2 decimals
    pub deviation_sigma: f64,
    pub direction: Direction,
    pub trend: Trend,
}

/// Scorer output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub per_feature_mean: BTreeMap<String, f64>,
    /// Raw sample standard deviation (0 for constant or single-value columns)
    pub per_feature_std: BTreeMap<String, f64>,
    pub signals: Vec<String>,
    /// Top of the deviation ranking, at most 3, most deviant first
    pub top_features: Vec<FeatureDeviation>,
    /// Dataset-level anomaly score in [0, 1]
    pub score: f64,
    /// Degenerate-input conditions met while scoring
    #[serde(skip)]
    pub conditions: Vec<DataError>,
}

impl AnomalySummary {
    /// Result for tables without usable numeric data
    pub fn no_numeric_fields() -> Self {
        Self {
            per_feature_mean: BTreeMap::new(),
            per_feature_std: BTreeMap::new(),
            signals: vec![NO_NUMERIC_SIGNAL.to_string()],
            top_features: Vec::new(),
            score: 0.0,
            conditions: vec![DataError::NoNumericColumns],
        }
    }

    pub fn primary_feature(&self) -> Option<&FeatureDeviation> {
        self.top_features.first()
    }

    pub fn max_deviation(&self) -> Option<f64> {
        self.top_features
            .iter()
            .map(|f| f.deviation_sigma)
            .reduce(f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystReport {
    pub narrative: String,
    /// Derived from the ranked deviations only, never from the score
    pub severity_hint: RiskLevel,
    pub focus_feature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    pub risk_level: RiskLevel,
    pub note: String,
    /// 1.0 on agreement, 0.85 one level apart, 0.75 two levels apart
    pub confidence_modifier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub action: String,
    pub base_confidence: f64,
    pub rationale: String,
    pub alternatives: Vec<String>,
    pub pattern: Pattern,
}
