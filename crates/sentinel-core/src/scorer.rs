//! Feature Anomaly Scorer
//!
//! Produces the dataset-level anomaly score and the per-feature deviation
//! ranking that every later stage reads.
//!
//! Pipeline per table:
//! 1. keep numeric columns, drop entirely-missing ones
//! 2. impute gaps with the column median
//! 3. isolation forest over the imputed rows (needs two rows or more)
//! 4. z-score of each column's latest value, top 3 kept with trend/direction

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::algo::{IsolationForest, classify_trend, stats};
use crate::config::ScoringConfig;
use crate::error::{DataError, ScoreError};
use crate::signal::{AnomalySummary, Direction, FeatureDeviation, GENERIC_SIGNAL};
use crate::table::Table;

/// Guards divisions by a zero spread
pub const EPSILON: f64 = 1e-9;
/// Score reported when there is too little history to fit a model
pub const NEUTRAL_SCORE: f64 = 0.5;
/// Deviations kept in the summary
pub const TOP_FEATURES: usize = 3;

/// First pipeline stage
pub trait AnomalyScorer: Send + Sync {
    fn score(&self, table: &Table) -> Result<AnomalySummary, ScoreError>;
}

/// A numeric column after imputation
struct Feature<'a> {
    name: &'a str,
    observed: Vec<f64>,
    imputed: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureAnomalyScorer {
    config: ScoringConfig,
}

impl FeatureAnomalyScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Summarize a table, degrading to the "no numeric fields" result if
    /// the table is malformed.
    pub fn summarize(&self, table: &Table) -> AnomalySummary {
        match self.try_summarize(table) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "Scoring failed; degrading to empty summary.");
                AnomalySummary::no_numeric_fields()
            }
        }
    }

    /// Summarize a table. Degenerate data is not an error; malformed data is.
    pub fn try_summarize(&self, table: &Table) -> Result<AnomalySummary, ScoreError> {
        let rows = table.row_count();
        let mut conditions = Vec::new();
        let features = select_features(table, rows, &mut conditions)?;

        if features.is_empty() {
            conditions.push(DataError::NoNumericColumns);
            report_conditions(&conditions, table.column_count());
            return Ok(AnomalySummary {
                conditions,
                ..AnomalySummary::no_numeric_fields()
            });
        }

        let score = if rows >= 2 {
            self.forest_score(&features, rows)
        } else {
            conditions.push(DataError::InsufficientHistory { rows });
            NEUTRAL_SCORE
        };

        let mut per_feature_mean = BTreeMap::new();
        let mut per_feature_std = BTreeMap::new();
        let mut ranking = Vec::with_capacity(features.len());

        for (idx, feature) in features.iter().enumerate() {
            // Non-empty by construction: all-missing columns were dropped
            let mean = stats::mean(&feature.observed).unwrap_or(0.0);
            let raw_std = stats::sample_std(&feature.observed).unwrap_or(0.0);
            let std = if raw_std == 0.0 { EPSILON } else { raw_std };
            let latest = feature.imputed[rows - 1];
            let z = (latest - mean).abs() / (std + EPSILON);

            per_feature_mean.insert(feature.name.to_string(), mean);
            per_feature_std.insert(feature.name.to_string(), raw_std);
            ranking.push((idx, z, mean, raw_std, latest));
        }

        // Stable sort: equal deviations keep column order
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));

        let top_features: Vec<FeatureDeviation> = ranking
            .into_iter()
            .take(TOP_FEATURES)
            .map(|(idx, z, mean, std, latest)| {
                let feature = &features[idx];
                FeatureDeviation {
                    name: feature.name.to_string(),
                    mean,
                    std,
                    latest_value: latest,
                    deviation_sigma: stats::round2(z),
                    direction: if latest >= mean {
                        Direction::Above
                    } else {
                        Direction::Below
                    },
                    trend: classify_trend(&feature.observed),
                }
            })
            .collect();

        let mut signals: Vec<String> = top_features
            .iter()
            .map(|f| {
                format!(
                    "{} running {} baseline ({:.2}σ) with {} trend",
                    f.name, f.direction, f.deviation_sigma, f.trend
                )
            })
            .collect();
        if signals.is_empty() {
            signals.push(GENERIC_SIGNAL.to_string());
        }

        debug!(
            rows,
            features = features.len(),
            score,
            top = top_features.len(),
            "Table scored."
        );
        report_conditions(&conditions, table.column_count());

        Ok(AnomalySummary {
            per_feature_mean,
            per_feature_std,
            signals,
            top_features,
            score,
            conditions,
        })
    }

    /// Normalized spread of the forest's decision scores, in [0, 1]
    fn forest_score(&self, features: &[Feature<'_>], rows: usize) -> f64 {
        let matrix: Vec<Vec<f64>> = (0..rows)
            .map(|r| features.iter().map(|f| f.imputed[r]).collect())
            .collect();

        let forest = IsolationForest::fit(&matrix, &self.config);
        let raw = forest.decision_function(&matrix);

        let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
        if max == min {
            return NEUTRAL_SCORE;
        }
        let mean = stats::mean(&raw).unwrap_or(max);
        ((max - mean) / (max - min + EPSILON)).clamp(0.0, 1.0)
    }
}

impl AnomalyScorer for FeatureAnomalyScorer {
    fn score(&self, table: &Table) -> Result<AnomalySummary, ScoreError> {
        self.try_summarize(table)
    }
}

fn report_conditions(conditions: &[DataError], columns: usize) {
    for condition in conditions {
        warn!(%condition, columns, "Degenerate input; scoring continues.");
    }
}

fn select_features<'a>(
    table: &'a Table,
    rows: usize,
    conditions: &mut Vec<DataError>,
) -> Result<Vec<Feature<'a>>, ScoreError> {
    let mut features = Vec::new();

    for column in &table.columns {
        let Some(values) = column.numeric_values() else {
            continue;
        };
        if values.len() != rows {
            return Err(ScoreError::RaggedColumn {
                column: column.name.clone(),
                expected: rows,
                found: values.len(),
            });
        }
        if let Some(row) = values.iter().position(|v| v.is_some_and(|x| !x.is_finite())) {
            return Err(ScoreError::NonFinite {
                column: column.name.clone(),
                row,
            });
        }

        let observed: Vec<f64> = values.iter().flatten().copied().collect();
        let Some(fill) = stats::median(&observed) else {
            conditions.push(DataError::EmptyColumn(column.name.clone()));
            continue;
        };
        let imputed = values.iter().map(|v| v.unwrap_or(fill)).collect();

        features.push(Feature {
            name: &column.name,
            observed,
            imputed,
        });
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{NO_NUMERIC_SIGNAL, Trend};
    use crate::table::Column;
    use std::sync::{Arc, Mutex};

    fn scorer() -> FeatureAnomalyScorer {
        FeatureAnomalyScorer::default()
    }

    #[test]
    fn test_empty_table() {
        let summary = scorer().try_summarize(&Table::new()).unwrap();
        assert_eq!(summary.score, 0.0);
        assert!(summary.top_features.is_empty());
        assert_eq!(summary.signals, vec![NO_NUMERIC_SIGNAL]);
    }

    #[test]
    fn test_text_and_all_missing_columns_are_ignored() {
        let table = Table::new()
            .with_column(Column::text("region", vec!["eu".into(), "us".into()]))
            .with_column(Column::sparse("errors", vec![None, None]));
        let summary = scorer().try_summarize(&table).unwrap();
        assert_eq!(summary.score, 0.0);
        assert!(summary.top_features.is_empty());
        assert!(
            summary
                .conditions
                .contains(&DataError::EmptyColumn("errors".into()))
        );
    }

    #[test]
    fn test_single_row_is_neutral() {
        let table = Table::new().with_column(Column::numeric("volume", [42.0]));
        let summary = scorer().try_summarize(&table).unwrap();
        assert_eq!(summary.score, NEUTRAL_SCORE);
        assert_eq!(summary.top_features.len(), 1);
        assert_eq!(summary.top_features[0].deviation_sigma, 0.0);
        assert_eq!(summary.top_features[0].direction, Direction::Above);
        assert_eq!(summary.per_feature_std["volume"], 0.0);
        assert!(
            summary
                .conditions
                .contains(&DataError::InsufficientHistory { rows: 1 })
        );
    }

    #[test]
    fn test_latency_spike() {
        let table = Table::new().with_column(Column::numeric(
            "latency_ms",
            [100.0, 100.0, 100.0, 100.0, 500.0],
        ));
        let summary = scorer().try_summarize(&table).unwrap();

        let top = &summary.top_features[0];
        assert_eq!(top.name, "latency_ms");
        assert_eq!(top.deviation_sigma, 1.79);
        assert_eq!(top.direction, Direction::Above);
        assert_eq!(top.trend, Trend::Increasing);
        assert_eq!(top.latest_value, 500.0);
        assert_eq!(summary.per_feature_mean["latency_ms"], 180.0);
        assert_eq!(
            summary.signals,
            vec!["latency_ms running above baseline (1.79σ) with increasing trend"]
        );
        // Four identical inliers and one outlier: (max - mean) / range = 1/5
        assert!((summary.score - 0.2).abs() < 1e-6, "score {}", summary.score);
    }

    #[test]
    fn test_top_three_ordering_and_ties() {
        let flat = [1.0, 1.0, 1.0, 1.0, 2.0];
        let table = Table::new()
            .with_column(Column::numeric("a", flat))
            .with_column(Column::numeric("b", [5.0, 5.0, 5.0, 5.0, 5.0]))
            .with_column(Column::numeric("c", [1.0, 2.0, 3.0, 4.0, 5.0]))
            .with_column(Column::numeric("d", flat))
            .with_column(Column::numeric("e", [10.0, 10.0, 10.0, 10.0, 0.0]));
        let summary = scorer().try_summarize(&table).unwrap();

        let names: Vec<_> = summary.top_features.iter().map(|f| f.name.as_str()).collect();
        // a, d and e all sit at 1.79σ; c (1.26σ) and b (flat) drop out
        assert_eq!(names.len(), 3);
        for name in ["a", "d", "e"] {
            assert!(names.contains(&name), "{:?}", names);
        }
        // Identical columns tie exactly, so column order decides
        let pos = |n: &str| names.iter().position(|x| *x == n).unwrap();
        assert!(pos("a") < pos("d"));
        assert!(summary.top_features.iter().all(|f| f.deviation_sigma == 1.79));
        assert_eq!(summary.signals.len(), 3);
        assert_eq!(summary.per_feature_mean.len(), 5);
    }

    #[test]
    fn test_missing_values_use_median() {
        let table = Table::new().with_column(Column::sparse(
            "volume",
            vec![Some(10.0), Some(30.0), Some(20.0), None],
        ));
        let summary = scorer().try_summarize(&table).unwrap();
        let top = &summary.top_features[0];
        assert_eq!(top.latest_value, 20.0);
        assert_eq!(top.mean, 20.0);
        assert_eq!(top.deviation_sigma, 0.0);
    }

    #[test]
    fn test_infinite_value_is_malformed() {
        let table = Table::new().with_column(Column::numeric("v", [1.0, f64::INFINITY]));
        let err = scorer().try_summarize(&table).unwrap_err();
        assert_eq!(
            err,
            ScoreError::NonFinite {
                column: "v".into(),
                row: 1
            }
        );
        // The infallible entry point degrades instead
        let summary = scorer().summarize(&table);
        assert_eq!(summary.signals, vec![NO_NUMERIC_SIGNAL]);
    }

    #[test]
    fn test_ragged_columns_are_malformed() {
        let table = Table::new()
            .with_column(Column::numeric("a", [1.0, 2.0, 3.0]))
            .with_column(Column::numeric("b", [1.0]));
        assert!(matches!(
            scorer().try_summarize(&table),
            Err(ScoreError::RaggedColumn { .. })
        ));
    }

    #[test]
    fn test_constant_table_scores_neutral() {
        let table = Table::new().with_column(Column::numeric("v", [7.0; 6]));
        let summary = scorer().try_summarize(&table).unwrap();
        assert_eq!(summary.score, NEUTRAL_SCORE);
        assert_eq!(summary.top_features[0].trend, Trend::Stable);
    }

    #[test]
    fn test_sigma_keeps_two_decimals() {
        let table = Table::new().with_column(Column::numeric("queue", [0.0, 0.0, 0.0, 4.0]));
        let summary = scorer().try_summarize(&table).unwrap();
        assert_eq!(summary.top_features[0].deviation_sigma, 1.5);
        assert_eq!(
            summary.signals,
            vec!["queue running above baseline (1.50σ) with increasing trend"]
        );
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn warnings_while(f: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_conditions_are_logged_as_warnings() {
        let table = Table::new()
            .with_column(Column::numeric("volume", [42.0]))
            .with_column(Column::sparse("errors", vec![None]));
        let output = warnings_while(|| {
            let summary = scorer().try_summarize(&table).unwrap();
            assert_eq!(summary.conditions.len(), 2);
        });
        assert!(output.contains("WARN"), "{}", output);
        assert!(output.contains("column `errors` is entirely missing"), "{}", output);
        assert!(output.contains("only 1 row(s); model fit skipped"), "{}", output);

        let output = warnings_while(|| {
            scorer().try_summarize(&Table::new()).unwrap();
        });
        assert!(output.contains("no numeric columns"), "{}", output);
    }

    #[test]
    fn test_clean_table_logs_no_warnings() {
        let table = Table::new().with_column(Column::numeric("v", [1.0, 2.0, 3.0]));
        let output = warnings_while(|| {
            scorer().try_summarize(&table).unwrap();
        });
        assert!(output.is_empty(), "{}", output);
    }
}
