use proptest::prelude::*;
use sentinel_core::analyst::severity_from_features;
use sentinel_core::decision::apply_confidence;
use sentinel_core::{
    Column, DecisionOrchestrator, Direction, FeatureAnomalyScorer, FeatureDeviation, Table, Trend,
};

fn numeric_table(max_rows: usize) -> impl Strategy<Value = Table> {
    (1..=4usize, 1..=max_rows).prop_flat_map(|(cols, rows)| {
        prop::collection::vec(
            prop::collection::vec(prop::option::weighted(0.9, -1_000.0f64..1_000.0), rows),
            cols,
        )
        .prop_map(|columns| {
            Table::from_columns(
                columns
                    .into_iter()
                    .enumerate()
                    .map(|(i, values)| Column::sparse(format!("metric_{}", i), values))
                    .collect(),
            )
        })
    })
}

fn deviation(sigma: f64) -> FeatureDeviation {
    FeatureDeviation {
        name: "m".to_string(),
        mean: 0.0,
        std: 1.0,
        latest_value: sigma,
        deviation_sigma: sigma,
        direction: Direction::Above,
        trend: Trend::Stable,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn text_only_tables_score_zero(
        words in prop::collection::vec("[a-z]{1,8}", 0..20),
    ) {
        let table = Table::new().with_column(Column::text("region", words));
        let summary = FeatureAnomalyScorer::default().try_summarize(&table).unwrap();
        prop_assert_eq!(summary.score, 0.0);
        prop_assert!(summary.top_features.is_empty());
    }

    #[test]
    fn single_row_scores_neutral(values in prop::collection::vec(-1_000.0f64..1_000.0, 1..6)) {
        let table = Table::from_columns(
            values
                .into_iter()
                .enumerate()
                .map(|(i, v)| Column::numeric(format!("metric_{}", i), [v]))
                .collect(),
        );
        let summary = FeatureAnomalyScorer::default().try_summarize(&table).unwrap();
        prop_assert_eq!(summary.score, 0.5);
    }

    #[test]
    fn top_features_are_bounded_and_ranked(table in numeric_table(30)) {
        let summary = FeatureAnomalyScorer::default().try_summarize(&table).unwrap();
        prop_assert!(summary.top_features.len() <= 3);
        prop_assert!(
            summary
                .top_features
                .windows(2)
                .all(|w| w[0].deviation_sigma >= w[1].deviation_sigma)
        );
        prop_assert!((0.0..=1.0).contains(&summary.score));
    }

    #[test]
    fn confidence_stays_in_range(
        base in -2.0f64..2.0,
        modifier in prop::sample::select(vec![1.0, 0.85, 0.75]),
    ) {
        let confidence = apply_confidence(base, modifier);
        prop_assert!((0.6..=0.99).contains(&confidence));
    }

    #[test]
    fn decisions_carry_valid_confidence(table in numeric_table(20)) {
        let decision = DecisionOrchestrator::default().decide(&table, None);
        prop_assert!((0.6..=0.99).contains(&decision.confidence));
        prop_assert!(decision.signals.len() <= 4);
    }

    #[test]
    fn severity_is_monotonic_in_deviation(
        sigmas in prop::collection::vec(0.0f64..5.0, 1..=3),
        bump in 0.0f64..3.0,
    ) {
        let features: Vec<FeatureDeviation> = sigmas.iter().copied().map(deviation).collect();
        let before = severity_from_features(&features);

        let mut raised = features.clone();
        raised[0].deviation_sigma += bump;
        prop_assert!(severity_from_features(&raised) >= before);

        let mut extended = features;
        extended.push(deviation(0.0));
        prop_assert!(severity_from_features(&extended) >= before);
    }

    #[test]
    fn pipeline_is_deterministic(table in numeric_table(20), mission in "[a-zA-Z ]{0,24}") {
        let first = serde_json::to_string(
            &DecisionOrchestrator::default().decide(&table, Some(&mission)),
        )
        .unwrap();
        let second = serde_json::to_string(
            &DecisionOrchestrator::default().decide(&table, Some(&mission)),
        )
        .unwrap();
        prop_assert_eq!(first, second);
    }
}
