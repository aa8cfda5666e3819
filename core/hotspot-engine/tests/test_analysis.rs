//! FILENAME: tests/test_analysis.rs
//! Integration tests for running hot spot analyses end to end.

mod common;

use std::collections::HashSet;

use common::{assert_metric, mean_of, row_by_label, run_analysis, EmployeeFixture, TipsFixture, TitanicFixture};
use dataset::{Dataset, DatasetCatalog, Value};
use hotspot_engine::{
    feature_subsets, AggregationType, BaselineMode, FailurePolicy, HotSpotAnalyzer, HotSpotDefinition,
    HotSpotError, NamedAggregation, Report, SearchQuery, SortOrder,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn tip_metrics() -> NamedAggregation {
    NamedAggregation::new()
        .with("avg_tips", "tip", AggregationType::Average)
        .with("avg_tip_perc", "tip_perc", AggregationType::Average)
        .rounded(4)
}

fn survival_metrics() -> NamedAggregation {
    NamedAggregation::new()
        .with("survivors", "survived", AggregationType::Sum)
        .with("survival_rate", "survived", AggregationType::Average)
        .rounded(4)
}

/// Number of distinct value tuples observed for each subset size,
/// counted directly from the rows.
fn observed_tuples_per_depth(ds: &Dataset, targets: &[&str], limit: usize) -> Vec<usize> {
    let columns: Vec<usize> = targets.iter().map(|t| ds.column_index(t).unwrap()).collect();
    let mut per_depth = vec![0; limit + 1];
    for subset in feature_subsets(targets.len(), limit) {
        let tuples: HashSet<Vec<String>> = ds
            .rows()
            .map(|row| subset.iter().map(|&f| row[columns[f]].display_value()).collect::<Vec<String>>())
            .collect();
        per_depth[subset.len()] += tuples.len();
    }
    per_depth
}

fn rows_at_depth(report: &Report, depth: usize) -> usize {
    report.rows().iter().filter(|r| r.interaction_count == depth).count()
}

// ============================================================================
// END-TO-END EXAMPLE
// ============================================================================

#[test]
fn test_mean_score_by_department() {
    let def = HotSpotDefinition::new(["Department", "Level"], 2);
    let report = run_analysis(EmployeeFixture::dataset(), def, mean_of("Score"));

    let baseline = report.baseline().unwrap();
    assert_eq!(baseline.n_rows, 4);
    assert_metric(&report, "Overall", "mean_score", 86.25);

    assert_metric(&report, "Department=Engineering", "mean_score", 91.0);
    assert_metric(&report, "Department=HR", "mean_score", 85.0);
    assert_metric(&report, "Department=Marketing", "mean_score", 78.0);
    assert_eq!(row_by_label(&report, "Department=Engineering").n_rows, 2);
    assert_eq!(row_by_label(&report, "Department=HR").n_rows, 1);

    let departments = report
        .rows()
        .iter()
        .filter(|r| r.interaction_count == 1 && r.combination.contains_feature("Department"))
        .count();
    assert_eq!(departments, 3);

    assert_metric(&report, "Department=Engineering, Level=Senior", "mean_score", 90.0);
    assert_eq!(report.len(), 1 + 3 + 2 + 4);
}

#[test]
fn test_single_interaction_with_row_minimum() {
    let def = HotSpotDefinition::new(["Department", "Level"], 2);
    let mut analyzer = HotSpotAnalyzer::new(EmployeeFixture::dataset(), def, mean_of("Score")).unwrap();
    analyzer.run().unwrap();

    let query = SearchQuery::new().terms(["Department"]).interactions([1]).n_row_minimum(2);
    let found = analyzer.search(None, &query).unwrap();

    let labels: Vec<String> = found.rows().iter().map(|r| r.combination.label()).collect();
    assert_eq!(labels, vec!["Department=Engineering"]);
}

// ============================================================================
// REPORT PROPERTIES
// ============================================================================

#[test]
fn test_exactly_one_baseline_row() {
    let ds = TipsFixture::dataset();
    let def = HotSpotDefinition::new(["sex", "smoker", "day", "time"], 3);
    let report = run_analysis(ds, def, tip_metrics());

    let baselines: Vec<_> = report.rows().iter().filter(|r| r.is_baseline()).collect();
    assert_eq!(baselines.len(), 1);
    assert_eq!(baselines[0].n_rows, 16);
    assert!(report.rows()[0].is_baseline());
}

#[test]
fn test_row_counts_match_observed_combinations() {
    let targets = ["sex", "smoker", "day", "time"];
    let ds = TipsFixture::dataset();
    let expected = observed_tuples_per_depth(&ds, &targets, 3);

    let report = run_analysis(ds, HotSpotDefinition::new(targets, 3), tip_metrics());
    for (depth, &count) in expected.iter().enumerate() {
        assert_eq!(rows_at_depth(&report, depth), count, "interaction count {}", depth);
    }
    assert!(report.rows().iter().all(|r| r.n_rows > 0));
}

#[test]
fn test_slice_sizes_partition_the_dataset() {
    let report = run_analysis(
        TipsFixture::dataset(),
        HotSpotDefinition::new(["sex", "smoker", "day", "time"], 2),
        tip_metrics(),
    );

    let mut totals: std::collections::HashMap<Vec<String>, usize> = Default::default();
    for row in report.rows().iter().filter(|r| !r.is_baseline()) {
        let key = row.combination.features().map(str::to_string).collect();
        *totals.entry(key).or_default() += row.n_rows;
    }
    assert_eq!(totals.len(), 4 + 6);
    assert!(totals.values().all(|&n| n == 16));
}

#[test]
fn test_rows_grouped_by_interaction_count() {
    let report = run_analysis(
        TipsFixture::dataset(),
        HotSpotDefinition::new(["sex", "smoker", "day"], 3),
        tip_metrics(),
    );
    let counts: Vec<usize> = report.rows().iter().map(|r| r.interaction_count).collect();
    assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(report.interaction_counts(), vec![0, 1, 2, 3]);
    assert_eq!(report.metric_names(), &["avg_tips", "avg_tip_perc"]);
}

#[test]
fn test_tip_metrics_are_rounded_means() {
    let report = run_analysis(
        TipsFixture::dataset(),
        HotSpotDefinition::new(["day", "time"], 2),
        tip_metrics(),
    );
    // Fri: 3.00 and 3.50
    assert_metric(&report, "day=Fri", "avg_tips", 3.25);
    // Thur is only ever Lunch
    let thur = row_by_label(&report, "day=Thur, time=Lunch");
    assert_eq!(thur.n_rows, 4);
    assert_eq!(report.metric(thur, "avg_tips"), Some(&Value::Number(3.1775)));
}

#[test]
fn test_parallel_and_sequential_reports_match() {
    let def = HotSpotDefinition::new(["sex", "smoker", "day", "time"], 4);
    let par = run_analysis(TipsFixture::dataset(), def.clone(), tip_metrics());
    let seq = run_analysis(TipsFixture::dataset(), def.with_parallel(false), tip_metrics());
    assert_eq!(par, seq);
}

#[test]
fn test_data_source_order_keeps_first_appearance() {
    let def = HotSpotDefinition::new(["day", "time"], 2).with_sort_order(SortOrder::DataSourceOrder);
    let report = run_analysis(TipsFixture::dataset(), def, tip_metrics());
    let days: Vec<String> = report
        .rows()
        .iter()
        .filter(|r| r.interaction_count == 1)
        .filter_map(|r| r.combination.get("day").map(Value::display_value))
        .collect();
    assert_eq!(days, vec!["Sun", "Sat", "Thur", "Fri"]);
}

// ============================================================================
// POLICIES
// ============================================================================

#[test]
fn test_interaction_limit_is_clamped() {
    let def = HotSpotDefinition::new(["Department", "Level"], 5);
    let report = run_analysis(EmployeeFixture::dataset(), def, mean_of("Score"));
    assert_eq!(report.effective_interaction_limit(), 2);
    assert_eq!(report.interaction_counts(), vec![0, 1, 2]);
}

#[test]
fn test_invalid_configuration_fails_before_running() {
    let ds = EmployeeFixture::dataset();
    let too_few = HotSpotDefinition::new(["Department"], 2);
    let low_limit = HotSpotDefinition::new(["Department", "Level"], 1);
    let unknown = HotSpotDefinition::new(["Department", "Team"], 2);
    for def in [too_few, low_limit, unknown] {
        assert!(matches!(
            HotSpotAnalyzer::new(ds.clone(), def, mean_of("Score")),
            Err(HotSpotError::InvalidConfiguration(_))
        ));
    }
}

#[test]
fn test_failing_slices_are_counted_when_skipped() {
    // "fare" is missing on every row, so each mean divides by zero.
    let ds = TitanicFixture::dataset().with_constant_column("fare", Value::Empty).unwrap();
    let def = HotSpotDefinition::new(["class", "sex"], 2);

    let mut strict = HotSpotAnalyzer::new(ds.clone(), def.clone(), mean_of("fare")).unwrap();
    assert!(matches!(strict.run(), Err(HotSpotError::ObjectiveFunction { .. })));

    let lenient = def.with_failure_policy(FailurePolicy::SkipFailing);
    let report = run_analysis(ds, lenient, mean_of("fare"));
    assert!(report.is_empty());
    assert_eq!(report.skipped_count(), 1 + 3 + 2 + 6);
    assert!(report.skipped().iter().all(|s| s.reason.contains("division by zero")));
}

#[test]
fn test_grouped_baseline_with_named_aggregation() {
    let def = HotSpotDefinition::new(["class", "sex", "deck"], 2)
        .with_baseline_mode(BaselineMode::GroupedByMarker { marker: "overall".into() });
    let report = run_analysis(TitanicFixture::dataset(), def, survival_metrics());

    assert_metric(&report, "Overall", "survivors", 4.0);
    assert_metric(&report, "Overall", "survival_rate", 0.5);
    assert_metric(&report, "class=First", "survival_rate", 0.6667);
}

#[test]
fn test_missing_values_form_their_own_category() {
    let def = HotSpotDefinition::new(["class", "deck"], 2);
    let report = run_analysis(TitanicFixture::dataset(), def.clone(), survival_metrics());
    assert_eq!(row_by_label(&report, "deck=(blank)").n_rows, 5);
    assert_metric(&report, "deck=(blank)", "survival_rate", 0.4);

    let dropped = run_analysis(TitanicFixture::dataset(), def.with_drop_missing(true), survival_metrics());
    assert!(dropped.rows().iter().all(|r| !r.combination.contains_value("(blank)")));
    assert_eq!(row_by_label(&dropped, "deck=C").n_rows, 2);
}

// ============================================================================
// CATALOG
// ============================================================================

#[test]
fn test_analysis_over_catalog_dataset() {
    let mut catalog = DatasetCatalog::with_capacity(2);
    catalog.register("employees", || Ok(EmployeeFixture::dataset()));

    let ds = catalog.get("employees").unwrap();
    let def = HotSpotDefinition::new(["Department", "Level"], 2);
    let mut analyzer = HotSpotAnalyzer::new(ds, def, mean_of("Score")).unwrap();
    assert_eq!(analyzer.run().unwrap().len(), 10);
    assert!(catalog.is_cached("employees"));
}
