//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for hot spot engine integration tests.

use dataset::{Dataset, Value};
use hotspot_engine::{
    from_fn, HotSpotAnalyzer, HotSpotDefinition, Objective, ObjectiveError, ObjectiveOutput,
    Report, ReportRow,
};

// ============================================================================
// TEST DATA FIXTURES
// ============================================================================

/// Four employees in three departments.
pub struct EmployeeFixture;

impl EmployeeFixture {
    pub fn headers() -> Vec<&'static str> {
        vec!["Name", "Score", "Department", "Level"]
    }

    pub fn data() -> Vec<(&'static str, f64, &'static str, &'static str)> {
        vec![
            ("Alice", 85.0, "HR", "Senior"),
            ("Bob", 92.0, "Engineering", "Junior"),
            ("Carol", 78.0, "Marketing", "Senior"),
            ("Dave", 90.0, "Engineering", "Senior"),
        ]
    }

    pub fn dataset() -> Dataset {
        let rows = Self::data()
            .into_iter()
            .map(|(name, score, dept, level)| vec![name.into(), score.into(), dept.into(), level.into()])
            .collect::<Vec<Vec<Value>>>();
        Dataset::from_rows(Self::headers(), rows).unwrap()
    }
}

/// A small restaurant-tips table.
pub struct TipsFixture;

impl TipsFixture {
    pub fn headers() -> Vec<&'static str> {
        vec!["total_bill", "tip", "sex", "smoker", "day", "time", "size"]
    }

    pub fn data() -> Vec<(f64, f64, &'static str, &'static str, &'static str, &'static str, f64)> {
        vec![
            (16.99, 1.01, "Female", "No", "Sun", "Dinner", 2.0),
            (10.34, 1.66, "Male", "No", "Sun", "Dinner", 3.0),
            (21.01, 3.50, "Male", "No", "Sun", "Dinner", 3.0),
            (23.68, 3.31, "Male", "No", "Sun", "Dinner", 2.0),
            (24.59, 3.61, "Female", "No", "Sun", "Dinner", 4.0),
            (20.65, 3.35, "Male", "No", "Sat", "Dinner", 3.0),
            (17.92, 4.08, "Male", "No", "Sat", "Dinner", 2.0),
            (20.29, 2.75, "Female", "No", "Sat", "Dinner", 2.0),
            (15.77, 2.23, "Female", "No", "Sat", "Dinner", 2.0),
            (38.07, 4.00, "Male", "Yes", "Sat", "Dinner", 3.0),
            (27.20, 4.00, "Male", "No", "Thur", "Lunch", 4.0),
            (22.76, 3.00, "Male", "No", "Thur", "Lunch", 2.0),
            (17.29, 2.71, "Male", "No", "Thur", "Lunch", 2.0),
            (19.44, 3.00, "Male", "Yes", "Thur", "Lunch", 2.0),
            (28.97, 3.00, "Male", "Yes", "Fri", "Dinner", 2.0),
            (22.49, 3.50, "Male", "No", "Fri", "Dinner", 2.0),
        ]
    }

    /// Tips with a derived `tip_perc` column (tip / total_bill).
    pub fn dataset() -> Dataset {
        let mut headers = Self::headers();
        headers.push("tip_perc");
        let rows = Self::data()
            .into_iter()
            .map(|(bill, tip, sex, smoker, day, time, size)| {
                vec![
                    bill.into(),
                    tip.into(),
                    sex.into(),
                    smoker.into(),
                    day.into(),
                    time.into(),
                    size.into(),
                    (tip / bill).into(),
                ]
            })
            .collect::<Vec<Vec<Value>>>();
        Dataset::from_rows(headers, rows).unwrap()
    }
}

/// Titanic-like passengers with a missing `deck` for some rows.
pub struct TitanicFixture;

impl TitanicFixture {
    pub fn headers() -> Vec<&'static str> {
        vec!["survived", "class", "sex", "deck", "alone"]
    }

    pub fn dataset() -> Dataset {
        let rows: Vec<Vec<Value>> = vec![
            vec![0.0.into(), "Third".into(), "male".into(), Value::Empty, false.into()],
            vec![1.0.into(), "First".into(), "female".into(), "C".into(), false.into()],
            vec![1.0.into(), "Third".into(), "female".into(), Value::Empty, true.into()],
            vec![1.0.into(), "First".into(), "female".into(), "C".into(), false.into()],
            vec![0.0.into(), "Third".into(), "male".into(), Value::Empty, true.into()],
            vec![0.0.into(), "First".into(), "male".into(), "E".into(), true.into()],
            vec![0.0.into(), "Second".into(), "male".into(), Value::Empty, true.into()],
            vec![1.0.into(), "Second".into(), "female".into(), Value::Empty, false.into()],
        ];
        Dataset::from_rows(Self::headers(), rows).unwrap()
    }
}

// ============================================================================
// OBJECTIVES
// ============================================================================

/// Mean of one numeric column; fails on a slice without numbers.
pub fn mean_of(column: &'static str) -> impl Objective {
    from_fn(move |input| {
        let view = input
            .as_slice()
            .ok_or_else(|| ObjectiveError::failed("expected an ungrouped slice"))?;
        let values = view.numbers(column)?;
        if values.is_empty() {
            return Err(ObjectiveError::failed("division by zero"));
        }
        Ok(ObjectiveOutput::Row(vec![(
            format!("mean_{}", column.to_lowercase()),
            Value::Number(values.iter().sum::<f64>() / values.len() as f64),
        )]))
    })
}

/// Runs an analysis and returns its report.
pub fn run_analysis(dataset: Dataset, definition: HotSpotDefinition, objective: impl Objective + 'static) -> Report {
    let mut analyzer = HotSpotAnalyzer::new(dataset, definition, objective).unwrap();
    analyzer.run().unwrap().clone()
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

/// Finds the row whose combination label is `label`.
pub fn row_by_label<'r>(report: &'r Report, label: &str) -> &'r ReportRow {
    report
        .rows()
        .iter()
        .find(|r| r.combination.label() == label)
        .unwrap_or_else(|| panic!("no row labelled '{}'", label))
}

/// Assert that a row's metric is a number close to `expected`.
pub fn assert_metric(report: &Report, label: &str, metric: &str, expected: f64) {
    let row = row_by_label(report, label);
    match report.metric(row, metric) {
        Some(Value::Number(n)) => {
            assert!(
                (n - expected).abs() < 0.001,
                "[{}] {} expected {} but got {}",
                label, metric, expected, n
            );
        }
        other => panic!(
            "[{}] {} expected Number({}) but got {:?}",
            label, metric, expected, other
        ),
    }
}
