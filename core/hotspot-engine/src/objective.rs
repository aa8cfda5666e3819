//! FILENAME: core/hotspot-engine/src/objective.rs
//! Aggregator Adapter - the seam between the engine and caller-supplied
//! aggregation logic.
//!
//! The engine only knows the `Objective` trait. Whatever an objective
//! returns (a scalar, a named row, or a small table) is canonicalized here
//! into a flat list of `(metric name, value)` pairs; shapes that cannot be
//! flattened are rejected with a typed error.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use dataset::{DatasetError, GroupedView, SliceView, Value};
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::combination::Combination;
use crate::error::HotSpotError;

/// Metric name used when an objective returns a bare scalar.
pub const SCALAR_METRIC: &str = "value";

/// Flat `(metric name, value)` pairs in objective order.
pub type MetricRow = Vec<(String, Value)>;

// ============================================================================
// OBJECTIVE CONTRACT
// ============================================================================

/// What an objective is asked to aggregate.
#[derive(Debug, Clone)]
pub enum ObjectiveInput<'a> {
    /// One already-filtered slice.
    Slice(SliceView<'a>),
    /// A grouped view (the baseline grouped by its marker column).
    Grouped(GroupedView<'a>),
}

impl<'a> ObjectiveInput<'a> {
    pub fn row_count(&self) -> usize {
        match self {
            ObjectiveInput::Slice(view) => view.len(),
            ObjectiveInput::Grouped(grouped) => grouped.row_count(),
        }
    }

    pub fn as_slice(&self) -> Option<&SliceView<'a>> {
        match self {
            ObjectiveInput::Slice(view) => Some(view),
            ObjectiveInput::Grouped(_) => None,
        }
    }

    pub fn as_grouped(&self) -> Option<&GroupedView<'a>> {
        match self {
            ObjectiveInput::Grouped(grouped) => Some(grouped),
            ObjectiveInput::Slice(_) => None,
        }
    }
}

/// The shapes an objective may return.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectiveOutput {
    /// A single unnamed metric, reported as `"value"`.
    Scalar(Value),
    /// One row of named metrics.
    Row(Vec<(String, Value)>),
    /// A small table with row labels (`index`) and column labels.
    Table {
        index: Vec<String>,
        columns: Vec<String>,
        cells: Vec<Vec<Value>>,
    },
}

#[derive(Error, Debug)]
pub enum ObjectiveError {
    #[error("{0}")]
    Failed(String),

    #[error("unsupported output shape: {0}")]
    UnsupportedShape(String),

    #[error("objective panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

impl ObjectiveError {
    pub fn failed(message: impl Into<String>) -> Self {
        ObjectiveError::Failed(message.into())
    }
}

/// A caller-supplied aggregation strategy.
pub trait Objective: Send + Sync {
    fn aggregate(&self, input: &ObjectiveInput<'_>) -> Result<ObjectiveOutput, ObjectiveError>;
}

impl<F> Objective for F
where
    F: Fn(&ObjectiveInput<'_>) -> Result<ObjectiveOutput, ObjectiveError> + Send + Sync,
{
    fn aggregate(&self, input: &ObjectiveInput<'_>) -> Result<ObjectiveOutput, ObjectiveError> {
        self(input)
    }
}

/// Pins a closure to the objective signature so its argument types are inferred.
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&ObjectiveInput<'_>) -> Result<ObjectiveOutput, ObjectiveError> + Send + Sync,
{
    f
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Canonicalizes any supported output shape into a flat metric row.
pub fn normalize_output(output: ObjectiveOutput) -> Result<MetricRow, ObjectiveError> {
    let row = match output {
        ObjectiveOutput::Scalar(value) => vec![(SCALAR_METRIC.to_string(), value)],
        ObjectiveOutput::Row(row) => row,
        ObjectiveOutput::Table { index, columns, cells } => flatten_table(index, columns, cells)?,
    };

    if row.is_empty() {
        return Err(ObjectiveError::UnsupportedShape("no metrics returned".to_string()));
    }
    let mut seen = FxHashSet::default();
    for (name, _) in &row {
        if !seen.insert(name.as_str()) {
            return Err(ObjectiveError::UnsupportedShape(format!(
                "metric '{}' returned more than once",
                name
            )));
        }
    }
    Ok(row)
}

fn flatten_table(
    index: Vec<String>,
    columns: Vec<String>,
    cells: Vec<Vec<Value>>,
) -> Result<MetricRow, ObjectiveError> {
    if cells.len() != index.len() || cells.iter().any(|r| r.len() != columns.len()) {
        return Err(ObjectiveError::UnsupportedShape(format!(
            "table is not rectangular ({} labels, {} columns)",
            index.len(),
            columns.len()
        )));
    }

    // One row: the columns are the metrics.
    if cells.len() == 1 {
        let row = cells.into_iter().next().unwrap_or_default();
        return Ok(columns.into_iter().zip(row).collect());
    }

    // Several rows: each row must carry exactly one value, named by its label.
    // This is the shape of a named aggregation over different source columns.
    let mut flat = Vec::with_capacity(index.len());
    for (label, row) in index.into_iter().zip(cells) {
        let mut present = row.into_iter().filter(|v| !is_missing(v));
        match (present.next(), present.next()) {
            (Some(value), None) => flat.push((label, value)),
            (None, _) => {
                return Err(ObjectiveError::UnsupportedShape(format!(
                    "row '{}' has no value",
                    label
                )))
            }
            (Some(_), Some(_)) => {
                return Err(ObjectiveError::UnsupportedShape(format!(
                    "row '{}' has more than one value",
                    label
                )))
            }
        }
    }
    Ok(flat)
}

fn is_missing(value: &Value) -> bool {
    match value {
        Value::Empty => true,
        Value::Number(n) => n.is_nan(),
        _ => false,
    }
}

// ============================================================================
// ADAPTER
// ============================================================================

/// Invokes the objective for one combination and attaches the combination
/// and slice size to any failure.
#[derive(Clone)]
pub struct AggregatorAdapter {
    objective: Arc<dyn Objective>,
}

impl AggregatorAdapter {
    pub fn new(objective: Arc<dyn Objective>) -> Self {
        AggregatorAdapter { objective }
    }

    /// Aggregates one already-filtered slice.
    pub fn aggregate_slice(
        &self,
        combination: &Combination,
        view: SliceView<'_>,
    ) -> Result<MetricRow, HotSpotError> {
        self.invoke(combination, ObjectiveInput::Slice(view))
    }

    /// Aggregates a grouped view; a one-group table flattens to its columns.
    pub fn aggregate_grouped(
        &self,
        combination: &Combination,
        grouped: GroupedView<'_>,
    ) -> Result<MetricRow, HotSpotError> {
        self.invoke(combination, ObjectiveInput::Grouped(grouped))
    }

    fn invoke(
        &self,
        combination: &Combination,
        input: ObjectiveInput<'_>,
    ) -> Result<MetricRow, HotSpotError> {
        let slice_rows = input.row_count();
        let wrap = |source: ObjectiveError| HotSpotError::ObjectiveFunction {
            combination: combination.clone(),
            slice_rows,
            source,
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.objective.aggregate(&input)));
        let output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return Err(wrap(err)),
            Err(payload) => return Err(wrap(ObjectiveError::Panicked(panic_message(payload.as_ref())))),
        };

        normalize_output(output).map_err(wrap)
    }
}

impl std::fmt::Debug for AggregatorAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregatorAdapter").finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataset::Dataset;

    fn scores() -> Dataset {
        Dataset::from_rows(
            ["Department", "Score"],
            vec![
                vec!["HR".into(), 85.0.into()],
                vec!["Engineering".into(), 92.0.into()],
            ],
        )
        .unwrap()
    }

    fn mean_score() -> impl Objective {
        from_fn(|input| {
            let view = input
                .as_slice()
                .ok_or_else(|| ObjectiveError::failed("expected a slice"))?;
            let scores = view.numbers("Score")?;
            if scores.is_empty() {
                return Err(ObjectiveError::failed("division by zero"));
            }
            Ok(ObjectiveOutput::Scalar(Value::Number(
                scores.iter().sum::<f64>() / scores.len() as f64,
            )))
        })
    }

    #[test]
    fn scalar_becomes_value_metric() {
        let row = normalize_output(ObjectiveOutput::Scalar(Value::Number(1.0))).unwrap();
        assert_eq!(row, vec![(SCALAR_METRIC.to_string(), Value::Number(1.0))]);
    }

    #[test]
    fn one_row_table_flattens_by_column() {
        let row = normalize_output(ObjectiveOutput::Table {
            index: vec!["overall".into()],
            columns: vec!["survivors".into(), "survival_rate".into()],
            cells: vec![vec![Value::Number(342.0), Value::Number(0.3838)]],
        })
        .unwrap();
        assert_eq!(row[1], ("survival_rate".to_string(), Value::Number(0.3838)));
    }

    #[test]
    fn diagonal_table_flattens_by_label() {
        // Named aggregation over two source columns: one value per row.
        let row = normalize_output(ObjectiveOutput::Table {
            index: vec!["avg_tips".into(), "avg_tip_perc".into()],
            columns: vec!["tip".into(), "tip_perc".into()],
            cells: vec![
                vec![Value::Number(3.0), Value::Number(f64::NAN)],
                vec![Value::Empty, Value::Number(0.16)],
            ],
        })
        .unwrap();
        assert_eq!(
            row,
            vec![
                ("avg_tips".to_string(), Value::Number(3.0)),
                ("avg_tip_perc".to_string(), Value::Number(0.16)),
            ]
        );
    }

    #[test]
    fn rejects_unflattenable_shapes() {
        let dense = ObjectiveOutput::Table {
            index: vec!["a".into(), "b".into()],
            columns: vec!["x".into(), "y".into()],
            cells: vec![vec![1.0.into(), 2.0.into()], vec![3.0.into(), 4.0.into()]],
        };
        assert!(matches!(normalize_output(dense), Err(ObjectiveError::UnsupportedShape(_))));
        assert!(normalize_output(ObjectiveOutput::Row(vec![])).is_err());
        let dup = ObjectiveOutput::Row(vec![("m".into(), 1.0.into()), ("m".into(), 2.0.into())]);
        assert!(normalize_output(dup).is_err());
    }

    #[test]
    fn failures_carry_combination_and_slice_size() {
        let ds = scores();
        let adapter = AggregatorAdapter::new(Arc::new(mean_score()));
        let combo = Combination::new([("Department", Value::text("Sales"))]);
        let empty = ds.select_where(&[(0, &Value::text("Sales"))]);

        match adapter.aggregate_slice(&combo, empty) {
            Err(HotSpotError::ObjectiveFunction { combination, slice_rows, .. }) => {
                assert_eq!(combination, combo);
                assert_eq!(slice_rows, 0);
            }
            other => panic!("expected objective error, got {:?}", other),
        }
    }

    #[test]
    fn panics_are_caught() {
        let ds = scores();
        let adapter = AggregatorAdapter::new(Arc::new(from_fn(|_| panic!("boom"))));
        let err = adapter.aggregate_slice(&Combination::overall(), ds.view()).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn grouped_input_reaches_objective() {
        let ds = scores();
        let adapter = AggregatorAdapter::new(Arc::new(from_fn(|input| {
            let grouped = input
                .as_grouped()
                .ok_or_else(|| ObjectiveError::failed("expected groups"))?;
            Ok(ObjectiveOutput::Row(vec![
                ("groups".to_string(), Value::Number(grouped.len() as f64)),
                ("rows".to_string(), Value::Number(input.row_count() as f64)),
            ]))
        })));
        let grouped = GroupedView::constant(ds.view(), "overall");
        let row = adapter.aggregate_grouped(&Combination::overall(), grouped).unwrap();
        assert_eq!(row[0].1, Value::Number(1.0));
        assert_eq!(row[1].1, Value::Number(2.0));
    }
}
