//! FILENAME: core/hotspot-engine/src/report.rs
//! Hot Spot Report - the output of one analysis run.
//!
//! A report is a flat table: one row per (feature subset, value combination)
//! with the combination itself, its interaction count, the slice's row count
//! and the metric columns. Reports are immutable once built; searching
//! produces a new report holding a subset of the rows.

use std::collections::BTreeSet;
use std::cmp::Ordering;

use dataset::{compare_values, Value};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::combination::Combination;
use crate::error::HotSpotError;
use crate::objective::MetricRow;

/// Fixed leading columns of the tabular form.
pub const COMBINATION_COLUMN: &str = "combination";
pub const INTERACTION_COUNT_COLUMN: &str = "interaction_count";
pub const N_ROWS_COLUMN: &str = "n_rows";

// ============================================================================
// ROWS
// ============================================================================

/// One aggregated slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub combination: Combination,
    pub interaction_count: usize,
    pub n_rows: usize,
    /// Metric values, parallel to `Report::metric_names`.
    pub metrics: Vec<Value>,
}

impl ReportRow {
    pub fn is_baseline(&self) -> bool {
        self.interaction_count == 0
    }
}

/// A slice left out of the report under the skip policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSlice {
    pub combination: Combination,
    pub n_rows: usize,
    pub reason: String,
}

/// The report flattened into header + cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    target_columns: Vec<String>,
    effective_interaction_limit: usize,
    metric_names: Vec<String>,
    rows: Vec<ReportRow>,
    #[serde(default)]
    skipped: Vec<SkippedSlice>,
}

impl Report {
    pub fn target_columns(&self) -> &[String] {
        &self.target_columns
    }

    /// The interaction limit the run actually used (after clamping).
    pub fn effective_interaction_limit(&self) -> usize {
        self.effective_interaction_limit
    }

    pub fn metric_names(&self) -> &[String] {
        &self.metric_names
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn skipped(&self) -> &[SkippedSlice] {
        &self.skipped
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// The overall row, if present.
    pub fn baseline(&self) -> Option<&ReportRow> {
        self.rows.iter().find(|r| r.is_baseline())
    }

    /// Combinations in row order.
    pub fn combo_dicts(&self) -> Vec<&Combination> {
        self.rows.iter().map(|r| &r.combination).collect()
    }

    /// Distinct interaction counts present, ascending.
    pub fn interaction_counts(&self) -> Vec<usize> {
        distinct(self.rows.iter().map(|r| r.interaction_count))
    }

    /// Distinct slice row counts present, ascending.
    pub fn n_row_values(&self) -> Vec<usize> {
        distinct(self.rows.iter().map(|r| r.n_rows))
    }

    /// Display forms of every value appearing in any combination, sorted.
    pub fn distinct_values(&self) -> Vec<String> {
        let values: BTreeSet<String> = self
            .rows
            .iter()
            .flat_map(|r| r.combination.values().map(Value::display_value))
            .collect();
        values.into_iter().collect()
    }

    fn metric_index(&self, name: &str) -> Option<usize> {
        self.metric_names.iter().position(|m| m == name)
    }

    pub fn metric<'r>(&self, row: &'r ReportRow, name: &str) -> Option<&'r Value> {
        self.metric_index(name).and_then(|i| row.metrics.get(i))
    }

    /// The `n` rows with the largest (or smallest) value of `metric`.
    /// Rows without a numeric value for the metric are left out.
    pub fn top_by_metric(
        &self,
        metric: &str,
        n: usize,
        descending: bool,
    ) -> Result<Vec<&ReportRow>, HotSpotError> {
        let idx = self.metric_index(metric).ok_or_else(|| {
            HotSpotError::SearchParameter(format!("unknown metric '{}'", metric))
        })?;

        let mut ranked: Vec<(&ReportRow, f64)> = self
            .rows
            .iter()
            .filter_map(|r| r.metrics.get(idx).and_then(Value::as_f64).map(|v| (r, v)))
            .filter(|(_, v)| !v.is_nan())
            .collect();
        ranked.sort_by(|a, b| {
            let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
            if descending { ord.reverse() } else { ord }
        });
        Ok(ranked.into_iter().take(n).map(|(r, _)| r).collect())
    }

    /// Flat table: combination label, interaction count, row count, metrics.
    pub fn to_table(&self) -> ReportTable {
        let mut columns = vec![
            COMBINATION_COLUMN.to_string(),
            INTERACTION_COUNT_COLUMN.to_string(),
            N_ROWS_COLUMN.to_string(),
        ];
        columns.extend(self.metric_names.iter().cloned());

        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut cells = Vec::with_capacity(columns.len());
                cells.push(Value::Text(r.combination.label()));
                cells.push(Value::Number(r.interaction_count as f64));
                cells.push(Value::Number(r.n_rows as f64));
                cells.extend(r.metrics.iter().cloned());
                cells
            })
            .collect();

        ReportTable { columns, rows }
    }

    /// A report with the same header and only the rows `keep` accepts.
    pub(crate) fn filtered<F>(&self, keep: F) -> Report
    where
        F: Fn(&ReportRow) -> bool,
    {
        Report {
            target_columns: self.target_columns.clone(),
            effective_interaction_limit: self.effective_interaction_limit,
            metric_names: self.metric_names.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
            skipped: self.skipped.clone(),
        }
    }
}

fn distinct(values: impl Iterator<Item = usize>) -> Vec<usize> {
    values.collect::<BTreeSet<_>>().into_iter().collect()
}

// ============================================================================
// BUILDER
// ============================================================================

/// Collects slice results and lines their metrics up into columns.
/// Metric columns are the union of names in first-seen order; a row
/// without a given metric gets `Empty` there.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    metric_names: Vec<String>,
    metric_slot: FxHashMap<String, usize>,
    pending: Vec<(usize, Combination, usize, MetricRow)>,
    skipped: Vec<(usize, SkippedSlice)>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a computed slice. `ordinal` is its canonical position.
    pub fn push(&mut self, ordinal: usize, combination: Combination, n_rows: usize, metrics: MetricRow) {
        for (name, _) in &metrics {
            if !self.metric_slot.contains_key(name) {
                self.metric_slot.insert(name.clone(), self.metric_names.len());
                self.metric_names.push(name.clone());
            }
        }
        self.pending.push((ordinal, combination, n_rows, metrics));
    }

    pub fn push_skipped(&mut self, ordinal: usize, skipped: SkippedSlice) {
        self.skipped.push((ordinal, skipped));
    }

    /// Restores canonical order and assembles the report.
    pub fn finish(mut self, target_columns: Vec<String>, effective_interaction_limit: usize) -> Report {
        self.pending.sort_by_key(|(ordinal, ..)| *ordinal);
        self.skipped.sort_by_key(|(ordinal, _)| *ordinal);

        let width = self.metric_names.len();
        let metric_slot = self.metric_slot;
        let rows = self
            .pending
            .into_iter()
            .map(|(_, combination, n_rows, metrics)| {
                let mut aligned = vec![Value::Empty; width];
                for (name, value) in metrics {
                    if let Some(&slot) = metric_slot.get(&name) {
                        aligned[slot] = value;
                    }
                }
                ReportRow {
                    interaction_count: combination.len(),
                    combination,
                    n_rows,
                    metrics: aligned,
                }
            })
            .collect();

        Report {
            target_columns,
            effective_interaction_limit,
            metric_names: self.metric_names,
            rows,
            skipped: self.skipped.into_iter().map(|(_, s)| s).collect(),
        }
    }
}

/// Ascending comparison of two rows by a metric, for callers that sort reports.
pub fn compare_by_metric(report: &Report, metric: &str, a: &ReportRow, b: &ReportRow) -> Ordering {
    match (report.metric(a, metric), report.metric(b, metric)) {
        (Some(va), Some(vb)) => compare_values(va, vb),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Report {
        let mut builder = ReportBuilder::new();
        // Pushed out of order, as parallel workers would.
        builder.push(
            2,
            Combination::new([("Department", Value::text("HR"))]),
            1,
            vec![("mean_score".into(), 85.0.into())],
        );
        builder.push(0, Combination::overall(), 4, vec![("mean_score".into(), 86.25.into())]);
        builder.push(
            1,
            Combination::new([("Department", Value::text("Engineering"))]),
            2,
            vec![("mean_score".into(), 91.0.into()), ("max_score".into(), 92.0.into())],
        );
        builder.push_skipped(
            3,
            SkippedSlice {
                combination: Combination::new([("Department", Value::text("Marketing"))]),
                n_rows: 1,
                reason: "division by zero".into(),
            },
        );
        builder.finish(vec!["Department".into(), "Level".into()], 2)
    }

    #[test]
    fn rows_come_back_in_canonical_order() {
        let report = sample();
        let labels: Vec<_> = report.rows().iter().map(|r| r.combination.label()).collect();
        assert_eq!(labels, vec!["Overall", "Department=Engineering", "Department=HR"]);
        assert!(report.rows()[0].is_baseline());
        assert_eq!(report.skipped_count(), 1);
    }

    #[test]
    fn metric_columns_are_a_union() {
        let report = sample();
        assert_eq!(report.metric_names(), &["mean_score", "max_score"]);
        let baseline = report.baseline().unwrap();
        assert_eq!(report.metric(baseline, "max_score"), Some(&Value::Empty));
        assert_eq!(report.metric(&report.rows()[1], "max_score"), Some(&Value::Number(92.0)));
    }

    #[test]
    fn projections() {
        let report = sample();
        assert_eq!(report.interaction_counts(), vec![0, 1]);
        assert_eq!(report.n_row_values(), vec![1, 2, 4]);
        assert_eq!(report.combo_dicts().len(), 3);
        assert_eq!(report.distinct_values(), vec!["Engineering", "HR"]);
    }

    #[test]
    fn table_layout() {
        let table = sample().to_table();
        assert_eq!(
            table.columns,
            vec!["combination", "interaction_count", "n_rows", "mean_score", "max_score"]
        );
        assert_eq!(table.rows[2][0], Value::text("Department=HR"));
        assert_eq!(table.rows[2][2], Value::Number(1.0));
    }

    #[test]
    fn ranking_by_metric() {
        let report = sample();
        let top = report.top_by_metric("mean_score", 2, true).unwrap();
        assert_eq!(top[0].combination.label(), "Department=Engineering");
        assert_eq!(top[1].combination.label(), "Overall");
        assert!(report.top_by_metric("median", 1, true).is_err());

        let mut rows: Vec<_> = report.rows().iter().collect();
        rows.sort_by(|a, b| compare_by_metric(&report, "mean_score", a, b));
        assert_eq!(rows[0].combination.label(), "Department=HR");
    }

    #[test]
    fn serde_round_trip() {
        let report = sample();
        let json = serde_json::to_string(&report).unwrap();
        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn non_finite_metrics_round_trip() {
        let mut builder = ReportBuilder::new();
        builder.push(
            0,
            Combination::overall(),
            3,
            vec![("ratio".into(), f64::NAN.into()), ("peak".into(), f64::INFINITY.into())],
        );
        let report = builder.finish(vec!["Department".into()], 1);

        let json = serde_json::to_string(&report).unwrap();
        let back: Report = serde_json::from_str(&json).unwrap();
        let baseline = back.baseline().unwrap();
        assert!(back
            .metric(baseline, "ratio")
            .and_then(Value::as_f64)
            .is_some_and(f64::is_nan));
        assert_eq!(back.metric(baseline, "peak"), Some(&Value::Number(f64::INFINITY)));
    }
}
