//! FILENAME: core/hotspot-engine/src/aggregation.rs
//! Built-in named aggregations.
//!
//! `NamedAggregation` is a ready-made objective: a list of
//! `metric <- aggregation(source column)` entries, computed in one pass per
//! column with an incremental accumulator.

use dataset::{SliceView, Value};
use serde::{Deserialize, Serialize};

use crate::objective::{Objective, ObjectiveError, ObjectiveInput, ObjectiveOutput};

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregation functions for metric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AggregationType {
    #[default]
    Sum,
    Count,
    Average,
    Min,
    Max,
    CountNumbers,
    StdDev,
    StdDevP,
    Var,
    VarP,
    Product,
}

/// Accumulator for computing aggregates incrementally.
/// Stores intermediate state needed for all aggregation types.
#[derive(Debug, Clone, Default)]
pub struct AggregateAccumulator {
    pub sum: f64,
    pub count: u64,
    pub count_numbers: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub product: Option<f64>,
    /// Sum of squared differences from the mean (Welford's algorithm).
    pub m2: f64,
    pub mean: f64,
}

impl AggregateAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a numeric value to the accumulator.
    pub fn add_number(&mut self, value: f64) {
        self.count += 1;
        self.count_numbers += 1;
        self.sum += value;

        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        self.product = Some(self.product.map_or(value, |p| p * value));

        // Welford's algorithm for variance
        let delta = value - self.mean;
        self.mean += delta / (self.count_numbers as f64);
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Adds a non-numeric value (only increments count).
    pub fn add_non_number(&mut self) {
        self.count += 1;
    }

    /// Feeds one cell. Empty cells and NaN are missing data and are not
    /// counted at all.
    pub fn add_value(&mut self, value: &Value) {
        match value.as_f64() {
            Some(n) if n.is_nan() => {}
            Some(n) => self.add_number(n),
            None if value.is_empty() => {}
            None => self.add_non_number(),
        }
    }

    /// Computes the final aggregate value.
    /// Averages over zero numeric values are `None`.
    pub fn compute(&self, aggregation: AggregationType) -> Option<f64> {
        let n = self.count_numbers as f64;
        match aggregation {
            AggregationType::Sum => Some(self.sum),
            AggregationType::Count => Some(self.count as f64),
            AggregationType::CountNumbers => Some(n),
            AggregationType::Average => (self.count_numbers > 0).then(|| self.sum / n),
            AggregationType::Min => Some(self.min.unwrap_or(0.0)),
            AggregationType::Max => Some(self.max.unwrap_or(0.0)),
            AggregationType::Product => Some(self.product.unwrap_or(0.0)),
            AggregationType::Var => Some(if self.count_numbers > 1 { self.m2 / (n - 1.0) } else { 0.0 }),
            AggregationType::VarP => Some(if self.count_numbers > 0 { self.m2 / n } else { 0.0 }),
            AggregationType::StdDev => {
                Some(if self.count_numbers > 1 { (self.m2 / (n - 1.0)).sqrt() } else { 0.0 })
            }
            AggregationType::StdDevP => {
                Some(if self.count_numbers > 0 { (self.m2 / n).sqrt() } else { 0.0 })
            }
        }
    }
}

// ============================================================================
// NAMED AGGREGATION OBJECTIVE
// ============================================================================

/// One output metric: `name` <- `aggregation` over `column`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedAgg {
    pub name: String,
    pub column: String,
    pub aggregation: AggregationType,
}

impl NamedAgg {
    pub fn new(name: &str, column: &str, aggregation: AggregationType) -> Self {
        NamedAgg {
            name: name.to_string(),
            column: column.to_string(),
            aggregation,
        }
    }
}

/// An objective built from named aggregations, e.g.
/// `avg_tips <- Average(tip)`, `avg_tip_perc <- Average(tip_perc)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedAggregation {
    pub aggregations: Vec<NamedAgg>,

    /// Round every metric to this many decimals.
    #[serde(default)]
    pub rounding: Option<u32>,
}

impl NamedAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, column: &str, aggregation: AggregationType) -> Self {
        self.aggregations.push(NamedAgg::new(name, column, aggregation));
        self
    }

    pub fn rounded(mut self, places: u32) -> Self {
        self.rounding = Some(places);
        self
    }

    fn compute(&self, view: &SliceView<'_>) -> Result<Vec<Value>, ObjectiveError> {
        let mut values = Vec::with_capacity(self.aggregations.len());
        for agg in &self.aggregations {
            let mut acc = AggregateAccumulator::new();
            for value in view.column(&agg.column)? {
                acc.add_value(value);
            }
            let result = acc.compute(agg.aggregation).ok_or_else(|| {
                ObjectiveError::failed(format!(
                    "{} of '{}' over zero numeric values (division by zero)",
                    agg.name, agg.column
                ))
            })?;
            let value = Value::Number(result);
            values.push(match self.rounding {
                Some(places) => value.rounded(places),
                None => value,
            });
        }
        Ok(values)
    }

    fn names(&self) -> Vec<String> {
        self.aggregations.iter().map(|a| a.name.clone()).collect()
    }
}

impl Objective for NamedAggregation {
    fn aggregate(&self, input: &ObjectiveInput<'_>) -> Result<ObjectiveOutput, ObjectiveError> {
        if self.aggregations.is_empty() {
            return Err(ObjectiveError::failed("no aggregations configured"));
        }
        match input {
            ObjectiveInput::Slice(view) => {
                Ok(ObjectiveOutput::Row(self.names().into_iter().zip(self.compute(view)?).collect()))
            }
            ObjectiveInput::Grouped(grouped) => {
                let mut index = Vec::with_capacity(grouped.len());
                let mut cells = Vec::with_capacity(grouped.len());
                for (key, view) in grouped.groups() {
                    index.push(key.display_value());
                    cells.push(self.compute(view)?);
                }
                Ok(ObjectiveOutput::Table {
                    index,
                    columns: self.names(),
                    cells,
                })
            }
        }
    }
}
