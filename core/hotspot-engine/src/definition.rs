//! FILENAME: core/hotspot-engine/src/definition.rs
//! Hot Spot Definition - The serializable configuration.
//!
//! This module contains everything needed to DESCRIBE an analysis run.
//! These structures are designed to be:
//! - Serializable (saved alongside a report, or loaded from JSON)
//! - Immutable snapshots of user intent
//! - Validated against a dataset before any aggregation work starts

use dataset::{ColumnIndex, Dataset};
use log::warn;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::HotSpotError;

/// Fewest target columns an analysis accepts.
pub const MIN_TARGET_COLUMNS: usize = 2;

/// Smallest interaction limit an analysis accepts.
pub const MIN_INTERACTION_LIMIT: usize = 2;

/// Default name of the constant marker column used for the grouped baseline.
pub const OVERALL_MARKER: &str = "overall";

// ============================================================================
// OPTIONS
// ============================================================================

/// Order of the value-combinations emitted for one feature subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortOrder {
    /// Ascending by value, like a sorted group-by (default).
    #[default]
    Ascending,
    Descending,
    /// Order of first appearance in the dataset.
    DataSourceOrder,
}

/// What happens when a slice's objective fails (or a slice is empty).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FailurePolicy {
    /// Abort the run with the first failure.
    #[default]
    FailFast,
    /// Record the slice as skipped and keep going.
    SkipFailing,
}

/// How the baseline ("overall") row is handed to the objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BaselineMode {
    /// The whole dataset as an ungrouped slice.
    #[default]
    Slice,
    /// The whole dataset grouped by a constant marker column.
    GroupedByMarker {
        #[serde(default = "default_marker")]
        marker: String,
    },
}

fn default_marker() -> String {
    OVERALL_MARKER.to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// The complete, serializable definition of a hot spot analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotSpotDefinition {
    /// Categorical columns to slice by (at least two, unique).
    pub target_columns: Vec<String>,

    /// Maximum number of features combined in one slice (at least two).
    /// Values above the number of target columns are clamped.
    pub interaction_limit: usize,

    #[serde(default)]
    pub sort_order: SortOrder,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    #[serde(default)]
    pub baseline_mode: BaselineMode,

    /// Exclude rows with a missing value from the subsets that include
    /// that column. When false, missing is a category of its own.
    #[serde(default)]
    pub drop_missing: bool,

    /// Aggregate slices on the rayon thread pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl HotSpotDefinition {
    pub fn new<I, S>(target_columns: I, interaction_limit: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HotSpotDefinition {
            target_columns: target_columns.into_iter().map(Into::into).collect(),
            interaction_limit,
            sort_order: SortOrder::default(),
            failure_policy: FailurePolicy::default(),
            baseline_mode: BaselineMode::default(),
            drop_missing: false,
            parallel: true,
        }
    }

    pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_baseline_mode(mut self, mode: BaselineMode) -> Self {
        self.baseline_mode = mode;
        self
    }

    pub fn with_drop_missing(mut self, drop_missing: bool) -> Self {
        self.drop_missing = drop_missing;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, HotSpotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, HotSpotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates the definition against a dataset and resolves column positions.
    pub fn plan(&self, dataset: &Dataset) -> Result<AnalysisPlan, HotSpotError> {
        AnalysisPlan::resolve(dataset, &self.target_columns, self.interaction_limit)
    }
}

// ============================================================================
// RESOLVED PLAN
// ============================================================================

/// A definition checked against a concrete dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPlan {
    /// Target column names with their dataset positions, in definition order.
    pub targets: Vec<(String, ColumnIndex)>,

    /// Effective interaction limit (clamped to the number of targets).
    pub interaction_limit: usize,

    /// The limit as requested.
    pub requested_limit: usize,
}

impl AnalysisPlan {
    pub fn resolve(
        dataset: &Dataset,
        target_columns: &[String],
        interaction_limit: usize,
    ) -> Result<Self, HotSpotError> {
        if target_columns.len() < MIN_TARGET_COLUMNS {
            return Err(HotSpotError::InvalidConfiguration(format!(
                "at least {} target columns are required, got {}",
                MIN_TARGET_COLUMNS,
                target_columns.len()
            )));
        }
        if interaction_limit < MIN_INTERACTION_LIMIT {
            return Err(HotSpotError::InvalidConfiguration(format!(
                "interaction limit must be at least {}, got {}",
                MIN_INTERACTION_LIMIT, interaction_limit
            )));
        }

        let mut seen = FxHashSet::default();
        let mut targets = Vec::with_capacity(target_columns.len());
        for name in target_columns {
            if !seen.insert(name.as_str()) {
                return Err(HotSpotError::InvalidConfiguration(format!(
                    "target column '{}' listed more than once",
                    name
                )));
            }
            let index = dataset.column_index(name).ok_or_else(|| {
                HotSpotError::InvalidConfiguration(format!(
                    "target column '{}' is not in the dataset",
                    name
                ))
            })?;
            targets.push((name.clone(), index));
        }

        let effective = interaction_limit.min(targets.len());
        if effective < interaction_limit {
            warn!(
                "[HotSpot] interaction limit {} exceeds {} target columns; clamping to {}",
                interaction_limit,
                targets.len(),
                effective
            );
        }

        Ok(AnalysisPlan {
            targets,
            interaction_limit: effective,
            requested_limit: interaction_limit,
        })
    }

    pub fn target_names(&self) -> Vec<String> {
        self.targets.iter().map(|(n, _)| n.clone()).collect()
    }
}
