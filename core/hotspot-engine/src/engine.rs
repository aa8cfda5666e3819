//! FILENAME: core/hotspot-engine/src/engine.rs
//! Hot Spot Analyzer - runs an analysis and keeps its latest report.
//!
//! A run goes through four stages:
//! 1. Enumerate every observed combination (baseline first).
//! 2. Select each combination's slice.
//! 3. Aggregate the slice through the objective.
//! 4. Merge the per-slice results back into canonical order.
//!
//! Stages 2 and 3 are independent per slice and run on the rayon pool
//! when the definition asks for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dataset::{Dataset, GroupedView};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::definition::{AnalysisPlan, BaselineMode, FailurePolicy, HotSpotDefinition};
use crate::enumerator::{combinations_for_depth, CombinationEnumerator, SliceCandidate};
use crate::error::HotSpotError;
use crate::objective::{AggregatorAdapter, MetricRow, Objective};
use crate::report::{Report, ReportBuilder, SkippedSlice};
use crate::search::{search_report, SearchQuery};
use crate::selector::SliceSelector;

// ============================================================================
// CANCELLATION
// ============================================================================

/// Shared flag a caller flips to stop a running analysis.
/// Checked before each slice is aggregated.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ============================================================================
// ANALYZER
// ============================================================================

/// Result of evaluating one slice.
enum SliceOutcome {
    Computed { n_rows: usize, metrics: MetricRow },
    Skipped(SkippedSlice),
}

pub struct HotSpotAnalyzer {
    dataset: Arc<Dataset>,
    definition: HotSpotDefinition,
    plan: AnalysisPlan,
    adapter: AggregatorAdapter,
    report: Option<Report>,
}

impl HotSpotAnalyzer {
    /// Validates the definition against the dataset. No aggregation work
    /// happens until `run`.
    pub fn new(
        dataset: impl Into<Arc<Dataset>>,
        definition: HotSpotDefinition,
        objective: impl Objective + 'static,
    ) -> Result<Self, HotSpotError> {
        Self::with_shared_objective(dataset, definition, Arc::new(objective))
    }

    pub fn with_shared_objective(
        dataset: impl Into<Arc<Dataset>>,
        definition: HotSpotDefinition,
        objective: Arc<dyn Objective>,
    ) -> Result<Self, HotSpotError> {
        let dataset = dataset.into();
        let plan = definition.plan(&dataset)?;
        Ok(HotSpotAnalyzer {
            dataset,
            definition,
            plan,
            adapter: AggregatorAdapter::new(objective),
            report: None,
        })
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn definition(&self) -> &HotSpotDefinition {
        &self.definition
    }

    pub fn plan(&self) -> &AnalysisPlan {
        &self.plan
    }

    /// Runs the analysis to completion and replaces the stored report.
    pub fn run(&mut self) -> Result<&Report, HotSpotError> {
        self.run_with_cancel(&CancellationToken::new())
    }

    /// Like `run`, stopping with `Cancelled` once `token` is set.
    /// On any error the previous report stays in place.
    pub fn run_with_cancel(&mut self, token: &CancellationToken) -> Result<&Report, HotSpotError> {
        let report = self.build_report(token)?;
        Ok(&*self.report.insert(report))
    }

    /// The report of the latest successful run.
    pub fn export_report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Filters `report`, or the latest report when none is given.
    pub fn search(&self, report: Option<&Report>, query: &SearchQuery) -> Result<Report, HotSpotError> {
        let report = report.or(self.report.as_ref()).ok_or(HotSpotError::NotRun)?;
        search_report(report, query)
    }

    // ========================================================================
    // RUN INTERNALS
    // ========================================================================

    fn build_report(&self, token: &CancellationToken) -> Result<Report, HotSpotError> {
        if token.is_cancelled() {
            return Err(HotSpotError::Cancelled);
        }

        let enumerator = CombinationEnumerator::new(
            &self.dataset,
            &self.plan,
            self.definition.sort_order,
            self.definition.drop_missing,
        );
        let candidates = enumerator.enumerate();

        info!(
            "[HotSpot] Run started: {} slices over {} rows, targets {:?}, limit {}",
            candidates.len(),
            self.dataset.row_count(),
            enumerator.target_names(),
            enumerator.interaction_limit()
        );
        let target_count = enumerator.target_names().len();
        for depth in 0..=enumerator.interaction_limit() {
            let count = candidates.iter().filter(|c| c.interaction_count() == depth).count();
            debug!(
                "[HotSpot] Interaction count {}: {} slices from {} feature subsets",
                depth,
                count,
                combinations_for_depth(target_count, depth)
            );
        }

        let outcomes = if self.definition.parallel {
            self.evaluate_parallel(&candidates, token)?
        } else {
            self.evaluate_sequential(&candidates, token)?
        };

        let mut builder = ReportBuilder::new();
        for (candidate, outcome) in candidates.into_iter().zip(outcomes) {
            match outcome {
                SliceOutcome::Computed { n_rows, metrics } => {
                    builder.push(candidate.ordinal, candidate.combination, n_rows, metrics)
                }
                SliceOutcome::Skipped(skipped) => builder.push_skipped(candidate.ordinal, skipped),
            }
        }
        let report = builder.finish(self.plan.target_names(), self.plan.interaction_limit);

        info!(
            "[HotSpot] Run finished: {} rows, {} metrics, {} skipped",
            report.len(),
            report.metric_names().len(),
            report.skipped_count()
        );
        Ok(report)
    }

    fn evaluate_sequential(
        &self,
        candidates: &[SliceCandidate],
        token: &CancellationToken,
    ) -> Result<Vec<SliceOutcome>, HotSpotError> {
        let mut outcomes = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if token.is_cancelled() {
                info!("[HotSpot] Run cancelled after {} slices", outcomes.len());
                return Err(HotSpotError::Cancelled);
            }
            outcomes.push(self.evaluate(candidate)?);
        }
        Ok(outcomes)
    }

    /// Evaluates slices on the rayon pool. Once any slice fails the remaining
    /// ones are not started; the failure with the lowest ordinal is returned.
    fn evaluate_parallel(
        &self,
        candidates: &[SliceCandidate],
        token: &CancellationToken,
    ) -> Result<Vec<SliceOutcome>, HotSpotError> {
        let abort = AtomicBool::new(false);

        let results: Vec<Option<Result<SliceOutcome, HotSpotError>>> = candidates
            .par_iter()
            .map(|candidate| {
                if token.is_cancelled() || abort.load(Ordering::Relaxed) {
                    return None;
                }
                let result = self.evaluate(candidate);
                if result.is_err() {
                    abort.store(true, Ordering::Relaxed);
                }
                Some(result)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(results.len());
        let mut incomplete = false;
        for result in results {
            match result {
                Some(Ok(outcome)) => outcomes.push(outcome),
                Some(Err(err)) => return Err(err),
                None => incomplete = true,
            }
        }
        if incomplete || token.is_cancelled() {
            info!("[HotSpot] Run cancelled after {} slices", outcomes.len());
            return Err(HotSpotError::Cancelled);
        }
        Ok(outcomes)
    }

    fn evaluate(&self, candidate: &SliceCandidate) -> Result<SliceOutcome, HotSpotError> {
        let combination = &candidate.combination;
        let view = SliceSelector::new(&self.dataset).select(combination)?;
        debug_assert_eq!(
            view.len(),
            candidate.support,
            "slice size disagrees with enumerated support for [{}]",
            combination
        );
        let n_rows = view.len();

        let result = if combination.is_overall() {
            match &self.definition.baseline_mode {
                BaselineMode::Slice => self.adapter.aggregate_slice(combination, view),
                BaselineMode::GroupedByMarker { marker } => self
                    .adapter
                    .aggregate_grouped(combination, GroupedView::constant(view, marker)),
            }
        } else if view.is_empty() {
            debug_assert!(false, "enumerated combination [{}] matched no rows", combination);
            Err(HotSpotError::EmptySlice { combination: combination.clone() })
        } else {
            self.adapter.aggregate_slice(combination, view)
        };

        match result {
            Ok(metrics) => Ok(SliceOutcome::Computed { n_rows, metrics }),
            Err(err) if self.can_skip(&err) => {
                warn!("[HotSpot] Skipping slice: {}", err);
                Ok(SliceOutcome::Skipped(SkippedSlice {
                    combination: combination.clone(),
                    n_rows,
                    reason: err.to_string(),
                }))
            }
            Err(err) => Err(err),
        }
    }

    fn can_skip(&self, err: &HotSpotError) -> bool {
        self.definition.failure_policy == FailurePolicy::SkipFailing
            && matches!(
                err,
                HotSpotError::ObjectiveFunction { .. } | HotSpotError::EmptySlice { .. }
            )
    }
}

impl std::fmt::Debug for HotSpotAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotSpotAnalyzer")
            .field("rows", &self.dataset.row_count())
            .field("definition", &self.definition)
            .field("has_report", &self.report.is_some())
            .finish()
    }
}
