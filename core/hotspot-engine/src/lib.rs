//! FILENAME: core/hotspot-engine/src/lib.rs
//! Hot spot analysis for tabular data.
//!
//! Given a dataset, a set of categorical target columns and an interaction
//! limit, the engine aggregates every observed feature-value combination with
//! a caller-supplied objective, so slices whose metric departs from the
//! overall baseline can be found and searched.
//!
//! Layers:
//! - `definition`: Serializable configuration (what the analysis IS)
//! - `enumerator`: Which slices exist (observed combinations only)
//! - `selector`: Rows of one slice
//! - `objective` / `aggregation`: How a slice becomes metrics
//! - `report`: The assembled output table
//! - `search`: Filtering a report
//! - `engine`: Running it all

pub mod aggregation;
pub mod combination;
pub mod definition;
pub mod engine;
pub mod enumerator;
pub mod error;
pub mod objective;
pub mod report;
pub mod search;
pub mod selector;

pub use aggregation::{AggregateAccumulator, AggregationType, NamedAgg, NamedAggregation};
pub use combination::{Combination, FeatureSubset, OVERALL_LABEL};
pub use definition::*;
pub use engine::{CancellationToken, HotSpotAnalyzer};
pub use enumerator::{combinations_for_depth, feature_subsets, CombinationEnumerator, SliceCandidate};
pub use error::HotSpotError;
pub use objective::{
    from_fn, normalize_output, AggregatorAdapter, MetricRow, Objective, ObjectiveError,
    ObjectiveInput, ObjectiveOutput, SCALAR_METRIC,
};
pub use report::{compare_by_metric, Report, ReportBuilder, ReportRow, ReportTable, SkippedSlice};
pub use search::{search_report, SearchAcross, SearchQuery, SearchType, OVERALL_TERM};
pub use selector::SliceSelector;
