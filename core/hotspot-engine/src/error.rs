//! FILENAME: core/hotspot-engine/src/error.rs

use dataset::DatasetError;
use thiserror::Error;

use crate::combination::Combination;
use crate::objective::ObjectiveError;

#[derive(Error, Debug)]
pub enum HotSpotError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Objective function failed on [{combination}] ({slice_rows} rows): {source}")]
    ObjectiveFunction {
        combination: Combination,
        slice_rows: usize,
        #[source]
        source: ObjectiveError,
    },

    #[error("Combination [{combination}] matched no rows")]
    EmptySlice { combination: Combination },

    #[error("Invalid search parameter: {0}")]
    SearchParameter(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("No report available: run the analysis first")]
    NotRun,

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Configuration parse error: {0}")]
    Config(#[from] serde_json::Error),
}
