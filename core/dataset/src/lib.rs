//! FILENAME: core/dataset/src/lib.rs
//! PURPOSE: Tabular data model shared by the hot spot engine and persistence.
//! CONTEXT: Re-exports public types and modules for use by other crates.
//!
//! Layers:
//! - `value`: Scalar cell values and their hashable form
//! - `dataset`: The immutable table (columns + rows)
//! - `view`: Borrowed slices and group-bys over a table
//! - `intern`: Per-column value interning used for fast grouping
//! - `catalog`: Named loaders with an explicit LRU cache

pub mod catalog;
pub mod dataset;
pub mod error;
pub mod intern;
pub mod value;
pub mod view;

pub use catalog::{DatasetCatalog, DatasetLoader, DEFAULT_CATALOG_CAPACITY};
pub use dataset::{ColumnIndex, Dataset};
pub use error::DatasetError;
pub use intern::{FieldCache, ValueId, VALUE_ID_EMPTY};
pub use value::{compare_values, HashableValue, OrderedFloat, Value, BLANK_LABEL};
pub use view::{GroupedView, SliceView};
