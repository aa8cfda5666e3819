//! FILENAME: core/hotspot-engine/src/selector.rs
//! Slice Selector - rows matching a combination.

use dataset::{ColumnIndex, Dataset, SliceView, Value};
use smallvec::SmallVec;

use crate::combination::Combination;
use crate::error::HotSpotError;

pub struct SliceSelector<'a> {
    dataset: &'a Dataset,
}

impl<'a> SliceSelector<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        SliceSelector { dataset }
    }

    /// Rows whose values equal every entry of the combination (logical AND),
    /// in source order. The overall combination selects the full dataset.
    pub fn select(&self, combination: &Combination) -> Result<SliceView<'a>, HotSpotError> {
        if combination.is_overall() {
            return Ok(self.dataset.view());
        }

        let mut predicates: SmallVec<[(ColumnIndex, &Value); 4]> = SmallVec::new();
        for (feature, value) in combination.iter() {
            predicates.push((self.dataset.require_column(feature)?, value));
        }
        Ok(self.dataset.select_where(&predicates))
    }
}
