//! FILENAME: core/dataset/src/view.rs
//! PURPOSE: Borrowed, read-only views over a dataset.
//! CONTEXT: A `SliceView` is a dataset reference plus the indices of the
//! rows it contains (always ascending, i.e. source order). A `GroupedView`
//! splits a view by the values of one key column, the way a group-by does.

use rustc_hash::FxHashMap;

use crate::dataset::{ColumnIndex, Dataset};
use crate::error::DatasetError;
use crate::value::{compare_values, HashableValue, Value};

/// A subset of a dataset's rows.
#[derive(Debug, Clone)]
pub struct SliceView<'a> {
    dataset: &'a Dataset,
    rows: Vec<u32>,
}

impl<'a> SliceView<'a> {
    /// Row indices must be ascending and in range.
    pub fn new(dataset: &'a Dataset, rows: Vec<u32>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(rows.last().map_or(true, |&r| (r as usize) < dataset.row_count()));
        SliceView { dataset, rows }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &'a [String] {
        self.dataset.columns()
    }

    /// Indices of the rows in this view, in source order.
    pub fn row_indices(&self) -> &[u32] {
        &self.rows
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a [Value]> + '_ {
        let dataset = self.dataset;
        self.rows
            .iter()
            .filter_map(move |&r| dataset.row(r as usize))
    }

    /// All values of one column within the view.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &'a Value> + '_, DatasetError> {
        let idx = self.dataset.require_column(name)?;
        Ok(self.column_at(idx))
    }

    fn column_at(&self, idx: ColumnIndex) -> impl Iterator<Item = &'a Value> + '_ {
        let dataset = self.dataset;
        self.rows
            .iter()
            .filter_map(move |&r| dataset.value(r as usize, idx))
    }

    /// Numeric values of one column (booleans as 1/0); other values are skipped.
    pub fn numbers(&self, name: &str) -> Result<Vec<f64>, DatasetError> {
        Ok(self.column(name)?.filter_map(Value::as_f64).collect())
    }

    /// Narrows the view further with equality predicates.
    pub fn filter(&self, predicates: &[(ColumnIndex, &Value)]) -> SliceView<'a> {
        let dataset = self.dataset;
        let rows = self
            .rows
            .iter()
            .copied()
            .filter(|&r| {
                predicates.iter().all(|(column, expected)| {
                    dataset
                        .value(r as usize, *column)
                        .is_some_and(|v| v.same_category(expected))
                })
            })
            .collect();
        SliceView::new(dataset, rows)
    }

    /// Splits the view by the distinct values of `column`.
    /// Groups are sorted ascending by key.
    pub fn group_by(&self, column: &str) -> Result<GroupedView<'a>, DatasetError> {
        let idx = self.dataset.require_column(column)?;

        let mut slot_of: FxHashMap<HashableValue, usize> = FxHashMap::default();
        let mut groups: Vec<(Value, Vec<u32>)> = Vec::new();
        for &r in &self.rows {
            let value = match self.dataset.value(r as usize, idx) {
                Some(v) => v,
                None => continue,
            };
            let slot = *slot_of.entry(HashableValue::from(value)).or_insert_with(|| {
                groups.push((value.clone(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(r);
        }

        groups.sort_by(|a, b| compare_values(&a.0, &b.0));

        Ok(GroupedView {
            key_column: column.to_string(),
            groups: groups
                .into_iter()
                .map(|(key, rows)| (key, SliceView::new(self.dataset, rows)))
                .collect(),
        })
    }

    /// Copies the rows of this view into a standalone dataset.
    pub fn to_dataset(&self) -> Result<Dataset, DatasetError> {
        Dataset::from_rows(
            self.dataset.columns().iter().cloned(),
            self.rows().map(<[Value]>::to_vec),
        )
    }
}

/// A view split into groups keyed by one column's values.
#[derive(Debug, Clone)]
pub struct GroupedView<'a> {
    key_column: String,
    groups: Vec<(Value, SliceView<'a>)>,
}

impl<'a> GroupedView<'a> {
    /// A single group holding the whole view under a constant key.
    /// Mirrors grouping a table by a marker column filled with one value.
    pub fn constant(view: SliceView<'a>, marker: &str) -> Self {
        GroupedView {
            key_column: marker.to_string(),
            groups: vec![(Value::text(marker), view)],
        }
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn groups(&self) -> &[(Value, SliceView<'a>)] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total rows across every group.
    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|(_, v)| v.len()).sum()
    }
}
