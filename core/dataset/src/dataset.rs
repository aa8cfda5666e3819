//! FILENAME: core/dataset/src/dataset.rs
//! PURPOSE: The rectangular table handed to the hot spot engine.
//! CONTEXT: A `Dataset` is a list of named columns plus dense rows of
//! `Value`s. Once built it is treated as immutable; all narrowing happens
//! through borrowed `SliceView`s that hold row indices into it.

use rustc_hash::FxHashMap;

use crate::error::DatasetError;
use crate::value::Value;
use crate::view::{GroupedView, SliceView};

/// Index of a column within a dataset (0-based).
pub type ColumnIndex = usize;

#[derive(Debug, Clone)]
pub struct Dataset {
    /// Column names, in source order.
    columns: Vec<String>,

    /// Name -> position lookup.
    column_lookup: FxHashMap<String, ColumnIndex>,

    /// Dense row storage. Every row has `columns.len()` values.
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Creates an empty dataset with the given column names.
    pub fn new<I, S>(columns: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut column_lookup = FxHashMap::default();
        for (i, name) in columns.iter().enumerate() {
            if column_lookup.insert(name.clone(), i).is_some() {
                return Err(DatasetError::DuplicateColumn(name.clone()));
            }
        }

        Ok(Dataset {
            columns,
            column_lookup,
            rows: Vec::new(),
        })
    }

    /// Creates a dataset and fills it with rows in one go.
    pub fn from_rows<I, S, R>(columns: I, rows: R) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = Vec<Value>>,
    {
        let mut dataset = Dataset::new(columns)?;
        for row in rows {
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    /// Appends a row. Values must be in column order.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), DatasetError> {
        if row.len() != self.columns.len() {
            return Err(DatasetError::RowArity {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Reserves capacity for expected row count.
    pub fn reserve(&mut self, additional: usize) {
        self.rows.reserve(additional);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<ColumnIndex> {
        self.column_lookup.get(name).copied()
    }

    /// Like `column_index`, but unknown names are an error.
    pub fn require_column(&self, name: &str) -> Result<ColumnIndex, DatasetError> {
        self.column_index(name)
            .ok_or_else(|| DatasetError::UnknownColumn(name.to_string()))
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn value(&self, row: usize, column: ColumnIndex) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// A view over every row, in source order.
    pub fn view(&self) -> SliceView<'_> {
        SliceView::new(self, (0..self.rows.len() as u32).collect())
    }

    /// Rows matching every `(column, value)` equality predicate, in source order.
    /// No predicates selects the whole dataset.
    pub fn select_where(&self, predicates: &[(ColumnIndex, &Value)]) -> SliceView<'_> {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                predicates.iter().all(|(column, expected)| {
                    row.get(*column).is_some_and(|v| v.same_category(expected))
                })
            })
            .map(|(i, _)| i as u32)
            .collect();
        SliceView::new(self, rows)
    }

    /// Groups the whole dataset by one column.
    pub fn group_by(&self, column: &str) -> Result<GroupedView<'_>, DatasetError> {
        self.view().group_by(column)
    }

    /// Returns a copy with an extra column holding the same value in every row,
    /// e.g. an `"overall"` marker to group the full table by.
    pub fn with_constant_column(&self, name: &str, value: Value) -> Result<Dataset, DatasetError> {
        let mut columns = self.columns.clone();
        columns.push(name.to_string());
        let mut out = Dataset::new(columns)?;
        out.reserve(self.rows.len());
        for row in &self.rows {
            let mut extended = Vec::with_capacity(row.len() + 1);
            extended.extend(row.iter().cloned());
            extended.push(value.clone());
            out.rows.push(extended);
        }
        Ok(out)
    }
}
