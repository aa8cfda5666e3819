//! FILENAME: core/dataset/src/intern.rs
//! Value interning for categorical columns.
//!
//! Each distinct value of a column is stored once and referenced by a
//! `ValueId`. Rows are re-expressed as ids, which turns multi-column
//! grouping into hashing short integer tuples instead of cloned values.

use rustc_hash::FxHashMap;
use std::cmp::Ordering;

use crate::dataset::{ColumnIndex, Dataset};
use crate::value::{compare_values, HashableValue, Value};

/// A reference to an interned value within a field's unique value store.
/// Using u32 to save memory (supports up to 4B unique values per field).
pub type ValueId = u32;

/// Represents a missing value.
pub const VALUE_ID_EMPTY: ValueId = u32::MAX;

static EMPTY_VALUE: Value = Value::Empty;

/// Interned copy of a single column.
#[derive(Debug, Clone)]
pub struct FieldCache {
    /// The dataset column this cache represents.
    pub source_index: ColumnIndex,

    /// Column name.
    pub name: String,

    /// Map from value to its unique ID (for deduplication during build).
    value_to_id: FxHashMap<HashableValue, ValueId>,

    /// Ordered list of unique values (indexed by ValueId), in first-seen order.
    id_to_value: Vec<Value>,

    /// The interned id of every dataset row.
    row_ids: Vec<ValueId>,

    /// Position of each id in ascending value order.
    sort_rank: Vec<u32>,
}

impl FieldCache {
    /// Interns one column of the dataset.
    pub fn build(dataset: &Dataset, source_index: ColumnIndex) -> Self {
        let name = dataset
            .columns()
            .get(source_index)
            .cloned()
            .unwrap_or_default();

        let mut cache = FieldCache {
            source_index,
            name,
            value_to_id: FxHashMap::default(),
            id_to_value: Vec::new(),
            row_ids: Vec::with_capacity(dataset.row_count()),
            sort_rank: Vec::new(),
        };

        for row in dataset.rows() {
            let id = match row.get(source_index) {
                Some(value) => cache.intern(value),
                None => VALUE_ID_EMPTY,
            };
            cache.row_ids.push(id);
        }

        cache.rebuild_sort_order();
        cache
    }

    /// Interns a value and returns its ValueId.
    /// If the value already exists, returns the existing ID.
    fn intern(&mut self, value: &Value) -> ValueId {
        if value.is_empty() {
            return VALUE_ID_EMPTY;
        }

        let key = HashableValue::from(value);
        if let Some(&id) = self.value_to_id.get(&key) {
            return id;
        }

        let id = self.id_to_value.len() as ValueId;
        self.id_to_value.push(value.clone());
        self.value_to_id.insert(key, id);
        id
    }

    fn rebuild_sort_order(&mut self) {
        let mut sorted: Vec<ValueId> = (0..self.id_to_value.len() as ValueId).collect();
        sorted.sort_by(|&a, &b| {
            compare_values(&self.id_to_value[a as usize], &self.id_to_value[b as usize])
        });
        self.sort_rank = vec![0; sorted.len()];
        for (rank, id) in sorted.into_iter().enumerate() {
            self.sort_rank[id as usize] = rank as u32;
        }
    }

    /// Gets the value for a given ID.
    pub fn get_value(&self, id: ValueId) -> Option<&Value> {
        if id == VALUE_ID_EMPTY {
            return Some(&EMPTY_VALUE);
        }
        self.id_to_value.get(id as usize)
    }

    /// Returns the number of unique values (excluding empty).
    pub fn unique_count(&self) -> usize {
        self.id_to_value.len()
    }

    pub fn row_id(&self, row: usize) -> ValueId {
        self.row_ids.get(row).copied().unwrap_or(VALUE_ID_EMPTY)
    }

    pub fn row_ids(&self) -> &[ValueId] {
        &self.row_ids
    }

    /// Ascending comparison of two ids by their values. Empty sorts first.
    pub fn compare_ids(&self, a: ValueId, b: ValueId) -> Ordering {
        match (a == VALUE_ID_EMPTY, b == VALUE_ID_EMPTY) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => {
                let ra = self.sort_rank.get(a as usize).copied().unwrap_or(u32::MAX);
                let rb = self.sort_rank.get(b as usize).copied().unwrap_or(u32::MAX);
                ra.cmp(&rb)
            }
        }
    }
}
