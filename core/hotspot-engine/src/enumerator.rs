//! FILENAME: core/hotspot-engine/src/enumerator.rs
//! Combination Enumerator - which slices an analysis has to aggregate.
//!
//! Algorithm:
//! 1. Intern every target column once (`FieldCache`), so each row becomes a
//!    tuple of `ValueId`s.
//! 2. Emit the empty subset (the baseline) first.
//! 3. For k in 1..=limit, walk every k-combination of target columns in
//!    lexicographic order and group the rows by their id tuple for exactly
//!    those columns. Only tuples that occur in at least one row exist, so no
//!    zero-support combination is ever produced.
//! 4. Order each subset's tuples per `SortOrder` and resolve them back to
//!    values.

use dataset::{Dataset, FieldCache, ValueId, VALUE_ID_EMPTY};
use itertools::Itertools;
use log::debug;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::combination::{Combination, FeatureSubset};
use crate::definition::{AnalysisPlan, SortOrder};

/// Interned values of one row restricted to a feature subset.
type GroupKey = SmallVec<[ValueId; 4]>;

/// One slice the engine must aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceCandidate {
    /// Position in canonical emission order. Reports are sorted by it.
    pub ordinal: usize,

    /// Positions of the subset's features in the target-column list.
    pub subset: FeatureSubset,

    /// The feature -> value assignment.
    pub combination: Combination,

    /// Number of rows carrying this assignment.
    pub support: usize,
}

impl SliceCandidate {
    pub fn interaction_count(&self) -> usize {
        self.subset.len()
    }
}

/// Compute C(n, k) - the number of k-combinations from n items.
pub fn combinations_for_depth(feature_count: usize, depth: usize) -> u128 {
    if depth > feature_count {
        return 0;
    }
    let k = depth.min(feature_count - depth);
    let mut result = 1u128;
    for i in 0..k {
        result = result * (feature_count - i) as u128 / (i + 1) as u128;
    }
    result
}

/// Every feature subset of size 0..=limit, smallest first, each size in
/// lexicographic order.
pub fn feature_subsets(target_count: usize, interaction_limit: usize) -> Vec<FeatureSubset> {
    let limit = interaction_limit.min(target_count);
    let mut subsets = vec![FeatureSubset::new()];
    for k in 1..=limit {
        subsets.extend((0..target_count).combinations(k).map(FeatureSubset::from_vec));
    }
    subsets
}

pub struct CombinationEnumerator<'a> {
    dataset: &'a Dataset,
    target_names: Vec<String>,
    fields: Vec<FieldCache>,
    interaction_limit: usize,
    sort_order: SortOrder,
    drop_missing: bool,
}

impl<'a> CombinationEnumerator<'a> {
    pub fn new(
        dataset: &'a Dataset,
        plan: &AnalysisPlan,
        sort_order: SortOrder,
        drop_missing: bool,
    ) -> Self {
        let fields = plan
            .targets
            .iter()
            .map(|(_, index)| FieldCache::build(dataset, *index))
            .collect();

        CombinationEnumerator {
            dataset,
            target_names: plan.target_names(),
            fields,
            interaction_limit: plan.interaction_limit,
            sort_order,
            drop_missing,
        }
    }

    pub fn interaction_limit(&self) -> usize {
        self.interaction_limit
    }

    pub fn target_names(&self) -> &[String] {
        &self.target_names
    }

    /// Produces every slice candidate in canonical order.
    pub fn enumerate(&self) -> Vec<SliceCandidate> {
        let mut candidates = vec![SliceCandidate {
            ordinal: 0,
            subset: FeatureSubset::new(),
            combination: Combination::overall(),
            support: self.dataset.row_count(),
        }];

        for subset in feature_subsets(self.fields.len(), self.interaction_limit)
            .into_iter()
            .skip(1)
        {
            for (key, support) in self.observed_keys(&subset) {
                let combination = self.resolve(&subset, &key);
                candidates.push(SliceCandidate {
                    ordinal: candidates.len(),
                    subset: subset.clone(),
                    combination,
                    support,
                });
            }
        }

        debug!(
            "[Enumerator] {} candidates over {} targets (limit {})",
            candidates.len(),
            self.fields.len(),
            self.interaction_limit
        );
        candidates
    }

    /// Distinct id tuples present in the data for `subset`, with row counts.
    fn observed_keys(&self, subset: &FeatureSubset) -> Vec<(GroupKey, usize)> {
        let mut slot_of: FxHashMap<GroupKey, usize> = FxHashMap::default();
        let mut keys: Vec<(GroupKey, usize)> = Vec::new();

        'rows: for row in 0..self.dataset.row_count() {
            let mut key = GroupKey::with_capacity(subset.len());
            for &f in subset {
                let id = self.fields[f].row_id(row);
                if self.drop_missing && id == VALUE_ID_EMPTY {
                    continue 'rows;
                }
                key.push(id);
            }
            match slot_of.get(&key) {
                Some(&slot) => keys[slot].1 += 1,
                None => {
                    slot_of.insert(key.clone(), keys.len());
                    keys.push((key, 1));
                }
            }
        }

        match self.sort_order {
            SortOrder::DataSourceOrder => {}
            SortOrder::Ascending => keys.sort_by(|a, b| self.compare_keys(subset, &a.0, &b.0)),
            SortOrder::Descending => keys.sort_by(|a, b| self.compare_keys(subset, &b.0, &a.0)),
        }
        keys
    }

    fn compare_keys(&self, subset: &FeatureSubset, a: &GroupKey, b: &GroupKey) -> std::cmp::Ordering {
        subset
            .iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(&f, (&ia, &ib))| self.fields[f].compare_ids(ia, ib))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    }

    fn resolve(&self, subset: &FeatureSubset, key: &GroupKey) -> Combination {
        Combination::new(subset.iter().zip(key.iter()).map(|(&f, &id)| {
            let value = self.fields[f].get_value(id).cloned().unwrap_or_default();
            (self.target_names[f].clone(), value)
        }))
    }
}
