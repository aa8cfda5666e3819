//! FILENAME: core/hotspot-engine/src/combination.rs
//! Combinations: the feature -> value assignments that define one slice.
//!
//! Entries are kept in target-column order so labels and exports are stable.
//! On the wire a combination is a plain JSON object (`{"day": "Sun"}`); the
//! empty combination is the "overall" baseline.

use std::fmt;

use dataset::Value;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

/// Label used for the zero-feature baseline combination.
pub const OVERALL_LABEL: &str = "Overall";

/// Positions (into the target-column list) of the features in one subset.
pub type FeatureSubset = SmallVec<[usize; 4]>;

/// A mapping from each feature of a subset to one observed value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Combination {
    entries: SmallVec<[(String, Value); 4]>,
}

impl Combination {
    /// The baseline combination: no features, matches every row.
    pub fn overall() -> Self {
        Combination::default()
    }

    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Combination {
            entries: entries.into_iter().map(|(f, v)| (f.into(), v)).collect(),
        }
    }

    pub fn is_overall(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of features combined (the interaction count).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v))
    }

    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(f, _)| f.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn get(&self, feature: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(f, _)| f == feature)
            .map(|(_, v)| v)
    }

    pub fn contains_feature(&self, feature: &str) -> bool {
        self.entries.iter().any(|(f, _)| f == feature)
    }

    /// True if any value's display form equals `term`.
    pub fn contains_value(&self, term: &str) -> bool {
        self.entries.iter().any(|(_, v)| v.display_value() == term)
    }

    /// Human-readable label, e.g. `day=Sun, smoker=No` or `Overall`.
    pub fn label(&self) -> String {
        if self.is_overall() {
            return OVERALL_LABEL.to_string();
        }
        self.entries
            .iter()
            .map(|(f, v)| format!("{}={}", f, v.display_value()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Combination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (feature, value) in &self.entries {
            map.serialize_entry(feature, value)?;
        }
        map.end()
    }
}

struct CombinationVisitor;

impl<'de> Visitor<'de> for CombinationVisitor {
    type Value = Combination;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of feature names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Combination, A::Error> {
        let mut entries = SmallVec::new();
        while let Some((feature, value)) = access.next_entry::<String, Value>()? {
            entries.push((feature, value));
        }
        Ok(Combination { entries })
    }
}

impl<'de> Deserialize<'de> for Combination {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CombinationVisitor)
    }
}
