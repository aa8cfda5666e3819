//! FILENAME: core/hotspot-engine/src/search.rs
//! Search Engine - filters a report down to the rows an analyst asked for.
//!
//! A row survives when it passes all of:
//! - the interaction-count allow-set (if one is given),
//! - the row-count minimum,
//! - the term filter (`any` / `all` over keys or values).
//!
//! The term `"Overall"` always brings the baseline row back in, whatever the
//! other filters say. In an `any` values search it also matches rows whose
//! combination holds a real "Overall" value. Searching never mutates the
//! source report.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HotSpotError;
use crate::report::{Report, ReportRow};

/// The search term that selects the baseline row.
pub const OVERALL_TERM: &str = "Overall";

// ============================================================================
// PARAMETERS
// ============================================================================

/// What search terms are matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchAcross {
    /// Feature names in a row's combination.
    #[default]
    Keys,
    /// Values in a row's combination.
    Values,
}

impl FromStr for SearchAcross {
    type Err = HotSpotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keys" => Ok(SearchAcross::Keys),
            "values" => Ok(SearchAcross::Values),
            other => Err(HotSpotError::SearchParameter(format!(
                "search_across must be 'keys' or 'values', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchAcross {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchAcross::Keys => "keys",
            SearchAcross::Values => "values",
        })
    }
}

/// How several terms combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// At least one term matches.
    #[default]
    Any,
    /// Every term other than "Overall" matches.
    All,
}

impl FromStr for SearchType {
    type Err = HotSpotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(SearchType::Any),
            "all" => Ok(SearchType::All),
            other => Err(HotSpotError::SearchParameter(format!(
                "search_type must be 'any' or 'all', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchType::Any => "any",
            SearchType::All => "all",
        })
    }
}

/// Search parameters. The default query keeps every row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search_across: SearchAcross,

    /// Empty means no term filter.
    #[serde(default)]
    pub search_terms: Vec<String>,

    #[serde(default)]
    pub search_type: SearchType,

    /// Allowed interaction counts. `None` means no constraint;
    /// `Some` of an empty set lets no row through (except a forced baseline).
    #[serde(default)]
    pub interactions: Option<BTreeSet<usize>>,

    /// Rows with fewer rows than this are dropped.
    #[serde(default)]
    pub n_row_minimum: usize,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a query from loosely typed parameters, the way a UI passes them.
    pub fn from_params<T, S>(
        search_across: &str,
        search_terms: T,
        search_type: &str,
        interactions: Option<Vec<usize>>,
        n_row_minimum: usize,
    ) -> Result<Self, HotSpotError>
    where
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(SearchQuery {
            search_across: search_across.parse()?,
            search_terms: search_terms.into_iter().map(Into::into).collect(),
            search_type: search_type.parse()?,
            interactions: interactions.map(|v| v.into_iter().collect()),
            n_row_minimum,
        })
    }

    pub fn across(mut self, search_across: SearchAcross) -> Self {
        self.search_across = search_across;
        self
    }

    pub fn terms<T, S>(mut self, terms: T) -> Self
    where
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_terms = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    pub fn interactions<I: IntoIterator<Item = usize>>(mut self, counts: I) -> Self {
        self.interactions = Some(counts.into_iter().collect());
        self
    }

    pub fn n_row_minimum(mut self, minimum: usize) -> Self {
        self.n_row_minimum = minimum;
        self
    }

    fn wants_overall(&self) -> bool {
        self.search_terms.iter().any(|t| t == OVERALL_TERM)
    }

    /// Terms other than "Overall".
    fn match_terms(&self) -> Vec<&str> {
        self.search_terms
            .iter()
            .map(String::as_str)
            .filter(|t| *t != OVERALL_TERM)
            .collect()
    }
}

// ============================================================================
// FILTER
// ============================================================================

/// Returns a new report holding the rows of `report` that pass `query`,
/// in their original order.
pub fn search_report(report: &Report, query: &SearchQuery) -> Result<Report, HotSpotError> {
    let terms = query.match_terms();

    if query.search_across == SearchAcross::Keys {
        if let Some(unknown) = terms
            .iter()
            .find(|t| !report.target_columns().iter().any(|c| c == *t))
        {
            return Err(HotSpotError::SearchParameter(format!(
                "'{}' is not an analyzed target column",
                unknown
            )));
        }
    }

    let wants_overall = query.wants_overall();
    Ok(report.filtered(|row| {
        if wants_overall && row.is_baseline() {
            return true;
        }
        passes_interactions(row, query) && row.n_rows >= query.n_row_minimum && passes_terms(row, query, &terms)
    }))
}

fn passes_interactions(row: &ReportRow, query: &SearchQuery) -> bool {
    query
        .interactions
        .as_ref()
        .map_or(true, |allowed| allowed.contains(&row.interaction_count))
}

fn passes_terms(row: &ReportRow, query: &SearchQuery, terms: &[&str]) -> bool {
    if query.search_terms.is_empty() {
        return true;
    }
    let hit = |term: &&str| match query.search_across {
        SearchAcross::Keys => row.combination.contains_feature(term),
        SearchAcross::Values => row.combination.contains_value(term),
    };
    // A category literally named "Overall"
    let overall_value = || {
        query.search_across == SearchAcross::Values
            && query.wants_overall()
            && row.combination.contains_value(OVERALL_TERM)
    };
    match query.search_type {
        SearchType::Any => terms.iter().any(hit) || overall_value(),
        SearchType::All => !terms.is_empty() && terms.iter().all(hit),
    }
}
