//! Well registry access
//!
//! The registry is only ever read through [`WellRegistry::search`], one call
//! per cascade strategy. Each backend scores candidates itself: SQL backends
//! declaratively with `CASE WHEN`, others with [`Strategy::evaluate`] after
//! fetch. Both follow the same precedence so strategy semantics are identical
//! across storage.

use crate::normalize::Meridian;
use crate::query::{exact_name_variants, NormalizedQuery};
use async_trait::async_trait;
use mrp_common::db::WellRecord;
use mrp_common::Result;
use serde::{Deserialize, Serialize};

pub mod memory;
pub mod sqlite;
pub mod strategy;

pub use memory::MemoryRegistry;
pub use sqlite::SqliteRegistry;
pub use strategy::Strategy;

/// Registry well returned by a strategy, with the score that strategy gave it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateWell {
    pub api_number: String,
    pub well_name: String,
    pub well_number: Option<String>,
    pub operator: Option<String>,
    pub section: Option<i64>,
    pub township: Option<String>,
    pub range: Option<String>,
    pub meridian: String,
    pub county: Option<String>,
    pub well_status: Option<String>,
    /// 0–100
    pub match_score: u8,
}

impl CandidateWell {
    pub fn from_record(record: &WellRecord, match_score: u8) -> Self {
        Self {
            api_number: record.api_number.clone(),
            well_name: record.well_name.clone(),
            well_number: record.well_number.clone(),
            operator: record.operator.clone(),
            section: record.section,
            township: record.township.clone(),
            range: record.range.clone(),
            meridian: record.meridian.clone(),
            county: record.county.clone(),
            well_status: record.well_status.clone(),
            match_score,
        }
    }

    /// `"<wellName> <wellNumber>"`
    pub fn full_name(&self) -> String {
        full_name(&self.well_name, self.well_number.as_deref())
    }

    pub fn is_active(&self) -> bool {
        is_active_status(self.well_status.as_deref())
    }
}

/// Name and number joined the way registry name predicates see them
pub fn full_name(well_name: &str, well_number: Option<&str>) -> String {
    format!("{} {}", well_name, well_number.unwrap_or("")).trim().to_string()
}

/// Regulator status `AC` (or spelled out) means active
pub fn is_active_status(status: Option<&str>) -> bool {
    status
        .map(|s| s.trim().to_uppercase())
        .is_some_and(|s| s == "AC" || s == "ACTIVE")
}

/// Case-insensitive substring test; empty needles never match.
/// ASCII folding only, like SQLite `UPPER`.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.to_ascii_uppercase().contains(&needle.to_ascii_uppercase())
}

/// Bound parameters shared by every strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub name: String,
    pub base_name: String,
    /// Spellings tried by the statewide exact-name strategy
    pub exact_names: Vec<String>,
    pub operator: String,
    pub section: Option<u8>,
    pub township: Option<String>,
    pub range: Option<String>,
    pub meridian: Meridian,
    pub limit: usize,
}

impl SearchParams {
    pub fn from_query(query: &NormalizedQuery, limit: usize) -> Self {
        Self {
            name: query.cleaned_well_name.clone(),
            base_name: query.base_well_name.clone(),
            exact_names: if query.has_name() {
                exact_name_variants(&query.cleaned_well_name)
            } else {
                Vec::new()
            },
            operator: query.operator.clone(),
            section: query.section,
            township: query.township.clone(),
            range: query.range.clone(),
            meridian: query.meridian,
            limit,
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn has_operator(&self) -> bool {
        !self.operator.is_empty()
    }

    pub fn has_township_range(&self) -> bool {
        self.township.is_some() && self.range.is_some()
    }
}

/// Queryable canonical well registry
#[async_trait]
pub trait WellRegistry: Send + Sync {
    /// Backend identifier for logs
    fn name(&self) -> &'static str;

    /// Run one strategy: at most `params.limit` candidates ordered by
    /// score DESC, active status DESC, API number ASC
    async fn search(&self, strategy: Strategy, params: &SearchParams) -> Result<Vec<CandidateWell>>;

    /// Number of rows the strategy matches, ignoring `params.limit`
    async fn count(&self, strategy: Strategy, params: &SearchParams) -> Result<usize> {
        Ok(self.search(strategy, params).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_without_number() {
        assert_eq!(full_name("SMITH", None), "SMITH");
        assert_eq!(full_name("SMITH", Some("1-12")), "SMITH 1-12");
    }

    #[test]
    fn test_active_status() {
        assert!(is_active_status(Some("AC")));
        assert!(is_active_status(Some("active")));
        assert!(!is_active_status(Some("PA")));
        assert!(!is_active_status(None));
    }

    #[test]
    fn test_contains_ci() {
        assert!(contains_ci("Acme Energy LLC", "ACME"));
        assert!(!contains_ci("Acme Energy LLC", ""));
        assert!(!contains_ci("Devon", "Acme"));
    }

    #[test]
    fn test_contains_ci_folds_ascii_only() {
        assert!(contains_ci("Smith Ranch", "SMITH"));
        assert!(contains_ci("ÉCOLE 1", "École"));
        assert!(!contains_ci("ÉCOLE 1", "école"));
    }
}
