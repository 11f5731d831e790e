//! Row classification
//!
//! Maps a row's final candidate set to a match state:
//!
//! ```text
//! has_api    API supplied directly, resolver never called      (terminal)
//! exact      one candidate, or one dominant candidate         (terminal)
//! ambiguous  several candidates, user must select one         (awaits selection)
//! not_found  no candidates, insufficient input, or failure    (terminal)
//! ```

use crate::disambiguate::operator_matches;
use crate::query::NormalizedQuery;
use crate::registry::{contains_ci, CandidateWell};
use crate::resolver::Resolution;
use mrp_common::config::ResolverSettings;
use serde::{Deserialize, Serialize};

pub const NO_WELLS_FOUND: &str = "No wells found matching the provided criteria";
pub const SEARCH_FAILED: &str = "Search failed - please try again";
pub const LOCATION_ONLY_WARNING: &str =
    "Matches are based on location only - none match the well name or operator provided";
pub const LOCATION_ONLY_EXACT_WARNING: &str =
    "Matched by location only - verify this is the correct well";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    HasApi,
    Exact,
    Ambiguous,
    NotFound,
}

impl MatchStatus {
    /// Rows in this state carry a resolved API number
    pub fn is_resolved(self) -> bool {
        matches!(self, MatchStatus::HasApi | MatchStatus::Exact)
    }
}

/// Outcome of classifying one row
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: MatchStatus,
    pub candidates: Vec<CandidateWell>,
    /// Resolved API for `exact` rows
    pub api_number: Option<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl Classification {
    pub fn not_found(error: impl Into<String>) -> Self {
        Self {
            status: MatchStatus::NotFound,
            candidates: Vec::new(),
            api_number: None,
            warnings: Vec::new(),
            errors: vec![error.into()],
        }
    }

    fn exact(candidate: CandidateWell) -> Self {
        Self {
            status: MatchStatus::Exact,
            api_number: Some(candidate.api_number.clone()),
            candidates: vec![candidate],
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Human count for broad result sets: `2k+`, `15+`, `12`.
/// `open_ended` marks a count known only as a lower bound.
pub fn count_label(count: usize, open_ended: bool) -> String {
    if count >= 1000 {
        format!("{}k+", count / 1000)
    } else if open_ended {
        format!("{}+", count)
    } else {
        count.to_string()
    }
}

/// Candidate's name or operator loosely agrees with the row
fn loosely_matches(candidate: &CandidateWell, query: &NormalizedQuery) -> bool {
    let name_match = query.has_name() && {
        let needle = if query.base_well_name.is_empty() {
            &query.cleaned_well_name
        } else {
            &query.base_well_name
        };
        contains_ci(&candidate.full_name(), needle) || contains_ci(needle, &candidate.well_name)
    };
    let operator_match = query.has_operator()
        && candidate
            .operator
            .as_deref()
            .is_some_and(|op| operator_matches(op, &query.operator));

    name_match || operator_match
}

/// Classify a row from its (already operator-narrowed) resolution
pub fn classify(
    query: &NormalizedQuery,
    resolution: Resolution,
    settings: &ResolverSettings,
) -> Classification {
    let location_only = resolution.is_location_only();
    let truncated = resolution.truncated;
    let total = resolution.total;
    let mut candidates = resolution.candidates;

    match candidates.len() {
        0 => Classification::not_found(NO_WELLS_FOUND),
        1 => {
            let candidate = candidates.remove(0);
            let mut result = Classification::exact(candidate);
            if location_only && query.has_name() && !loosely_matches(&result.candidates[0], query) {
                result.warnings.push(LOCATION_ONLY_EXACT_WARNING.to_string());
            }
            result
        }
        n => {
            if query.has_operator() {
                let dominant: Vec<usize> = candidates
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.match_score >= settings.dominant_score)
                    .map(|(i, _)| i)
                    .collect();
                if let [only] = dominant.as_slice() {
                    return Classification::exact(candidates.swap_remove(*only));
                }
            }

            let mut warnings = Vec::new();
            if n <= settings.ambiguous_list_limit {
                warnings.push(format!("{} matches found - please select the correct well", n));
                if !candidates.iter().any(|c| loosely_matches(c, query)) {
                    warnings.push(LOCATION_ONLY_WARNING.to_string());
                }
            } else {
                let total = total.max(n);
                warnings.push(format!(
                    "{} matches found - add a well name, operator, or section to narrow the search",
                    count_label(total, truncated && total == n)
                ));
            }

            Classification {
                status: MatchStatus::Ambiguous,
                candidates,
                api_number: None,
                warnings,
                errors: Vec::new(),
            }
        }
    }
}
