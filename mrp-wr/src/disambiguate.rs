//! Operator disambiguation
//!
//! Narrows a multi-candidate result using the operator supplied in the row.
//! Candidates are never discarded when none of them matches the operator;
//! the row's operator may simply be stale.

use crate::registry::CandidateWell;

/// Score given to the sole operator match
pub const OPERATOR_MATCH_SCORE: u8 = 100;

/// What operator narrowing did to a candidate set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narrowing {
    /// No operator supplied, or fewer than two candidates
    NotApplied,
    /// Exactly one candidate matched the operator
    Single,
    /// Several candidates matched; the rest were dropped
    Narrowed,
    /// Nothing matched; candidates kept as they were
    NoMatch,
}

/// Loose operator comparison: case-insensitive substring either direction
pub fn operator_matches(candidate_operator: &str, query_operator: &str) -> bool {
    let a = candidate_operator.trim().to_uppercase();
    let b = query_operator.trim().to_uppercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Apply operator narrowing to the resolver's candidates
pub fn disambiguate(candidates: Vec<CandidateWell>, operator: &str) -> (Vec<CandidateWell>, Narrowing) {
    if operator.trim().is_empty() || candidates.len() <= 1 {
        return (candidates, Narrowing::NotApplied);
    }

    let (matching, rest): (Vec<_>, Vec<_>) = candidates.into_iter().partition(|c| {
        c.operator
            .as_deref()
            .is_some_and(|op| operator_matches(op, operator))
    });

    match matching.len() {
        0 => (rest, Narrowing::NoMatch),
        1 => {
            let mut single = matching;
            single[0].match_score = OPERATOR_MATCH_SCORE;
            (single, Narrowing::Single)
        }
        _ => (matching, Narrowing::Narrowed),
    }
}
