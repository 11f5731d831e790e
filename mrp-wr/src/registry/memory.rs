//! In-memory well registry
//!
//! Applies [`Strategy::evaluate`] to every row after fetch. Used for fixtures
//! and for backends that cannot express the scoring declaratively.

use super::{CandidateWell, SearchParams, Strategy, WellRegistry};
use async_trait::async_trait;
use mrp_common::db::WellRecord;
use mrp_common::Result;
use std::cmp::Reverse;

#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    wells: Vec<WellRecord>,
}

impl MemoryRegistry {
    pub fn new(wells: Vec<WellRecord>) -> Self {
        Self { wells }
    }

    pub fn len(&self) -> usize {
        self.wells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wells.is_empty()
    }
}

#[async_trait]
impl WellRegistry for MemoryRegistry {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn count(&self, strategy: Strategy, params: &SearchParams) -> Result<usize> {
        Ok(self
            .wells
            .iter()
            .filter(|well| strategy.evaluate(well, params).is_some())
            .count())
    }

    async fn search(&self, strategy: Strategy, params: &SearchParams) -> Result<Vec<CandidateWell>> {
        let mut candidates: Vec<CandidateWell> = self
            .wells
            .iter()
            .filter_map(|well| {
                strategy
                    .evaluate(well, params)
                    .map(|score| CandidateWell::from_record(well, score))
            })
            .collect();

        candidates.sort_by(|a, b| {
            (Reverse(a.match_score), Reverse(a.is_active()), &a.api_number).cmp(&(
                Reverse(b.match_score),
                Reverse(b.is_active()),
                &b.api_number,
            ))
        });
        candidates.truncate(params.limit);

        Ok(candidates)
    }
}
