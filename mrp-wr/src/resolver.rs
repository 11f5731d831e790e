//! Cascading resolver
//!
//! Tries [`Strategy::CASCADE`] in order against the registry and stops at the
//! first strategy returning at least one candidate. Later strategies never
//! run once an earlier one has produced results.

use crate::query::NormalizedQuery;
use crate::registry::{CandidateWell, SearchParams, Strategy, WellRegistry};
use mrp_common::config::ResolverSettings;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Per-row resolution failures; never fatal to a batch
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No well name and no township+range; the registry is not consulted
    #[error("Insufficient search criteria - provide a well name or township and range")]
    InsufficientCriteria,

    /// Registry query failed or timed out
    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),
}

/// Candidates from the first productive strategy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// `None` when every applicable strategy came back empty
    pub strategy: Option<Strategy>,
    pub candidates: Vec<CandidateWell>,
    /// Result hit the candidate cap
    pub truncated: bool,
    /// Registry rows the strategy matched; exceeds `candidates.len()` only
    /// when truncated
    pub total: usize,
}

impl Resolution {
    pub fn is_location_only(&self) -> bool {
        self.strategy.is_some_and(Strategy::is_location_only)
    }
}

/// Resolves a normalized query against a registry
#[derive(Clone)]
pub struct CascadingResolver {
    registry: Arc<dyn WellRegistry>,
    settings: ResolverSettings,
}

impl CascadingResolver {
    pub fn new(registry: Arc<dyn WellRegistry>, settings: ResolverSettings) -> Self {
        Self { registry, settings }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Run the cascade for one query
    pub async fn resolve(&self, query: &NormalizedQuery) -> Result<Resolution, ResolveError> {
        if query.is_insufficient() {
            return Err(ResolveError::InsufficientCriteria);
        }

        let params = SearchParams::from_query(query, self.settings.max_candidates);

        for strategy in Strategy::CASCADE {
            if !strategy.applies(&params, self.settings.exact_name_min_len) {
                continue;
            }

            let candidates = self
                .registry
                .search(strategy, &params)
                .await
                .map_err(|e| ResolveError::RegistryUnavailable(e.to_string()))?;

            debug!(
                strategy = %strategy,
                registry = self.registry.name(),
                found = candidates.len(),
                location = %query.location_label(),
                "Strategy attempted"
            );

            if !candidates.is_empty() {
                let truncated = candidates.len() >= self.settings.max_candidates;
                let total = if truncated {
                    match self.registry.count(strategy, &params).await {
                        Ok(total) => total.max(candidates.len()),
                        Err(e) => {
                            // candidates are still usable; only the label loses precision
                            warn!(strategy = %strategy, error = %e, "Registry count failed");
                            candidates.len()
                        }
                    }
                } else {
                    candidates.len()
                };
                return Ok(Resolution {
                    strategy: Some(strategy),
                    candidates,
                    truncated,
                    total,
                });
            }
        }

        Ok(Resolution::default())
    }
}
