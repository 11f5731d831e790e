//! Batch orchestration
//!
//! **Validate:** every row is resolved independently, at most
//! `max_concurrent_rows` at a time. Duplicate marking runs afterwards as a
//! single pass in row order so the first occurrence of an API always wins.
//!
//! **Commit:** consumes the validate results plus the user's selections.
//! Ambiguous rows are never re-resolved; a selection must name one of the
//! candidates returned at validate time. The duplicate snapshot is fetched
//! again so wells added between validate and commit are not inserted twice.

use crate::classify::{classify, Classification, MatchStatus, SEARCH_FAILED};
use crate::columns::{Field, RawRow, RowFields};
use crate::disambiguate::{disambiguate, Narrowing};
use crate::normalize::{parse_api_number, ApiNumber};
use crate::query::{build_query, NormalizedQuery};
use crate::registry::{CandidateWell, Strategy};
use crate::resolver::{CascadingResolver, ResolveError, Resolution};
use crate::tracked::{CommitItem, PlanSnapshot, TrackedWellStore};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Selection value that explicitly excludes a row from commit
pub const SKIP_SELECTION: &str = "SKIP";

pub const ALREADY_TRACKED_WARNING: &str = "Well already tracked";

/// Batch-level failures; anything per-row is reported inside [`RowResult`]
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Too many rows: {count} (maximum {max})")]
    TooManyRows { count: usize, max: usize },

    #[error("Plan limit exceeded: {plan} plan allows {limit} wells, {current} tracked, {adding} to add")]
    PlanLimitExceeded {
        plan: String,
        limit: usize,
        current: usize,
        adding: usize,
    },

    #[error("Batch cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] mrp_common::Error),
}

/// Resolution outcome for one uploaded row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowResult {
    pub row_index: usize,
    #[serde(default)]
    pub normalized: NormalizedQuery,
    pub match_status: MatchStatus,
    /// Resolved API for `has_api` / `exact` rows
    #[serde(default)]
    pub api_number: Option<String>,
    #[serde(default)]
    pub candidates: Vec<CandidateWell>,
    #[serde(default)]
    pub strategy: Option<Strategy>,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub is_duplicate: bool,
    #[serde(default)]
    pub needs_selection: bool,
}

impl RowResult {
    fn new(row_index: usize, normalized: NormalizedQuery) -> Self {
        Self {
            row_index,
            normalized,
            match_status: MatchStatus::NotFound,
            api_number: None,
            candidates: Vec::new(),
            strategy: None,
            truncated: false,
            warnings: Vec::new(),
            errors: Vec::new(),
            is_duplicate: false,
            needs_selection: false,
        }
    }

    fn apply(&mut self, classification: Classification) {
        self.match_status = classification.status;
        self.api_number = classification.api_number;
        self.candidates = classification.candidates;
        self.warnings.extend(classification.warnings);
        self.errors.extend(classification.errors);
        self.needs_selection = self.match_status == MatchStatus::Ambiguous;
    }

    /// API this row would import without a user selection
    pub fn resolved_api(&self) -> Option<&str> {
        if self.match_status.is_resolved() {
            self.api_number.as_deref()
        } else {
            None
        }
    }
}

/// Aggregate counts over a validated batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total: usize,
    pub exact_matches: usize,
    pub needs_review: usize,
    pub not_found: usize,
    pub has_api: usize,
    pub duplicates: usize,
    pub will_import: usize,
}

/// Plan-limit projection for a validated batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCheck {
    pub plan: String,
    pub current: usize,
    pub limit: Option<usize>,
    pub will_import: usize,
    pub after_import: usize,
    pub would_exceed: bool,
}

impl PlanCheck {
    pub fn project(snapshot: &PlanSnapshot, will_import: usize) -> Self {
        Self {
            plan: snapshot.plan.clone(),
            current: snapshot.current_count,
            limit: snapshot.well_limit,
            will_import,
            after_import: snapshot.current_count + will_import,
            would_exceed: !snapshot.allows(will_import),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub results: Vec<RowResult>,
    pub summary: ValidationSummary,
    pub plan_check: PlanCheck,
}

/// Commit input: validate results echoed back plus per-row selections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub wells: Vec<RowResult>,
    /// Row index → API number of a candidate, or `SKIP`
    #[serde(default)]
    pub selections: HashMap<usize, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStatus {
    Imported,
    Skipped,
    Duplicate,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRowOutcome {
    pub row_index: usize,
    pub api_number: Option<String>,
    pub status: CommitStatus,
    pub is_duplicate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResults {
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duplicates_skipped: usize,
    pub errors: Vec<String>,
    pub rows: Vec<CommitRowOutcome>,
}

impl CommitResults {
    fn record(&mut self, row_index: usize, api_number: Option<String>, status: CommitStatus) {
        match status {
            CommitStatus::Imported => self.successful += 1,
            CommitStatus::Skipped => self.skipped += 1,
            CommitStatus::Duplicate => self.duplicates_skipped += 1,
            CommitStatus::Failed => self.failed += 1,
        }
        self.rows.push(CommitRowOutcome {
            row_index,
            api_number,
            status,
            is_duplicate: status == CommitStatus::Duplicate,
        });
    }

    fn fail(&mut self, row_index: usize, api_number: Option<String>, message: String) {
        self.errors.push(message);
        self.record(row_index, api_number, CommitStatus::Failed);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    /// No row failed
    pub success: bool,
    pub results: CommitResults,
}

/// Mark rows whose resolved API is already tracked or appeared in an earlier
/// row. `results` must be in row order.
pub fn mark_duplicates(results: &mut [RowResult], tracked: &HashSet<String>) {
    let mut first_seen: HashMap<String, usize> = HashMap::new();

    for result in results.iter_mut() {
        let Some(api) = result.resolved_api().map(str::to_string) else {
            continue;
        };

        if tracked.contains(&api) {
            result.is_duplicate = true;
            result.warnings.push(ALREADY_TRACKED_WARNING.to_string());
        } else if let Some(first) = first_seen.get(&api) {
            result.is_duplicate = true;
            result
                .warnings
                .push(format!("Duplicate of row {} in this upload", first + 1));
        } else {
            first_seen.insert(api, result.row_index);
        }
    }
}

pub fn summarize(results: &[RowResult]) -> ValidationSummary {
    let count = |status: MatchStatus| results.iter().filter(|r| r.match_status == status).count();

    ValidationSummary {
        total: results.len(),
        exact_matches: count(MatchStatus::Exact),
        needs_review: count(MatchStatus::Ambiguous),
        not_found: count(MatchStatus::NotFound),
        has_api: count(MatchStatus::HasApi),
        duplicates: results.iter().filter(|r| r.is_duplicate).count(),
        will_import: results
            .iter()
            .filter(|r| r.match_status.is_resolved() && !r.is_duplicate)
            .count(),
    }
}

fn item_from_candidate(row_index: usize, candidate: &CandidateWell) -> CommitItem {
    CommitItem {
        row_index,
        api_number: candidate.api_number.clone(),
        well_name: Some(candidate.full_name()),
        operator: candidate.operator.clone(),
        section: candidate.section,
        township: candidate.township.clone(),
        range: candidate.range.clone(),
        meridian: Some(candidate.meridian.clone()),
    }
}

fn item_from_row(row: &RowResult, api_number: &str) -> CommitItem {
    let q = &row.normalized;
    CommitItem {
        row_index: row.row_index,
        api_number: api_number.to_string(),
        well_name: q.has_name().then(|| q.cleaned_well_name.clone()),
        operator: q.has_operator().then(|| q.operator.clone()),
        section: q.section.map(i64::from),
        township: q.township.clone(),
        range: q.range.clone(),
        meridian: Some(q.meridian.code().to_string()),
    }
}

/// What to insert for a row, from its selection or its resolved API
enum RowPlan {
    Insert(CommitItem),
    Skip,
    Fail(String),
}

fn plan_row(row: &RowResult, selection: Option<&str>) -> RowPlan {
    let human_row = row.row_index + 1;

    match selection {
        Some(s) if s.eq_ignore_ascii_case(SKIP_SELECTION) => RowPlan::Skip,
        Some(api) => {
            if let Some(candidate) = row.candidates.iter().find(|c| c.api_number == api) {
                RowPlan::Insert(item_from_candidate(row.row_index, candidate))
            } else if row.api_number.as_deref() == Some(api) {
                RowPlan::Insert(item_from_row(row, api))
            } else {
                RowPlan::Fail(format!(
                    "Row {}: selected well {} is not one of the candidates",
                    human_row, api
                ))
            }
        }
        None => match (row.match_status, row.api_number.as_deref()) {
            (MatchStatus::Exact, Some(api)) => match row.candidates.iter().find(|c| c.api_number == api) {
                Some(candidate) => RowPlan::Insert(item_from_candidate(row.row_index, candidate)),
                None => RowPlan::Insert(item_from_row(row, api)),
            },
            (MatchStatus::HasApi, Some(api)) => RowPlan::Insert(item_from_row(row, api)),
            (MatchStatus::HasApi | MatchStatus::Exact, None) => {
                RowPlan::Fail(format!("Row {}: no API number to import", human_row))
            }
            (MatchStatus::Ambiguous | MatchStatus::NotFound, _) => RowPlan::Skip,
        },
    }
}

/// Runs validate and commit for uploaded well lists
#[derive(Clone)]
pub struct BatchOrchestrator {
    resolver: CascadingResolver,
    tracked: Arc<dyn TrackedWellStore>,
}

impl BatchOrchestrator {
    pub fn new(resolver: CascadingResolver, tracked: Arc<dyn TrackedWellStore>) -> Self {
        Self { resolver, tracked }
    }

    fn check_size(&self, count: usize) -> Result<(), BatchError> {
        let max = self.resolver.settings().max_batch_rows;
        if count > max {
            return Err(BatchError::TooManyRows { count, max });
        }
        Ok(())
    }

    /// Resolve one raw row; every failure is folded into the result
    pub async fn resolve_row(&self, row_index: usize, raw: &RawRow) -> RowResult {
        let fields = RowFields::from_raw(raw);
        let mut result = RowResult::new(row_index, build_query(&fields));

        match parse_api_number(fields.get(Field::Api)) {
            ApiNumber::Valid(api) => {
                result.match_status = MatchStatus::HasApi;
                result.api_number = Some(api);
                return result;
            }
            ApiNumber::Invalid(value) => result.warnings.push(format!(
                "Invalid API number \"{}\" - searching by name/location",
                value
            )),
            ApiNumber::Absent => {}
        }

        let settings = self.resolver.settings();
        let deadline = Duration::from_millis(settings.row_timeout_ms);

        let outcome = tokio::time::timeout(deadline, self.resolver.resolve(&result.normalized)).await;
        let classification = match outcome {
            Ok(Ok(resolution)) => {
                let (candidates, narrowing) =
                    disambiguate(resolution.candidates, &result.normalized.operator);
                debug!(row_index, ?narrowing, "Operator disambiguation");

                // a narrowed set is no longer the registry's match count
                let total = match narrowing {
                    Narrowing::Single | Narrowing::Narrowed => candidates.len(),
                    Narrowing::NotApplied | Narrowing::NoMatch => resolution.total,
                };

                result.strategy = resolution.strategy;
                result.truncated = resolution.truncated;
                classify(
                    &result.normalized,
                    Resolution {
                        strategy: resolution.strategy,
                        candidates,
                        truncated: resolution.truncated,
                        total,
                    },
                    settings,
                )
            }
            Ok(Err(ResolveError::InsufficientCriteria)) => {
                Classification::not_found(ResolveError::InsufficientCriteria.to_string())
            }
            Ok(Err(e)) => {
                warn!(row_index, error = %e, "Row resolution failed");
                Classification::not_found(SEARCH_FAILED)
            }
            Err(_) => {
                warn!(row_index, timeout_ms = settings.row_timeout_ms, "Row resolution timed out");
                Classification::not_found(SEARCH_FAILED)
            }
        };

        result.apply(classification);
        result
    }

    /// Resolve every row and summarize. Cancelling `cancel` abandons rows
    /// still in flight.
    pub async fn validate(
        &self,
        user_id: &str,
        rows: &[RawRow],
        cancel: &CancellationToken,
    ) -> Result<ValidateResponse, BatchError> {
        self.check_size(rows.len())?;

        let tracked = self.tracked.tracked_api_numbers(user_id).await?;
        let plan = self.tracked.plan_snapshot(user_id).await?;
        let workers = self.resolver.settings().max_concurrent_rows.max(1);

        // futures are built eagerly; polling still starts only under the cap
        let pending: Vec<_> = rows
            .iter()
            .enumerate()
            .map(|(index, raw)| self.resolve_row(index, raw))
            .collect();
        let resolving = stream::iter(pending)
            .buffer_unordered(workers)
            .collect::<Vec<_>>();

        let mut results = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(user_id, rows = rows.len(), "Validation cancelled");
                return Err(BatchError::Cancelled);
            }
            results = resolving => results,
        };

        // completion order is arbitrary; duplicate marking needs row order
        results.sort_by_key(|r| r.row_index);
        mark_duplicates(&mut results, &tracked);

        let summary = summarize(&results);
        let plan_check = PlanCheck::project(&plan, summary.will_import);

        info!(
            user_id,
            total = summary.total,
            exact = summary.exact_matches,
            ambiguous = summary.needs_review,
            not_found = summary.not_found,
            has_api = summary.has_api,
            duplicates = summary.duplicates,
            would_exceed = plan_check.would_exceed,
            "Batch validated"
        );

        Ok(ValidateResponse {
            results,
            summary,
            plan_check,
        })
    }

    /// Commit validated rows for a user
    pub async fn commit(&self, user_id: &str, request: &CommitRequest) -> Result<CommitResponse, BatchError> {
        self.check_size(request.wells.len())?;

        let tracked = self.tracked.tracked_api_numbers(user_id).await?;
        let mut results = CommitResults::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut to_insert = Vec::new();

        let mut rows: Vec<&RowResult> = request.wells.iter().collect();
        rows.sort_by_key(|r| r.row_index);

        for row in rows {
            let selection = request.selections.get(&row.row_index).map(|s| s.trim());
            match plan_row(row, selection) {
                RowPlan::Skip => results.record(row.row_index, None, CommitStatus::Skipped),
                RowPlan::Fail(message) => results.fail(row.row_index, None, message),
                RowPlan::Insert(item) => {
                    if tracked.contains(&item.api_number) || !seen.insert(item.api_number.clone()) {
                        results.record(row.row_index, Some(item.api_number), CommitStatus::Duplicate);
                    } else {
                        to_insert.push(item);
                    }
                }
            }
        }

        let plan = self.tracked.plan_snapshot(user_id).await?;
        if !plan.allows(to_insert.len()) {
            return Err(BatchError::PlanLimitExceeded {
                plan: plan.plan,
                limit: plan.well_limit.unwrap_or_default(),
                current: plan.current_count,
                adding: to_insert.len(),
            });
        }

        for item in to_insert {
            match self.tracked.insert_tracked_well(user_id, &item).await {
                Ok(()) => results.record(item.row_index, Some(item.api_number), CommitStatus::Imported),
                Err(e) => {
                    warn!(user_id, api = %item.api_number, error = %e, "Insert failed");
                    let message = format!(
                        "Row {}: failed to add well {}: {}",
                        item.row_index + 1,
                        item.api_number,
                        e
                    );
                    results.fail(item.row_index, Some(item.api_number), message);
                }
            }
        }

        results.rows.sort_by_key(|r| r.row_index);

        info!(
            user_id,
            successful = results.successful,
            failed = results.failed,
            skipped = results.skipped,
            duplicates = results.duplicates_skipped,
            "Batch committed"
        );

        Ok(CommitResponse {
            success: results.failed == 0,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MemoryRegistry, SearchParams, WellRegistry};
    use crate::tracked::SqliteTrackedWellStore;
    use async_trait::async_trait;
    use mrp_common::config::{PlanDefaults, ResolverSettings};
    use mrp_common::db::{init_memory_database, set_user_plan, WellRecord};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingRegistry;

    #[async_trait]
    impl WellRegistry for FailingRegistry {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn search(&self, _: Strategy, _: &SearchParams) -> mrp_common::Result<Vec<CandidateWell>> {
            Err(mrp_common::Error::Registry("registry offline".to_string()))
        }
    }

    struct StalledRegistry;

    #[async_trait]
    impl WellRegistry for StalledRegistry {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn search(&self, _: Strategy, _: &SearchParams) -> mrp_common::Result<Vec<CandidateWell>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    /// Tracks how many searches run at once
    #[derive(Default)]
    struct GaugedRegistry {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        searches: AtomicUsize,
    }

    #[async_trait]
    impl WellRegistry for GaugedRegistry {
        fn name(&self) -> &'static str {
            "gauged"
        }

        async fn search(&self, _: Strategy, _: &SearchParams) -> mrp_common::Result<Vec<CandidateWell>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.searches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn well(api: &str, name: &str, number: &str, operator: &str, section: i64) -> WellRecord {
        WellRecord {
            api_number: api.to_string(),
            well_name: name.to_string(),
            well_number: Some(number.to_string()),
            operator: Some(operator.to_string()),
            section: Some(section),
            township: Some("04N".to_string()),
            range: Some("03W".to_string()),
            meridian: "IM".to_string(),
            county: Some("GRADY".to_string()),
            well_status: Some("AC".to_string()),
        }
    }

    fn registry_wells() -> Vec<WellRecord> {
        vec![
            well("3505100001", "FEIKES A UNIT", "3H-30X", "Acme Energy", 30),
            well("3505100002", "FEIKES A UNIT", "4H-30X", "Acme Energy", 30),
            well("3505100003", "JONES", "1-7", "Devon Energy", 7),
            well("3505100004", "BROWN", "2-7", "Acme Energy", 7),
            well("3505100005", "WHITE", "3-7", "Continental", 7),
        ]
    }

    fn row(value: Value) -> RawRow {
        match value {
            Value::Object(map) => map,
            other => panic!("test row must be an object: {}", other),
        }
    }

    async fn orchestrator_with(registry: Arc<dyn WellRegistry>, settings: ResolverSettings) -> (BatchOrchestrator, Arc<SqliteTrackedWellStore>) {
        let pool = init_memory_database().await.unwrap();
        let store = Arc::new(SqliteTrackedWellStore::new(pool, PlanDefaults::default()));
        let resolver = CascadingResolver::new(registry, settings);
        (BatchOrchestrator::new(resolver, store.clone()), store)
    }

    async fn orchestrator() -> (BatchOrchestrator, Arc<SqliteTrackedWellStore>) {
        orchestrator_with(Arc::new(MemoryRegistry::new(registry_wells())), ResolverSettings::default()).await
    }

    #[tokio::test]
    async fn test_name_and_location_resolves_exact() {
        let (orchestrator, _) = orchestrator().await;
        let rows = vec![row(json!({
            "Well Name": "FEIKES A UNIT",
            "Well Number": "3H-30X",
            "Operator": "Acme Energy",
            "Section": "30",
            "Township": "4N",
            "Range": "3W",
        }))];

        let response = orchestrator.validate("alice", &rows, &CancellationToken::new()).await.unwrap();

        let result = &response.results[0];
        assert_eq!(result.match_status, MatchStatus::Exact);
        assert_eq!(result.api_number.as_deref(), Some("3505100001"));
        assert_eq!(result.candidates[0].match_score, 100);
        assert_eq!(result.strategy, Some(Strategy::LocationName));
        assert!(!result.needs_selection);
        assert_eq!(response.summary.exact_matches, 1);
        assert_eq!(response.summary.will_import, 1);
    }

    #[tokio::test]
    async fn test_quoted_name_resolves_exact() {
        let registry = MemoryRegistry::new(vec![well("3505100010", "FEIKES A UNIT", "3H-30X", "Acme Energy", 12)]);
        let (orchestrator, _) = orchestrator_with(Arc::new(registry), ResolverSettings::default()).await;
        let rows = vec![row(json!({
            "WELL_NAME": "FEIKES \"A\" UNIT",
            "WELL_NUM": "3H-30X",
            "Section": "12",
            "Township": "4N",
            "Range": "3W",
            "Operator": "Acme",
        }))];

        let response = orchestrator.validate("alice", &rows, &CancellationToken::new()).await.unwrap();

        let result = &response.results[0];
        assert_eq!(result.normalized.cleaned_well_name, "FEIKES A UNIT 3H-30X");
        assert_eq!(result.normalized.base_well_name, "FEIKES A UNIT");
        assert_eq!(result.normalized.location_label(), "S12-T04N-R03W-IM");
        assert_eq!(result.match_status, MatchStatus::Exact);
        assert_eq!(result.candidates[0].match_score, 100);
    }

    #[tokio::test]
    async fn test_base_name_at_location_is_ambiguous() {
        let (orchestrator, _) = orchestrator().await;
        let rows = vec![row(json!({
            "Well Name": "FEIKES A UNIT",
            "Sec": 30,
            "Twp": "04N",
            "Rng": "03W",
        }))];

        let response = orchestrator.validate("alice", &rows, &CancellationToken::new()).await.unwrap();

        let result = &response.results[0];
        assert_eq!(result.match_status, MatchStatus::Ambiguous);
        assert!(result.needs_selection);
        assert_eq!(result.candidates.len(), 2);
        assert_eq!(
            result.warnings,
            vec!["2 matches found - please select the correct well".to_string()]
        );
        assert_eq!(response.summary.needs_review, 1);
        assert_eq!(response.summary.will_import, 0);
    }

    #[tokio::test]
    async fn test_operator_picks_one_of_section_candidates() {
        let (orchestrator, _) = orchestrator().await;
        let rows = vec![row(json!({
            "Well Name": "SMITH 1",
            "Operator": "ACME",
            "Section": "7",
            "Township": "4",
            "Range": "3",
        }))];

        let response = orchestrator.validate("alice", &rows, &CancellationToken::new()).await.unwrap();

        let result = &response.results[0];
        assert_eq!(result.strategy, Some(Strategy::SectionLocation));
        assert_eq!(result.match_status, MatchStatus::Exact);
        assert_eq!(result.api_number.as_deref(), Some("3505100004"));
        assert_eq!(result.candidates[0].match_score, 100);
    }

    #[tokio::test]
    async fn test_api_column_bypasses_resolver() {
        let (orchestrator, _) = orchestrator_with(Arc::new(FailingRegistry), ResolverSettings::default()).await;
        let rows = vec![
            row(json!({ "API Number": "35-051-00009-0000" })),
            row(json!({ "API": "4205100001", "Well Name": "JONES 1-7" })),
        ];

        let response = orchestrator.validate("alice", &rows, &CancellationToken::new()).await.unwrap();

        assert_eq!(response.results[0].match_status, MatchStatus::HasApi);
        assert_eq!(response.results[0].api_number.as_deref(), Some("3505100009"));

        // invalid API falls through to search, which fails in isolation
        let second = &response.results[1];
        assert_eq!(second.match_status, MatchStatus::NotFound);
        assert_eq!(
            second.warnings,
            vec!["Invalid API number \"4205100001\" - searching by name/location".to_string()]
        );
        assert_eq!(second.errors, vec![SEARCH_FAILED.to_string()]);
    }

    #[tokio::test]
    async fn test_insufficient_row_not_found() {
        let (orchestrator, _) = orchestrator().await;
        let rows = vec![row(json!({ "Operator": "Acme Energy", "County": "Grady" }))];

        let response = orchestrator.validate("alice", &rows, &CancellationToken::new()).await.unwrap();

        let result = &response.results[0];
        assert_eq!(result.match_status, MatchStatus::NotFound);
        assert_eq!(
            result.errors,
            vec![ResolveError::InsufficientCriteria.to_string()]
        );
    }

    #[tokio::test]
    async fn test_row_timeout_reports_search_failed() {
        let settings = ResolverSettings {
            row_timeout_ms: 20,
            ..Default::default()
        };
        let (orchestrator, _) = orchestrator_with(Arc::new(StalledRegistry), settings).await;
        let rows = vec![row(json!({ "Well Name": "JONES", "Township": "4N", "Range": "3W" }))];

        let response = orchestrator.validate("alice", &rows, &CancellationToken::new()).await.unwrap();

        assert_eq!(response.results[0].errors, vec![SEARCH_FAILED.to_string()]);
    }

    #[tokio::test]
    async fn test_duplicates_against_tracked_and_within_batch() {
        let (orchestrator, store) = orchestrator().await;
        store
            .insert_tracked_well(
                "alice",
                &CommitItem {
                    row_index: 0,
                    api_number: "3505100003".to_string(),
                    well_name: None,
                    operator: None,
                    section: None,
                    township: None,
                    range: None,
                    meridian: None,
                },
            )
            .await
            .unwrap();

        let rows = vec![
            row(json!({ "API": "3505100003" })),
            row(json!({ "API": "3505100001" })),
            row(json!({
                "Well Name": "FEIKES A UNIT", "Well Number": "3H-30X",
                "Section": "30", "Township": "4N", "Range": "3W",
            })),
        ];

        let response = orchestrator.validate("alice", &rows, &CancellationToken::new()).await.unwrap();

        let flags: Vec<_> = response.results.iter().map(|r| r.is_duplicate).collect();
        assert_eq!(flags, vec![true, false, true]);
        assert_eq!(response.results[0].warnings, vec![ALREADY_TRACKED_WARNING.to_string()]);
        assert_eq!(
            response.results[2].warnings,
            vec!["Duplicate of row 2 in this upload".to_string()]
        );
        assert_eq!(response.summary.duplicates, 2);
        assert_eq!(response.summary.will_import, 1);
        assert_eq!(response.plan_check.current, 1);
        assert_eq!(response.plan_check.after_import, 2);
        assert!(!response.plan_check.would_exceed);
    }

    #[tokio::test]
    async fn test_results_keep_row_order() {
        let (orchestrator, _) = orchestrator().await;
        let rows: Vec<RawRow> = (0..20)
            .map(|i| row(json!({ "API": format!("35051{:05}", i) })))
            .collect();

        let response = orchestrator.validate("alice", &rows, &CancellationToken::new()).await.unwrap();

        let indexes: Vec<_> = response.results.iter().map(|r| r.row_index).collect();
        assert_eq!(indexes, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_batch_size_limits() {
        let settings = ResolverSettings {
            max_batch_rows: 2,
            ..Default::default()
        };
        let (orchestrator, _) =
            orchestrator_with(Arc::new(MemoryRegistry::new(Vec::new())), settings).await;
        let cancel = CancellationToken::new();

        let rows = vec![row(json!({ "API": "3505100001" })); 3];
        let too_many = orchestrator.validate("alice", &rows, &cancel).await.unwrap_err();
        assert!(matches!(too_many, BatchError::TooManyRows { count: 3, max: 2 }));
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let (orchestrator, store) = orchestrator().await;

        let response = orchestrator
            .validate("alice", &[], &CancellationToken::new())
            .await
            .unwrap();
        assert!(response.results.is_empty());
        assert_eq!(response.summary, ValidationSummary::default());
        assert_eq!(response.plan_check.after_import, 0);
        assert!(!response.plan_check.would_exceed);

        let committed = orchestrator.commit("alice", &CommitRequest::default()).await.unwrap();
        assert!(committed.success);
        assert_eq!(committed.results, CommitResults::default());
        assert!(store.tracked_api_numbers("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_rows_capped() {
        let registry = Arc::new(GaugedRegistry::default());
        let settings = ResolverSettings {
            max_concurrent_rows: 3,
            ..Default::default()
        };
        let (orchestrator, _) = orchestrator_with(registry.clone(), settings).await;

        // a bare name only reaches the statewide strategy: one search per row
        let rows: Vec<RawRow> = (0..12)
            .map(|i| row(json!({ "Well Name": format!("NOWHERE {}", i) })))
            .collect();
        let response = orchestrator.validate("alice", &rows, &CancellationToken::new()).await.unwrap();

        assert_eq!(response.results.len(), 12);
        assert_eq!(registry.searches.load(Ordering::SeqCst), 12);
        let peak = registry.peak.load(Ordering::SeqCst);
        assert!(peak >= 2, "rows never overlapped (peak {})", peak);
        assert!(peak <= 3, "peak {} exceeds the worker cap", peak);
    }

    #[tokio::test]
    async fn test_cancel_while_rows_in_flight() {
        let (orchestrator, _) = orchestrator_with(Arc::new(StalledRegistry), ResolverSettings::default()).await;
        let rows = vec![row(json!({ "Well Name": "JONES", "Township": "4N", "Range": "3W" })); 4];
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            orchestrator.validate("alice", &rows, &cancel),
        )
        .await
        .expect("cancellation did not interrupt in-flight rows");
        assert!(matches!(outcome, Err(BatchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_validation() {
        let (orchestrator, _) = orchestrator().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = orchestrator
            .validate("alice", &[row(json!({ "API": "3505100001" }))], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Cancelled));
    }

    async fn validated(orchestrator: &BatchOrchestrator) -> Vec<RowResult> {
        let rows = vec![
            row(json!({ "API": "3505100009" })),
            row(json!({
                "Well Name": "FEIKES A UNIT", "Section": "30", "Township": "4N", "Range": "3W",
            })),
            row(json!({ "Well Name": "NOWHERE 9", "Township": "20N", "Range": "20W" })),
            row(json!({ "API": "3505100009" })),
        ];
        orchestrator
            .validate("alice", &rows, &CancellationToken::new())
            .await
            .unwrap()
            .results
    }

    #[tokio::test]
    async fn test_commit_with_selection() {
        let (orchestrator, store) = orchestrator().await;
        let wells = validated(&orchestrator).await;

        let request = CommitRequest {
            wells,
            selections: HashMap::from([(1, "3505100002".to_string())]),
        };
        let response = orchestrator.commit("alice", &request).await.unwrap();

        assert!(response.success);
        assert_eq!(response.results.successful, 2);
        assert_eq!(response.results.skipped, 1);
        assert_eq!(response.results.duplicates_skipped, 1);
        assert_eq!(response.results.rows[3].status, CommitStatus::Duplicate);
        assert!(response.results.rows[3].is_duplicate);

        let tracked = store.tracked_api_numbers("alice").await.unwrap();
        assert_eq!(
            tracked,
            HashSet::from(["3505100009".to_string(), "3505100002".to_string()])
        );
    }

    #[tokio::test]
    async fn test_commit_first_seen_wins() {
        let (orchestrator, store) = orchestrator().await;
        let rows = vec![
            row(json!({ "API": "3512345678" })),
            row(json!({ "API": "3512345678" })),
        ];
        let wells = orchestrator
            .validate("alice", &rows, &CancellationToken::new())
            .await
            .unwrap()
            .results;

        let request = CommitRequest {
            wells,
            selections: HashMap::new(),
        };
        let response = orchestrator.commit("alice", &request).await.unwrap();

        assert_eq!(response.results.successful, 1);
        assert_eq!(response.results.duplicates_skipped, 1);
        assert_eq!(response.results.rows[0].status, CommitStatus::Imported);
        assert!(response.results.rows[1].is_duplicate);
        assert_eq!(store.tracked_api_numbers("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_skip_and_foreign_selection() {
        let (orchestrator, store) = orchestrator().await;
        let wells = validated(&orchestrator).await;

        let request = CommitRequest {
            wells,
            selections: HashMap::from([
                (0, "skip".to_string()),
                (1, "3505199999".to_string()),
            ]),
        };
        let response = orchestrator.commit("alice", &request).await.unwrap();

        assert!(!response.success);
        assert_eq!(response.results.failed, 1);
        assert!(response.results.errors[0].contains("not one of the candidates"));
        // row 3 carries the same API as the skipped row 0 and is imported
        assert_eq!(response.results.successful, 1);
        assert_eq!(store.tracked_api_numbers("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_rechecks_tracked_wells() {
        let (orchestrator, store) = orchestrator().await;
        let wells = validated(&orchestrator).await;

        // added by another session between validate and commit
        store
            .insert_tracked_well(
                "alice",
                &CommitItem {
                    row_index: 0,
                    api_number: "3505100009".to_string(),
                    well_name: None,
                    operator: None,
                    section: None,
                    township: None,
                    range: None,
                    meridian: None,
                },
            )
            .await
            .unwrap();

        let request = CommitRequest {
            wells,
            selections: HashMap::new(),
        };
        let response = orchestrator.commit("alice", &request).await.unwrap();

        assert!(response.success);
        assert_eq!(response.results.successful, 0);
        assert_eq!(response.results.duplicates_skipped, 2);
    }

    #[tokio::test]
    async fn test_commit_plan_limit_blocks_all_writes() {
        let (orchestrator, store) = orchestrator().await;
        set_user_plan(store.pool(), "alice", "trial", Some(1)).await.unwrap();
        let wells = validated(&orchestrator).await;

        let request = CommitRequest {
            wells,
            selections: HashMap::from([(1, "3505100001".to_string())]),
        };
        let err = orchestrator.commit("alice", &request).await.unwrap_err();

        assert!(matches!(
            err,
            BatchError::PlanLimitExceeded { limit: 1, current: 0, adding: 2, .. }
        ));
        assert!(store.tracked_api_numbers("alice").await.unwrap().is_empty());
    }
}
