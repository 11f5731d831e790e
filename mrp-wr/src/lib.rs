//! mrp-wr library interface
//!
//! Well Resolver: turns rows of an uploaded well list into registry API
//! numbers. Row pipeline:
//!
//! ```text
//! RawRow → columns → query (normalize) → resolver (registry cascade)
//!        → disambiguate (operator) → classify → batch (duplicates, summary)
//! ```

pub mod api;
pub mod batch;
pub mod classify;
pub mod columns;
pub mod disambiguate;
pub mod error;
pub mod normalize;
pub mod property;
pub mod query;
pub mod registry;
pub mod resolver;
pub mod tracked;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use mrp_common::config::TomlConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::batch::BatchOrchestrator;
use crate::registry::{SqliteRegistry, WellRegistry};
use crate::resolver::CascadingResolver;
use crate::tracked::{SqliteTrackedWellStore, TrackedWellStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BatchOrchestrator>,
    /// Cancelled on shutdown; each request works on a child token
    pub shutdown: CancellationToken,
    pub max_batch_rows: usize,
    pub registry_name: &'static str,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        registry: Arc<dyn WellRegistry>,
        tracked: Arc<dyn TrackedWellStore>,
        config: &TomlConfig,
    ) -> Self {
        let registry_name = registry.name();
        let resolver = CascadingResolver::new(registry, config.resolver.clone());

        Self {
            orchestrator: Arc::new(BatchOrchestrator::new(resolver, tracked)),
            shutdown: CancellationToken::new(),
            max_batch_rows: config.resolver.max_batch_rows,
            registry_name,
            startup_time: Utc::now(),
        }
    }

    /// Registry and tracked wells both served from one SQLite database
    pub fn from_pool(db: SqlitePool, config: &TomlConfig) -> Self {
        let registry = Arc::new(SqliteRegistry::new(db.clone()));
        let tracked = Arc::new(SqliteTrackedWellStore::new(db, config.plans.clone()));
        Self::new(registry, tracked, config)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::well_routes())
        .merge(api::property_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
