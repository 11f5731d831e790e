//! Tracked-wells store
//!
//! Read side: the duplicate snapshot (API numbers a user already tracks) and
//! the plan snapshot (current count and limit), both taken once per batch.
//! Write side: inserting committed wells.

use async_trait::async_trait;
use mrp_common::config::PlanDefaults;
use mrp_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashSet;
use uuid::Uuid;

/// Read-only view of a user's plan at the start of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSnapshot {
    pub plan: String,
    pub current_count: usize,
    /// `None` means unlimited
    pub well_limit: Option<usize>,
}

impl PlanSnapshot {
    /// Whether `additional` more wells fit within the limit
    pub fn allows(&self, additional: usize) -> bool {
        self.well_limit
            .map_or(true, |limit| self.current_count + additional <= limit)
    }
}

/// A well about to be added to a user's tracked list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitItem {
    pub row_index: usize,
    pub api_number: String,
    pub well_name: Option<String>,
    pub operator: Option<String>,
    pub section: Option<i64>,
    pub township: Option<String>,
    pub range: Option<String>,
    pub meridian: Option<String>,
}

/// Storage for wells a user already tracks
#[async_trait]
pub trait TrackedWellStore: Send + Sync {
    /// API numbers the user already tracks
    async fn tracked_api_numbers(&self, user_id: &str) -> Result<HashSet<String>>;

    async fn plan_snapshot(&self, user_id: &str) -> Result<PlanSnapshot>;

    async fn insert_tracked_well(&self, user_id: &str, item: &CommitItem) -> Result<()>;
}

/// Tracked wells and plans in the service database
#[derive(Clone)]
pub struct SqliteTrackedWellStore {
    db: SqlitePool,
    defaults: PlanDefaults,
}

impl SqliteTrackedWellStore {
    pub fn new(db: SqlitePool, defaults: PlanDefaults) -> Self {
        Self { db, defaults }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }
}

#[async_trait]
impl TrackedWellStore for SqliteTrackedWellStore {
    async fn tracked_api_numbers(&self, user_id: &str) -> Result<HashSet<String>> {
        let apis: Vec<String> =
            sqlx::query_scalar("SELECT api_number FROM tracked_wells WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(&self.db)
                .await?;

        Ok(apis.into_iter().collect())
    }

    async fn plan_snapshot(&self, user_id: &str) -> Result<PlanSnapshot> {
        let current: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracked_wells WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        let plan: Option<(String, Option<i64>)> =
            sqlx::query_as("SELECT plan, well_limit FROM user_plans WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

        let (plan, well_limit) = match plan {
            Some((plan, limit)) => (plan, limit.map(|l| l.max(0) as usize)),
            None => (self.defaults.default_plan.clone(), self.defaults.well_limit()),
        };

        Ok(PlanSnapshot {
            plan,
            current_count: current.max(0) as usize,
            well_limit,
        })
    }

    async fn insert_tracked_well(&self, user_id: &str, item: &CommitItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tracked_wells
                (guid, user_id, api_number, well_name, operator, sec, twp, rng, meridian, source_row)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(&item.api_number)
        .bind(&item.well_name)
        .bind(&item.operator)
        .bind(item.section)
        .bind(&item.township)
        .bind(&item.range)
        .bind(&item.meridian)
        .bind(item.row_index as i64)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
