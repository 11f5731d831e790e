//! Database models

use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// One row of the canonical well registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WellRecord {
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
}

/// Insert or replace a registry well
pub async fn upsert_well(pool: &SqlitePool, well: &WellRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO wells
            (api_number, well_name, well_number, operator, sec, twp, rng, meridian, county, well_status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&well.api_number)
    .bind(&well.well_name)
    .bind(&well.well_number)
    .bind(&well.operator)
    .bind(well.section)
    .bind(&well.township)
    .bind(&well.range)
    .bind(&well.meridian)
    .bind(&well.county)
    .bind(&well.well_status)
    .execute(pool)
    .await?;

    Ok(())
}

/// Set (or replace) a user's plan
pub async fn set_user_plan(
    pool: &SqlitePool,
    user_id: &str,
    plan: &str,
    well_limit: Option<i64>,
) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO user_plans (user_id, plan, well_limit) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(plan)
        .bind(well_limit)
        .execute(pool)
        .await?;

    Ok(())
}
