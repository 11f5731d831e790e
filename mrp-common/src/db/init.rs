//! Database initialization
//!
//! One SQLite file holds both the well registry (`wells`) and the per-user
//! tracked-wells store. All table creation is idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Open (creating if missing) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets batch validation read while a commit writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// `:memory:` databases are per-connection, so the pool is capped at one.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create every table and index used by the services
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_wells_table(pool).await?;
    create_tracked_wells_table(pool).await?;
    create_user_plans_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Canonical well registry
///
/// Township/range are stored in padded canonical form (`04N`, `12W`).
async fn create_wells_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wells (
            api_number TEXT PRIMARY KEY,
            well_name TEXT NOT NULL,
            well_number TEXT,
            operator TEXT,
            sec INTEGER,
            twp TEXT,
            rng TEXT,
            meridian TEXT NOT NULL DEFAULT 'IM',
            county TEXT,
            well_status TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_wells_location ON wells (twp, rng, meridian, sec)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_tracked_wells_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracked_wells (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            api_number TEXT NOT NULL,
            well_name TEXT,
            operator TEXT,
            sec INTEGER,
            twp TEXT,
            rng TEXT,
            meridian TEXT,
            source_row INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (user_id, api_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Plan limits per user; a NULL `well_limit` means unlimited
async fn create_user_plans_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_plans (
            user_id TEXT PRIMARY KEY,
            plan TEXT NOT NULL,
            well_limit INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
