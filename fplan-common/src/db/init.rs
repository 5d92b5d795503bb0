//! Database initialization
//!
//! Both services open the same SQLite file. Schema creation is idempotent so
//! whichever process starts first creates the tables.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the store at `db_path` and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Tracker reads while the database manager writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory store with the production schema
///
/// Limited to one connection: every `sqlite::memory:` connection is its own
/// database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_flight_plans_table(pool).await?;
    create_fleet_table(pool).await?;
    create_parked_at_table(pool).await?;
    create_airport_parking_table(pool).await?;
    create_airport_data_table(pool).await?;
    Ok(())
}

async fn create_flight_plans_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS flight_plans (
            flight_ref TEXT PRIMARY KEY,
            acid TEXT NOT NULL,
            departing_airport TEXT,
            arrival_airport TEXT,
            etd TEXT,
            eta TEXT,
            status TEXT,
            facility_id INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_flight_plans_facility ON flight_plans(facility_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_fleet_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fleet (
            acid TEXT PRIMARY KEY,
            plane_type TEXT,
            flight_ref TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_parked_at_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parked_at (
            acid TEXT PRIMARY KEY,
            facility_id INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_airport_parking_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS airport_parking (
            id INTEGER PRIMARY KEY,
            airport_code TEXT NOT NULL,
            total_space INTEGER NOT NULL DEFAULT 0,
            priority INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_airport_parking_airport ON airport_parking(airport_code, priority)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_airport_data_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS airport_data (
            ident TEXT PRIMARY KEY,
            iata_code TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_airport_data_iata ON airport_data(iata_code)")
        .execute(pool)
        .await?;

    Ok(())
}
