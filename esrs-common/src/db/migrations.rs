//! Database schema migrations
//!
//! Tables are created with `CREATE TABLE IF NOT EXISTS` in [`super::init`];
//! anything that changes an existing schema goes here as a numbered migration
//! tracked in `schema_version`. Never edit a released migration, add a new one.

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Increment when adding a migration
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Latest applied version, 0 for a fresh database
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;
    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: tenant-leading indexes for scoped lookups
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_emissions_tenant_year ON emissions(tenant_guid, reporting_year)",
        "CREATE INDEX IF NOT EXISTS idx_factors_tenant ON emission_factors(tenant_guid, name)",
        "CREATE INDEX IF NOT EXISTS idx_evidence_emission ON evidence_documents(tenant_guid, emission_guid)",
        "CREATE INDEX IF NOT EXISTS idx_vouchers_tenant ON vouchers(tenant_guid, code)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_tenant ON wizard_sessions(tenant_guid)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Migration v2: storage location for evidence documents
///
/// Databases created before v2 lack the column; fresh ones already have it.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('evidence_documents') WHERE name = 'storage_uri'",
    )
    .fetch_one(pool)
    .await?;

    if has_column == 0 {
        sqlx::query("ALTER TABLE evidence_documents ADD COLUMN storage_uri TEXT")
            .execute(pool)
            .await?;
        info!("Migration v2: added storage_uri to evidence_documents");
    }
    Ok(())
}
