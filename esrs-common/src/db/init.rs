//! Database initialization
//!
//! Creates the database on first run, applies pragmas, creates every table
//! idempotently, runs versioned migrations and seeds the shared emission
//! factor library.

use crate::Result;
use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the service database
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    prepare(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory database for tests
///
/// One connection only: every `:memory:` connection is a separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    prepare(&pool).await?;
    Ok(pool)
}

async fn prepare(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    create_schema_version_table(pool).await?;
    create_tenants_table(pool).await?;
    create_emission_factors_table(pool).await?;
    create_emissions_table(pool).await?;
    create_data_quality_scores_table(pool).await?;
    create_evidence_documents_table(pool).await?;
    create_payments_table(pool).await?;
    create_vouchers_table(pool).await?;
    create_wizard_sessions_table(pool).await?;
    create_disclosure_documents_table(pool).await?;

    crate::db::migrations::run_migrations(pool).await?;

    seed_shared_factors(pool).await?;
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

async fn create_tenants_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tenants (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            api_key_hash TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Factors with a NULL tenant form the shared library
async fn create_emission_factors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS emission_factors (
            guid TEXT PRIMARY KEY,
            tenant_guid TEXT REFERENCES tenants(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            category TEXT,
            region TEXT,
            year INTEGER,
            value REAL NOT NULL CHECK (value >= 0),
            unit TEXT NOT NULL,
            source TEXT NOT NULL,
            data_quality_tier INTEGER NOT NULL CHECK (data_quality_tier BETWEEN 1 AND 3),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_emissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS emissions (
            guid TEXT PRIMARY KEY,
            tenant_guid TEXT NOT NULL REFERENCES tenants(guid) ON DELETE CASCADE,
            activity_description TEXT NOT NULL,
            activity_value REAL NOT NULL CHECK (activity_value >= 0),
            activity_unit TEXT NOT NULL,
            factor_guid TEXT REFERENCES emission_factors(guid) ON DELETE SET NULL,
            factor_value REAL NOT NULL,
            factor_unit TEXT NOT NULL,
            factor_source TEXT NOT NULL,
            factor_tier INTEGER NOT NULL,
            gases TEXT NOT NULL DEFAULT '[]',
            gwp_version TEXT NOT NULL,
            scope TEXT NOT NULL CHECK (scope IN ('SCOPE_1', 'SCOPE_2', 'SCOPE_3')),
            scope2_method TEXT CHECK (scope2_method IN ('LOCATION_BASED', 'MARKET_BASED')),
            scope3_category INTEGER CHECK (scope3_category BETWEEN 1 AND 15),
            total_emissions_tco2e REAL NOT NULL,
            uncertainty_percent REAL,
            reporting_year INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_data_quality_scores_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS data_quality_scores (
            emission_guid TEXT PRIMARY KEY REFERENCES emissions(guid) ON DELETE CASCADE,
            tenant_guid TEXT NOT NULL REFERENCES tenants(guid) ON DELETE CASCADE,
            tier INTEGER NOT NULL,
            temporal INTEGER NOT NULL,
            geographical INTEGER NOT NULL,
            technological INTEGER NOT NULL,
            completeness REAL NOT NULL,
            uncertainty_percent REAL NOT NULL,
            score REAL NOT NULL,
            assessed_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_evidence_documents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evidence_documents (
            guid TEXT PRIMARY KEY,
            tenant_guid TEXT NOT NULL REFERENCES tenants(guid) ON DELETE CASCADE,
            emission_guid TEXT NOT NULL REFERENCES emissions(guid) ON DELETE CASCADE,
            filename TEXT NOT NULL,
            content_type TEXT NOT NULL,
            sha256 TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            storage_uri TEXT,
            uploaded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_payments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            guid TEXT PRIMARY KEY,
            tenant_guid TEXT NOT NULL REFERENCES tenants(guid) ON DELETE CASCADE,
            checkout_reference TEXT NOT NULL UNIQUE,
            amount_cents INTEGER NOT NULL,
            currency TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_vouchers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vouchers (
            guid TEXT PRIMARY KEY,
            tenant_guid TEXT NOT NULL REFERENCES tenants(guid) ON DELETE CASCADE,
            payment_guid TEXT NOT NULL REFERENCES payments(guid) ON DELETE CASCADE,
            code TEXT NOT NULL UNIQUE,
            max_uses INTEGER NOT NULL CHECK (max_uses >= 1),
            uses INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL CHECK (status IN ('ACTIVE', 'EXHAUSTED', 'EXPIRED')),
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            CHECK (uses <= max_uses)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_wizard_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wizard_sessions (
            guid TEXT PRIMARY KEY,
            tenant_guid TEXT NOT NULL REFERENCES tenants(guid) ON DELETE CASCADE,
            state TEXT NOT NULL,
            profile TEXT,
            activities TEXT NOT NULL DEFAULT '[]',
            calculated TEXT,
            validation TEXT,
            voucher_code TEXT,
            disclosure_guid TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// One document per session; rows are never updated
async fn create_disclosure_documents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS disclosure_documents (
            guid TEXT PRIMARY KEY,
            tenant_guid TEXT NOT NULL REFERENCES tenants(guid) ON DELETE CASCADE,
            session_guid TEXT NOT NULL UNIQUE REFERENCES wizard_sessions(guid),
            content TEXT NOT NULL,
            sha256 TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Shared factor library entry: (guid, name, category, region, year, value, unit, source, tier)
type SeedFactor = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    i32,
    f64,
    &'static str,
    &'static str,
    i64,
);

/// Indicative values for getting started; tenants should add their own
/// supplier- or region-specific factors.
const SHARED_FACTORS: &[SeedFactor] = &[
    ("00000000-0000-4000-8000-000000000001", "Natural gas, gross CV", "stationary_combustion", "GB", 2024, 0.18290, "kgCO2e/kWh", "DEFRA 2024", 1),
    ("00000000-0000-4000-8000-000000000002", "Diesel, average biofuel blend", "mobile_combustion", "GB", 2024, 2.51279, "kgCO2e/litre", "DEFRA 2024", 1),
    ("00000000-0000-4000-8000-000000000003", "Petrol, average biofuel blend", "mobile_combustion", "GB", 2024, 2.08440, "kgCO2e/litre", "DEFRA 2024", 1),
    ("00000000-0000-4000-8000-000000000004", "Grid electricity, UK", "purchased_electricity", "GB", 2024, 0.20705, "kgCO2e/kWh", "DEFRA 2024", 1),
    ("00000000-0000-4000-8000-000000000005", "Grid electricity, EU-27 average", "purchased_electricity", "EU", 2023, 0.25100, "kgCO2e/kWh", "EEA 2023", 1),
    ("00000000-0000-4000-8000-000000000006", "Short-haul flight, economy", "business_travel", "GLOBAL", 2024, 0.12786, "kgCO2e/passenger.km", "DEFRA 2024", 1),
    ("00000000-0000-4000-8000-000000000007", "HGV, average laden", "freight", "GB", 2024, 0.10669, "kgCO2e/tonne.km", "DEFRA 2024", 1),
    ("00000000-0000-4000-8000-000000000008", "Hotel stay, average", "business_travel", "GLOBAL", 2024, 10.4, "kgCO2e/room.night", "DEFRA 2024", 1),
    ("00000000-0000-4000-8000-000000000009", "Commercial waste to landfill", "waste", "GB", 2024, 467.0, "kgCO2e/tonne", "DEFRA 2024", 1),
];

async fn seed_shared_factors(pool: &SqlitePool) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let mut inserted = 0u64;
    for &(guid, name, category, region, year, value, unit, source, tier) in SHARED_FACTORS {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO emission_factors
                (guid, tenant_guid, name, category, region, year, value, unit, source, data_quality_tier, created_at)
            VALUES (?, NULL, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(guid)
        .bind(name)
        .bind(category)
        .bind(region)
        .bind(year)
        .bind(value)
        .bind(unit)
        .bind(source)
        .bind(tier)
        .bind(&now)
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }
    if inserted > 0 {
        info!("Seeded {} shared emission factors", inserted);
    }
    Ok(())
}
