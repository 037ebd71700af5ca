//! Emission factor library
//!
//! A tenant sees the shared library (rows with a NULL tenant) plus its own
//! factors; it can only create factors for itself.

use chrono::Utc;
use esrs_calc::EmissionFactor;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::models::{parse_guid, parse_timestamp, FactorRecord, NewFactor};
use super::scope::TenantScope;
use crate::Result;

const FACTOR_COLUMNS: &str = "guid, tenant_guid, name, category, region, year, value, unit, \
                              source, data_quality_tier, created_at";

fn factor_from_row(row: &SqliteRow) -> Result<FactorRecord> {
    let tenant_guid: Option<String> = row.get("tenant_guid");
    Ok(FactorRecord {
        guid: parse_guid(row.get("guid"))?,
        shared: tenant_guid.is_none(),
        name: row.get("name"),
        category: row.get("category"),
        region: row.get("region"),
        year: row.get("year"),
        factor: EmissionFactor {
            value: row.get("value"),
            unit: row.get("unit"),
            source: row.get("source"),
            data_quality_tier: row.get::<i64, _>("data_quality_tier") as u8,
        },
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

/// Filters for factor lookup
#[derive(Debug, Clone, Default)]
pub struct FactorQuery {
    /// Case-insensitive substring of name, category or source
    pub text: Option<String>,
    /// Activity unit the factor must apply to (denominator of its unit)
    pub activity_unit: Option<String>,
}

impl TenantScope {
    pub async fn list_factors(&self, query: &FactorQuery) -> Result<Vec<FactorRecord>> {
        let text = query
            .text
            .as_ref()
            .map(|t| format!("%{}%", t.trim().to_lowercase()));
        let unit = query
            .activity_unit
            .as_ref()
            .map(|u| format!("%/{}", u.trim().to_lowercase()));

        let sql = format!(
            r#"
            SELECT {}
            FROM emission_factors
            WHERE (tenant_guid IS NULL OR tenant_guid = ?)
              AND (? IS NULL OR lower(name) LIKE ? OR lower(category) LIKE ? OR lower(source) LIKE ?)
              AND (? IS NULL OR lower(unit) LIKE ?)
            ORDER BY tenant_guid IS NULL, name, guid
            "#,
            FACTOR_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(self.key())
            .bind(&text)
            .bind(&text)
            .bind(&text)
            .bind(&text)
            .bind(&unit)
            .bind(&unit)
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(factor_from_row).collect()
    }

    /// Shared or own factor; `None` for another tenant's factor
    pub async fn get_factor(&self, guid: Uuid) -> Result<Option<FactorRecord>> {
        let sql = format!(
            "SELECT {} FROM emission_factors WHERE guid = ? AND (tenant_guid IS NULL OR tenant_guid = ?)",
            FACTOR_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(guid.to_string())
            .bind(self.key())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(factor_from_row).transpose()
    }

    pub async fn create_factor(&self, new: NewFactor) -> Result<FactorRecord> {
        new.validate()?;
        let record = FactorRecord {
            guid: Uuid::new_v4(),
            shared: false,
            name: new.name.trim().to_string(),
            category: new.category,
            region: new.region,
            year: new.year,
            factor: new.factor,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO emission_factors
                (guid, tenant_guid, name, category, region, year, value, unit, source, data_quality_tier, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.guid.to_string())
        .bind(self.key())
        .bind(&record.name)
        .bind(&record.category)
        .bind(&record.region)
        .bind(record.year)
        .bind(record.factor.value)
        .bind(&record.factor.unit)
        .bind(&record.factor.source)
        .bind(i64::from(record.factor.data_quality_tier))
        .bind(record.created_at.to_rfc3339())
        .execute(self.pool())
        .await?;

        Ok(record)
    }
}
