//! Emissions records, their data quality assessments and evidence

use std::collections::BTreeSet;

use chrono::Utc;
use esrs_calc::{DataQuality, EmissionFactor, GasAmount, GwpVersion, InventoryEntry, Scope};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::models::{
    parse_guid, parse_timestamp, CalculatedInput, EmissionRecord, EvidenceDocument, NewEvidence,
    ScopeSelection,
};
use super::scope::TenantScope;
use crate::{Error, Result};

/// Stored records reduced to inventory entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredInventory {
    pub entries: Vec<InventoryEntry>,
    /// GWP versions the stored totals were calculated with
    pub gwp_versions: BTreeSet<GwpVersion>,
}

const EMISSION_SELECT: &str = r#"
    SELECT e.guid, e.activity_description, e.activity_value, e.activity_unit,
           e.factor_guid, e.factor_value, e.factor_unit, e.factor_source, e.factor_tier,
           e.gases, e.gwp_version, e.scope, e.scope2_method, e.scope3_category,
           e.total_emissions_tco2e, e.uncertainty_percent, e.reporting_year,
           e.created_at, e.updated_at,
           q.tier AS dq_tier, q.temporal AS dq_temporal, q.geographical AS dq_geographical,
           q.technological AS dq_technological, q.completeness AS dq_completeness,
           q.uncertainty_percent AS dq_uncertainty, q.score AS dq_score
    FROM emissions e
    LEFT JOIN data_quality_scores q
        ON q.emission_guid = e.guid AND q.tenant_guid = e.tenant_guid
"#;

fn emission_from_row(row: &SqliteRow) -> Result<EmissionRecord> {
    let gases: String = row.get("gases");
    let gases: Vec<GasAmount> = serde_json::from_str(&gases)
        .map_err(|e| Error::Internal(format!("Failed to deserialize gases: {}", e)))?;

    let gwp: String = row.get("gwp_version");
    let gwp_version: GwpVersion = gwp.parse()?;

    let scope = Scope::from_parts(
        row.get("scope"),
        row.get("scope2_method"),
        row.get("scope3_category"),
    )?;

    let factor_guid: Option<String> = row.get("factor_guid");
    let factor_guid = factor_guid.as_deref().map(parse_guid).transpose()?;

    let dq_tier: Option<i64> = row.get("dq_tier");
    let data_quality = match dq_tier {
        Some(tier) => Some(DataQuality {
            tier: tier as u8,
            temporal: row.get::<i64, _>("dq_temporal") as u8,
            geographical: row.get::<i64, _>("dq_geographical") as u8,
            technological: row.get::<i64, _>("dq_technological") as u8,
            completeness: row.get("dq_completeness"),
            uncertainty_percent: row.get("dq_uncertainty"),
        }),
        None => None,
    };

    Ok(EmissionRecord {
        guid: parse_guid(row.get("guid"))?,
        activity_description: row.get("activity_description"),
        activity_value: row.get("activity_value"),
        activity_unit: row.get("activity_unit"),
        emission_factor_id: factor_guid,
        emission_factor: EmissionFactor {
            value: row.get("factor_value"),
            unit: row.get("factor_unit"),
            source: row.get("factor_source"),
            data_quality_tier: row.get::<i64, _>("factor_tier") as u8,
        },
        gases,
        gwp_version,
        scope: ScopeSelection::from_scope(scope),
        total_emissions_tco2e: row.get("total_emissions_tco2e"),
        uncertainty_percent: row.get("uncertainty_percent"),
        reporting_year: row.get::<i64, _>("reporting_year") as i32,
        data_quality,
        data_quality_score: row.get("dq_score"),
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

fn evidence_from_row(row: &SqliteRow) -> Result<EvidenceDocument> {
    Ok(EvidenceDocument {
        guid: parse_guid(row.get("guid"))?,
        emission_guid: parse_guid(row.get("emission_guid"))?,
        filename: row.get("filename"),
        content_type: row.get("content_type"),
        sha256: row.get("sha256"),
        size_bytes: row.get("size_bytes"),
        storage_uri: row.get("storage_uri"),
        uploaded_at: parse_timestamp(row.get("uploaded_at"))?,
    })
}

fn gases_json(gases: &[GasAmount]) -> Result<String> {
    serde_json::to_string(gases)
        .map_err(|e| Error::Internal(format!("Failed to serialize gases: {}", e)))
}

impl TenantScope {
    pub async fn create_emission(&self, input: CalculatedInput) -> Result<EmissionRecord> {
        let guid = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO emissions (
                guid, tenant_guid, activity_description, activity_value, activity_unit,
                factor_guid, factor_value, factor_unit, factor_source, factor_tier,
                gases, gwp_version, scope, scope2_method, scope3_category,
                total_emissions_tco2e, uncertainty_percent, reporting_year,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(guid.to_string())
        .bind(self.key())
        .bind(&input.activity_description)
        .bind(input.activity_value)
        .bind(&input.activity_unit)
        .bind(input.factor_guid.map(|g| g.to_string()))
        .bind(input.factor.value)
        .bind(&input.factor.unit)
        .bind(&input.factor.source)
        .bind(i64::from(input.factor.data_quality_tier))
        .bind(gases_json(&input.gases)?)
        .bind(input.gwp_version.as_str())
        .bind(input.scope.code())
        .bind(input.scope.scope2_method().map(|m| m.as_str()))
        .bind(input.scope.scope3_category().map(|c| i64::from(c.number())))
        .bind(input.total_emissions_tco2e)
        .bind(input.uncertainty_percent)
        .bind(input.reporting_year)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await?;

        self.get_emission(guid)
            .await?
            .ok_or_else(|| Error::Internal(format!("Emission {} vanished after insert", guid)))
    }

    pub async fn get_emission(&self, guid: Uuid) -> Result<Option<EmissionRecord>> {
        let sql = format!("{} WHERE e.guid = ? AND e.tenant_guid = ?", EMISSION_SELECT);
        let row = sqlx::query(&sql)
            .bind(guid.to_string())
            .bind(self.key())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(emission_from_row).transpose()
    }

    pub async fn list_emissions(
        &self,
        reporting_year: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EmissionRecord>> {
        let sql = format!(
            "{} WHERE e.tenant_guid = ? AND (? IS NULL OR e.reporting_year = ?) \
             ORDER BY e.created_at, e.guid LIMIT ? OFFSET ?",
            EMISSION_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(self.key())
            .bind(reporting_year)
            .bind(reporting_year)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(emission_from_row).collect()
    }

    pub async fn count_emissions(&self, reporting_year: Option<i32>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM emissions WHERE tenant_guid = ? AND (? IS NULL OR reporting_year = ?)",
        )
        .bind(self.key())
        .bind(reporting_year)
        .bind(reporting_year)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }

    /// Replace a record's data and recalculated total
    pub async fn update_emission(&self, guid: Uuid, input: CalculatedInput) -> Result<EmissionRecord> {
        let result = sqlx::query(
            r#"
            UPDATE emissions SET
                activity_description = ?, activity_value = ?, activity_unit = ?,
                factor_guid = ?, factor_value = ?, factor_unit = ?, factor_source = ?, factor_tier = ?,
                gases = ?, gwp_version = ?, scope = ?, scope2_method = ?, scope3_category = ?,
                total_emissions_tco2e = ?, uncertainty_percent = ?, reporting_year = ?,
                updated_at = ?
            WHERE guid = ? AND tenant_guid = ?
            "#,
        )
        .bind(&input.activity_description)
        .bind(input.activity_value)
        .bind(&input.activity_unit)
        .bind(input.factor_guid.map(|g| g.to_string()))
        .bind(input.factor.value)
        .bind(&input.factor.unit)
        .bind(&input.factor.source)
        .bind(i64::from(input.factor.data_quality_tier))
        .bind(gases_json(&input.gases)?)
        .bind(input.gwp_version.as_str())
        .bind(input.scope.code())
        .bind(input.scope.scope2_method().map(|m| m.as_str()))
        .bind(input.scope.scope3_category().map(|c| i64::from(c.number())))
        .bind(input.total_emissions_tco2e)
        .bind(input.uncertainty_percent)
        .bind(input.reporting_year)
        .bind(Utc::now().to_rfc3339())
        .bind(guid.to_string())
        .bind(self.key())
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Emission {}", guid)));
        }
        self.get_emission(guid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Emission {}", guid)))
    }

    /// Delete a record with its assessment and evidence
    pub async fn delete_emission(&self, guid: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM emissions WHERE guid = ? AND tenant_guid = ?")
            .bind(guid.to_string())
            .bind(self.key())
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Emission {}", guid)));
        }
        Ok(())
    }

    /// Attach or replace the data quality assessment of a record
    pub async fn set_data_quality(&self, emission_guid: Uuid, quality: &DataQuality) -> Result<f64> {
        let score = quality.score()?;
        if self.get_emission(emission_guid).await?.is_none() {
            return Err(Error::NotFound(format!("Emission {}", emission_guid)));
        }

        sqlx::query(
            r#"
            INSERT INTO data_quality_scores (
                emission_guid, tenant_guid, tier, temporal, geographical, technological,
                completeness, uncertainty_percent, score, assessed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(emission_guid) DO UPDATE SET
                tier = excluded.tier,
                temporal = excluded.temporal,
                geographical = excluded.geographical,
                technological = excluded.technological,
                completeness = excluded.completeness,
                uncertainty_percent = excluded.uncertainty_percent,
                score = excluded.score,
                assessed_at = excluded.assessed_at
            WHERE data_quality_scores.tenant_guid = excluded.tenant_guid
            "#,
        )
        .bind(emission_guid.to_string())
        .bind(self.key())
        .bind(i64::from(quality.tier))
        .bind(i64::from(quality.temporal))
        .bind(i64::from(quality.geographical))
        .bind(i64::from(quality.technological))
        .bind(quality.completeness)
        .bind(quality.uncertainty_percent)
        .bind(score)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;

        Ok(score)
    }

    pub async fn add_evidence(&self, emission_guid: Uuid, new: NewEvidence) -> Result<EvidenceDocument> {
        new.validate()?;
        if self.get_emission(emission_guid).await?.is_none() {
            return Err(Error::NotFound(format!("Emission {}", emission_guid)));
        }

        let document = EvidenceDocument {
            guid: Uuid::new_v4(),
            emission_guid,
            filename: new.filename.trim().to_string(),
            content_type: new.content_type,
            sha256: new.sha256.to_lowercase(),
            size_bytes: new.size_bytes,
            storage_uri: new.storage_uri,
            uploaded_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO evidence_documents (
                guid, tenant_guid, emission_guid, filename, content_type,
                sha256, size_bytes, storage_uri, uploaded_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document.guid.to_string())
        .bind(self.key())
        .bind(emission_guid.to_string())
        .bind(&document.filename)
        .bind(&document.content_type)
        .bind(&document.sha256)
        .bind(document.size_bytes)
        .bind(&document.storage_uri)
        .bind(document.uploaded_at.to_rfc3339())
        .execute(self.pool())
        .await?;

        Ok(document)
    }

    pub async fn list_evidence(&self, emission_guid: Uuid) -> Result<Vec<EvidenceDocument>> {
        if self.get_emission(emission_guid).await?.is_none() {
            return Err(Error::NotFound(format!("Emission {}", emission_guid)));
        }
        let rows = sqlx::query(
            r#"
            SELECT guid, emission_guid, filename, content_type, sha256, size_bytes, storage_uri, uploaded_at
            FROM evidence_documents
            WHERE emission_guid = ? AND tenant_guid = ?
            ORDER BY uploaded_at, guid
            "#,
        )
        .bind(emission_guid.to_string())
        .bind(self.key())
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(evidence_from_row).collect()
    }

    /// Records of a year (or all years) as inventory entries
    pub async fn inventory(&self, reporting_year: Option<i32>) -> Result<StoredInventory> {
        let sql = format!(
            "{} WHERE e.tenant_guid = ? AND (? IS NULL OR e.reporting_year = ?) ORDER BY e.created_at, e.guid",
            EMISSION_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(self.key())
            .bind(reporting_year)
            .bind(reporting_year)
            .fetch_all(self.pool())
            .await?;

        let mut inventory = StoredInventory::default();
        for row in &rows {
            let record = emission_from_row(row)?;
            inventory.gwp_versions.insert(record.gwp_version);
            inventory.entries.push(InventoryEntry {
                scope: record.scope.to_scope()?,
                total_emissions_tco2e: record.total_emissions_tco2e,
                uncertainty_percent: record.uncertainty_percent,
                quality_score: record.data_quality_score,
            });
        }
        Ok(inventory)
    }
}
