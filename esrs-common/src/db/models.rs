//! Persisted records and request payloads

use chrono::{DateTime, Utc};
use esrs_calc::calculator::{record_total, ActivityInput};
use esrs_calc::{
    DataQuality, EmissionFactor, GasAmount, GwpVersion, Scope, Scope2Method, Scope3Category,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Tenant (organisation) owning every other record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub guid: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Scope as exchanged over the API and stored in columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeSelection {
    /// `SCOPE_1`, `SCOPE_2` or `SCOPE_3`
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope2_method: Option<Scope2Method>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope3_category: Option<u8>,
}

impl ScopeSelection {
    /// Scope 2 requires a method, Scope 3 requires a category
    pub fn to_scope(&self) -> Result<Scope> {
        match self.scope.as_str() {
            "SCOPE_1" => Ok(Scope::Scope1),
            "SCOPE_2" => {
                let method = self.scope2_method.ok_or_else(|| {
                    Error::InvalidInput("SCOPE_2 requires scope2_method".to_string())
                })?;
                Ok(Scope::Scope2 { method })
            }
            "SCOPE_3" => {
                let number = self.scope3_category.ok_or_else(|| {
                    Error::InvalidInput("SCOPE_3 requires scope3_category".to_string())
                })?;
                Ok(Scope::Scope3 {
                    category: Scope3Category::new(number)?,
                })
            }
            other => Err(Error::InvalidInput(format!("Unknown scope: {}", other))),
        }
    }

    pub fn from_scope(scope: Scope) -> Self {
        Self {
            scope: scope.code().to_string(),
            scope2_method: scope.scope2_method(),
            scope3_category: scope.scope3_category().map(|c| c.number()),
        }
    }
}

/// Emission factor from the shared library or a tenant's own list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRecord {
    pub guid: Uuid,
    /// True for the shared library (not owned by any tenant)
    pub shared: bool,
    pub name: String,
    pub category: Option<String>,
    pub region: Option<String>,
    pub year: Option<i32>,
    #[serde(flatten)]
    pub factor: EmissionFactor,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewFactor {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(flatten)]
    pub factor: EmissionFactor,
}

impl NewFactor {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("Factor name is empty".to_string()));
        }
        validate_factor(&self.factor)
    }
}

pub fn validate_factor(factor: &EmissionFactor) -> Result<()> {
    if !factor.value.is_finite() || factor.value < 0.0 {
        return Err(esrs_calc::CalcError::InvalidFactor(factor.value).into());
    }
    esrs_calc::FactorUnit::parse(&factor.unit)?;
    if !(1..=3).contains(&factor.data_quality_tier) {
        return Err(Error::InvalidInput(format!(
            "data_quality_tier must be 1-3, got {}",
            factor.data_quality_tier
        )));
    }
    Ok(())
}

/// Activity data submitted for an emissions record
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmissionInput {
    pub activity_description: String,
    pub activity_value: f64,
    pub activity_unit: String,
    /// Inline factor; takes precedence over `emission_factor_id`
    #[serde(default)]
    pub emission_factor: Option<EmissionFactor>,
    #[serde(default)]
    pub emission_factor_id: Option<Uuid>,
    #[serde(default)]
    pub gases: Vec<GasAmount>,
    #[serde(default)]
    pub gwp_version: Option<GwpVersion>,
    #[serde(flatten)]
    pub scope: ScopeSelection,
    #[serde(default)]
    pub uncertainty_percent: Option<f64>,
    pub reporting_year: i32,
}

/// Input after factor lookup and calculation, ready to store
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedInput {
    pub activity_description: String,
    pub activity_value: f64,
    pub activity_unit: String,
    pub factor_guid: Option<Uuid>,
    pub factor: EmissionFactor,
    pub gases: Vec<GasAmount>,
    pub gwp_version: GwpVersion,
    pub scope: Scope,
    pub total_emissions_tco2e: f64,
    pub uncertainty_percent: Option<f64>,
    pub reporting_year: i32,
}

impl EmissionInput {
    /// Compute the record total with a resolved factor
    ///
    /// When gases are reported the stored total is their GWP-weighted sum.
    pub fn calculate(
        self,
        factor_guid: Option<Uuid>,
        factor: EmissionFactor,
        default_gwp: GwpVersion,
    ) -> Result<CalculatedInput> {
        if self.activity_description.trim().is_empty() {
            return Err(Error::InvalidInput("activity_description is empty".to_string()));
        }
        if let Some(u) = self.uncertainty_percent {
            if !u.is_finite() || u < 0.0 {
                return Err(esrs_calc::CalcError::InvalidUncertainty(u).into());
            }
        }
        validate_factor(&factor)?;
        let scope = self.scope.to_scope()?;
        let gwp_version = self.gwp_version.unwrap_or(default_gwp);

        let activity = ActivityInput {
            activity_value: self.activity_value,
            activity_unit: self.activity_unit,
            factor,
            gases: self.gases,
            gwp_version,
        };
        let total = record_total(&activity)?;

        Ok(CalculatedInput {
            activity_description: self.activity_description,
            activity_value: activity.activity_value,
            activity_unit: activity.activity_unit,
            factor_guid,
            factor: activity.factor,
            gases: activity.gases,
            gwp_version,
            scope,
            total_emissions_tco2e: total,
            uncertainty_percent: self.uncertainty_percent,
            reporting_year: self.reporting_year,
        })
    }
}

/// Stored emissions record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionRecord {
    pub guid: Uuid,
    pub activity_description: String,
    pub activity_value: f64,
    pub activity_unit: String,
    pub emission_factor_id: Option<Uuid>,
    pub emission_factor: EmissionFactor,
    pub gases: Vec<GasAmount>,
    pub gwp_version: GwpVersion,
    #[serde(flatten)]
    pub scope: ScopeSelection,
    pub total_emissions_tco2e: f64,
    pub uncertainty_percent: Option<f64>,
    pub reporting_year: i32,
    pub data_quality: Option<DataQuality>,
    pub data_quality_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Evidence document metadata registered against a record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceDocument {
    pub guid: Uuid,
    pub emission_guid: Uuid,
    pub filename: String,
    pub content_type: String,
    pub sha256: String,
    pub size_bytes: i64,
    pub storage_uri: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewEvidence {
    pub filename: String,
    pub content_type: String,
    pub sha256: String,
    pub size_bytes: i64,
    #[serde(default)]
    pub storage_uri: Option<String>,
}

impl NewEvidence {
    pub fn validate(&self) -> Result<()> {
        if self.filename.trim().is_empty() {
            return Err(Error::InvalidInput("filename is empty".to_string()));
        }
        if self.sha256.len() != 64 || !self.sha256.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidInput(
                "sha256 must be 64 hexadecimal characters".to_string(),
            ));
        }
        if self.size_bytes < 0 {
            return Err(Error::InvalidInput("size_bytes is negative".to_string()));
        }
        Ok(())
    }
}

/// Completed checkout reported by the payment provider
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutCompletion {
    /// Provider's checkout/session reference; unique per payment
    pub checkout_reference: String,
    pub amount_cents: i64,
    pub currency: String,
    #[serde(default = "default_max_uses")]
    pub max_uses: i64,
}

fn default_max_uses() -> i64 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payment {
    pub guid: Uuid,
    pub checkout_reference: String,
    pub amount_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoucherStatus {
    Active,
    Exhausted,
    Expired,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::Active => "ACTIVE",
            VoucherStatus::Exhausted => "EXHAUSTED",
            VoucherStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "ACTIVE" => Ok(VoucherStatus::Active),
            "EXHAUSTED" => Ok(VoucherStatus::Exhausted),
            "EXPIRED" => Ok(VoucherStatus::Expired),
            other => Err(Error::Internal(format!("Unknown voucher status: {}", other))),
        }
    }
}

/// Purchased access token; one use per generated report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Voucher {
    pub guid: Uuid,
    pub code: String,
    pub payment_guid: Uuid,
    pub max_uses: i64,
    pub uses: i64,
    pub status: VoucherStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Voucher {
    /// Status as of `now`, accounting for expiry not yet persisted
    pub fn effective_status(&self, now: DateTime<Utc>) -> VoucherStatus {
        match self.status {
            VoucherStatus::Active if self.expires_at <= now => VoucherStatus::Expired,
            status => status,
        }
    }

    /// Consume one use
    ///
    /// On an expired voucher the status is moved to `Expired` and an error is
    /// returned; the caller should persist the new status.
    pub fn redeem(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.effective_status(now) {
            VoucherStatus::Active => {
                self.uses += 1;
                if self.uses >= self.max_uses {
                    self.status = VoucherStatus::Exhausted;
                }
                Ok(())
            }
            VoucherStatus::Exhausted => Err(Error::Conflict(format!(
                "Voucher {} has no uses left",
                self.code
            ))),
            VoucherStatus::Expired => {
                self.status = VoucherStatus::Expired;
                Err(Error::Conflict(format!("Voucher {} has expired", self.code)))
            }
        }
    }
}

/// Stored iXBRL disclosure document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisclosureDocument {
    pub guid: Uuid,
    pub session_guid: Uuid,
    #[serde(skip_serializing)]
    pub content: String,
    pub sha256: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

/// Parse a TEXT guid column
pub(crate) fn parse_guid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("Invalid guid {}: {}", value, e)))
}

/// Parse an RFC 3339 TEXT timestamp column
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid timestamp {}: {}", value, e)))
}
