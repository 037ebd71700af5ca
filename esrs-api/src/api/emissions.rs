//! Emissions records, data quality and evidence
//!
//! POST/GET /emissions, GET/PUT/DELETE /emissions/:id,
//! GET /emissions/summary, POST /emissions/:id/data-quality,
//! POST/GET /emissions/:id/evidence

use std::collections::BTreeSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use esrs_calc::{CalculatedEmissions, DataQuality, EmissionFactor, GwpVersion, Sector};
use esrs_common::db::{
    CalculatedInput, EmissionInput, EmissionRecord, EvidenceDocument, NewEvidence, TenantScope,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageQuery, Pagination};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub reporting_year: Option<i32>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EmissionList {
    pub items: Vec<EmissionRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub reporting_year: Option<i32>,
    /// Sector whose materiality threshold applies; `other` when absent
    pub sector: Option<Sector>,
    pub net_revenue: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub reporting_year: Option<i32>,
    pub record_count: usize,
    /// Versions the summed records were calculated with
    pub gwp_versions: BTreeSet<GwpVersion>,
    #[serde(flatten)]
    pub emissions: CalculatedEmissions,
}

#[derive(Debug, Serialize)]
pub struct DataQualityResponse {
    pub emission_id: Uuid,
    pub data_quality: DataQuality,
    pub score: f64,
}

/// Resolve the factor (inline wins over a library reference) and calculate
async fn calculate_input(
    scope: &TenantScope,
    state: &AppState,
    input: EmissionInput,
) -> ApiResult<CalculatedInput> {
    let (factor_guid, factor): (Option<Uuid>, EmissionFactor) =
        match (&input.emission_factor, input.emission_factor_id) {
            (Some(inline), _) => (None, inline.clone()),
            (None, Some(id)) => {
                let record = scope.get_factor(id).await?.ok_or_else(|| {
                    ApiError::Unprocessable(format!("Unknown emission factor {}", id))
                })?;
                (Some(record.guid), record.factor)
            }
            (None, None) => {
                return Err(ApiError::Unprocessable(
                    "emission_factor or emission_factor_id is required".to_string(),
                ))
            }
        };

    Ok(input.calculate(factor_guid, factor, state.config.default_gwp_version)?)
}

/// POST /emissions
pub async fn create_emission(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Json(input): Json<EmissionInput>,
) -> ApiResult<(StatusCode, Json<EmissionRecord>)> {
    let calculated = calculate_input(&scope, &state, input).await?;
    let record = scope.create_emission(calculated).await?;
    info!(
        tenant = %scope.tenant_guid(),
        emission = %record.guid,
        tco2e = record.total_emissions_tco2e,
        "Emission recorded"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /emissions
pub async fn list_emissions(
    Extension(scope): Extension<TenantScope>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<EmissionList>> {
    let total = scope.count_emissions(query.reporting_year).await?;
    let pagination = PageQuery {
        page: query.page,
        page_size: query.page_size,
    }
    .resolve(total);
    let items = scope
        .list_emissions(query.reporting_year, pagination.page_size, pagination.offset)
        .await?;
    Ok(Json(EmissionList { items, pagination }))
}

/// GET /emissions/:id
pub async fn get_emission(
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EmissionRecord>> {
    scope
        .get_emission(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Emission {}", id)))
}

/// PUT /emissions/:id
///
/// Replaces the record's activity data and recalculates its total.
pub async fn update_emission(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
    Json(input): Json<EmissionInput>,
) -> ApiResult<Json<EmissionRecord>> {
    if scope.get_emission(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Emission {}", id)));
    }
    let calculated = calculate_input(&scope, &state, input).await?;
    Ok(Json(scope.update_emission(id, calculated).await?))
}

/// DELETE /emissions/:id
pub async fn delete_emission(
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    scope.delete_emission(id).await?;
    info!(tenant = %scope.tenant_guid(), emission = %id, "Emission deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /emissions/summary
pub async fn summary(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<SummaryResponse>> {
    let inventory = scope.inventory(query.reporting_year).await?;
    let mut versions = inventory.gwp_versions.iter().copied();
    let gwp_version = match (versions.next(), versions.next()) {
        (Some(only), None) => only,
        (Some(_), Some(_)) => {
            warn!(
                tenant = %scope.tenant_guid(),
                versions = ?inventory.gwp_versions,
                "Summary mixes records calculated with different GWP versions"
            );
            state.config.default_gwp_version
        }
        (None, _) => state.config.default_gwp_version,
    };
    let emissions = CalculatedEmissions::aggregate(
        &inventory.entries,
        gwp_version,
        query.sector.unwrap_or(Sector::Other),
        &state.config.materiality,
        query.net_revenue,
    )?;
    Ok(Json(SummaryResponse {
        reporting_year: query.reporting_year,
        record_count: inventory.entries.len(),
        gwp_versions: inventory.gwp_versions,
        emissions,
    }))
}

/// POST /emissions/:id/data-quality
pub async fn set_data_quality(
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
    Json(quality): Json<DataQuality>,
) -> ApiResult<Json<DataQualityResponse>> {
    let score = scope.set_data_quality(id, &quality).await?;
    Ok(Json(DataQualityResponse {
        emission_id: id,
        data_quality: quality,
        score,
    }))
}

/// POST /emissions/:id/evidence
pub async fn add_evidence(
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
    Json(evidence): Json<NewEvidence>,
) -> ApiResult<(StatusCode, Json<EvidenceDocument>)> {
    let document = scope.add_evidence(id, evidence).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /emissions/:id/evidence
pub async fn list_evidence(
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<EvidenceDocument>>> {
    Ok(Json(scope.list_evidence(id).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/emissions", post(create_emission).get(list_emissions))
        .route("/emissions/summary", get(summary))
        .route(
            "/emissions/:id",
            get(get_emission).put(update_emission).delete(delete_emission),
        )
        .route("/emissions/:id/data-quality", post(set_data_quality))
        .route("/emissions/:id/evidence", post(add_evidence).get(list_evidence))
}
