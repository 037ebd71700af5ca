//! Emission factor library
//!
//! GET/POST /emission-factors, GET /emission-factors/:id

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use esrs_common::db::{FactorQuery, FactorRecord, NewFactor, TenantScope};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FactorSearch {
    /// Substring of name, category or source
    pub q: Option<String>,
    /// Activity unit the factor must apply to, e.g. `kWh`
    pub unit: Option<String>,
}

/// GET /emission-factors
pub async fn list_factors(
    Extension(scope): Extension<TenantScope>,
    Query(search): Query<FactorSearch>,
) -> ApiResult<Json<Vec<FactorRecord>>> {
    let query = FactorQuery {
        text: search.q.filter(|q| !q.trim().is_empty()),
        activity_unit: search.unit.filter(|u| !u.trim().is_empty()),
    };
    Ok(Json(scope.list_factors(&query).await?))
}

/// POST /emission-factors
///
/// Factors created here are private to the calling tenant.
pub async fn create_factor(
    Extension(scope): Extension<TenantScope>,
    Json(factor): Json<NewFactor>,
) -> ApiResult<(StatusCode, Json<FactorRecord>)> {
    let record = scope.create_factor(factor).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /emission-factors/:id
pub async fn get_factor(
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FactorRecord>> {
    scope
        .get_factor(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Emission factor {}", id)))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/emission-factors", get(list_factors).post(create_factor))
        .route("/emission-factors/:id", get(get_factor))
}
