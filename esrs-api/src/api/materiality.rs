//! Stateless Scope 3 materiality check
//!
//! POST /materiality/assess

use std::collections::BTreeMap;

use axum::{extract::State, routing::post, Json, Router};
use esrs_calc::materiality::CategoryAssessment;
use esrs_calc::{CalcError, Scope3Category, Sector};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryEmissions {
    pub category: Scope3Category,
    pub emissions_tco2e: f64,
}

#[derive(Debug, Deserialize)]
pub struct AssessRequest {
    pub sector: Sector,
    /// Total inventory (tCO2e) the shares are taken of; defaults to the
    /// sum of the listed categories
    #[serde(default)]
    pub total_emissions_tco2e: Option<f64>,
    pub categories: Vec<CategoryEmissions>,
}

#[derive(Debug, Serialize)]
pub struct AssessResponse {
    pub sector: Sector,
    pub threshold: f64,
    pub total_emissions_tco2e: f64,
    pub assessments: Vec<CategoryAssessment>,
    pub material_categories: Vec<u8>,
}

/// POST /materiality/assess
///
/// Uses the service's configured policy; nothing is stored.
pub async fn assess(
    State(state): State<AppState>,
    Json(request): Json<AssessRequest>,
) -> ApiResult<Json<AssessResponse>> {
    let mut by_category: BTreeMap<Scope3Category, f64> = BTreeMap::new();
    for item in &request.categories {
        if !item.emissions_tco2e.is_finite() || item.emissions_tco2e < 0.0 {
            return Err(CalcError::InvalidActivityValue(item.emissions_tco2e).into());
        }
        *by_category.entry(item.category).or_insert(0.0) += item.emissions_tco2e;
    }

    let category_sum: f64 = by_category.values().sum();
    let total = request.total_emissions_tco2e.unwrap_or(category_sum);
    if !total.is_finite() || total < category_sum {
        return Err(ApiError::Unprocessable(format!(
            "total_emissions_tco2e {} is less than the sum of categories {}",
            total, category_sum
        )));
    }

    let policy = &state.config.materiality;
    let assessments = policy.assess_all(request.sector, &by_category, total);
    let material_categories = assessments
        .iter()
        .filter(|a| a.material)
        .map(|a| a.category.number())
        .collect();

    Ok(Json(AssessResponse {
        sector: request.sector,
        threshold: policy.threshold_for(request.sector),
        total_emissions_tco2e: total,
        assessments,
        material_categories,
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/materiality/assess", post(assess))
}
