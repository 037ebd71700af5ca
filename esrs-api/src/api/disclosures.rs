//! Disclosure documents
//!
//! GET /disclosures/:id returns a stored report; POST /disclosures/preview
//! exports posted wizard data without storing anything or using a voucher.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use esrs_calc::ixbrl::export_disclosure;
use esrs_common::db::TenantScope;
use esrs_common::wizard::{CompanyProfile, WizardActivity, WizardSession};
use serde::Deserialize;
use uuid::Uuid;

use super::wizard::export_options;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const XHTML_CONTENT_TYPE: &str = "application/xhtml+xml";

/// Header carrying the hex SHA-256 of the returned document
pub const CONTENT_SHA256_HEADER: &str = "x-content-sha256";

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub profile: CompanyProfile,
    pub activities: Vec<WizardActivity>,
}

fn xhtml_response(content: String, sha256: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, XHTML_CONTENT_TYPE.to_string()),
            (header::HeaderName::from_static(CONTENT_SHA256_HEADER), sha256.to_string()),
        ],
        content,
    )
        .into_response()
}

/// GET /disclosures/:id
pub async fn get_disclosure(
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let document = scope
        .get_disclosure(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Disclosure {}", id)))?;
    Ok(xhtml_response(document.content, &document.sha256))
}

/// POST /disclosures/preview
pub async fn preview(
    State(state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> ApiResult<Response> {
    let mut session = WizardSession::new();
    session.save_profile(request.profile)?;
    session.save_activities(request.activities)?;
    let (validation, transition) =
        session.submit(state.config.default_gwp_version, &state.config.materiality)?;
    if transition.is_none() {
        return Err(ApiError::Validation(validation));
    }

    let input = session.disclosure_input()?;
    let document = export_disclosure(&input, &export_options(&state))?;
    Ok(xhtml_response(document.content, &document.sha256))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/disclosures/preview", post(preview))
        .route("/disclosures/:id", get(get_disclosure))
}
