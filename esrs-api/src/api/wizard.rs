//! Compliance wizard
//!
//! A session collects the company profile and activity data, is submitted
//! for validation and calculation, and finally produces one iXBRL report in
//! exchange for a voucher use.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use esrs_calc::ixbrl::{export_disclosure, ExportOptions};
use esrs_calc::ValidationReport;
use esrs_common::db::{DisclosureDocument, TenantScope, Voucher};
use esrs_common::wizard::{CompanyProfile, StateTransition, WizardActivity, WizardSession};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SessionStep {
    pub session: WizardSession,
    pub transition: StateTransition,
}

#[derive(Debug, Deserialize)]
pub struct ActivitiesRequest {
    pub activities: Vec<WizardActivity>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub session: WizardSession,
    pub validation: ValidationReport,
    pub transition: StateTransition,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub voucher_code: String,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub session: WizardSession,
    pub disclosure: DisclosureDocument,
    pub voucher: Voucher,
}

pub(crate) fn export_options(state: &AppState) -> ExportOptions {
    ExportOptions {
        entry_point: state.config.taxonomy_entry_point.clone(),
    }
}

async fn load_session(scope: &TenantScope, id: Uuid) -> ApiResult<WizardSession> {
    scope
        .get_session(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Wizard session {}", id)))
}

/// POST /wizard/sessions
pub async fn create_session(
    Extension(scope): Extension<TenantScope>,
) -> ApiResult<(StatusCode, Json<WizardSession>)> {
    let session = scope.create_session().await?;
    info!(tenant = %scope.tenant_guid(), session = %session.guid, "Wizard session created");
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /wizard/sessions/:id
pub async fn get_session(
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WizardSession>> {
    Ok(Json(load_session(&scope, id).await?))
}

/// PUT /wizard/sessions/:id/profile
pub async fn save_profile(
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
    Json(profile): Json<CompanyProfile>,
) -> ApiResult<Json<SessionStep>> {
    let mut session = load_session(&scope, id).await?;
    let transition = session.save_profile(profile)?;
    scope.save_session(&session, transition.old_state).await?;
    Ok(Json(SessionStep {
        session,
        transition,
    }))
}

/// PUT /wizard/sessions/:id/activities
pub async fn save_activities(
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActivitiesRequest>,
) -> ApiResult<Json<SessionStep>> {
    let mut session = load_session(&scope, id).await?;
    let transition = session.save_activities(request.activities)?;
    scope.save_session(&session, transition.old_state).await?;
    Ok(Json(SessionStep {
        session,
        transition,
    }))
}

/// POST /wizard/sessions/:id/submit
///
/// An invalid session stays editable; its validation report is stored and
/// returned with 422.
pub async fn submit(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SubmitResponse>> {
    let mut session = load_session(&scope, id).await?;
    let loaded_state = session.state;
    let (validation, transition) =
        session.submit(state.config.default_gwp_version, &state.config.materiality)?;
    scope.save_session(&session, loaded_state).await?;

    match transition {
        Some(transition) => {
            info!(
                tenant = %scope.tenant_guid(),
                session = %session.guid,
                warnings = validation.warnings.len(),
                "Wizard session submitted"
            );
            Ok(Json(SubmitResponse {
                session,
                validation,
                transition,
            }))
        }
        None => Err(ApiError::Validation(validation)),
    }
}

/// POST /wizard/sessions/:id/report
///
/// The document is exported and checked before the voucher is touched;
/// redemption, storage and the state change then commit together.
pub async fn generate_report(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReportRequest>,
) -> ApiResult<(StatusCode, Json<ReportResponse>)> {
    let code = request.voucher_code.trim();
    if code.is_empty() {
        return Err(ApiError::BadRequest("voucher_code is required".to_string()));
    }

    let mut session = load_session(&scope, id).await?;
    session.require_submitted()?;

    let input = session.disclosure_input()?;
    let document = export_disclosure(&input, &export_options(&state))?;
    let (disclosure, voucher) = scope.finalize_report(&mut session, code, &document).await?;

    Ok((
        StatusCode::CREATED,
        Json(ReportResponse {
            session,
            disclosure,
            voucher,
        }),
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wizard/sessions", post(create_session))
        .route("/wizard/sessions/:id", get(get_session))
        .route("/wizard/sessions/:id/profile", put(save_profile))
        .route("/wizard/sessions/:id/activities", put(save_activities))
        .route("/wizard/sessions/:id/submit", post(submit))
        .route("/wizard/sessions/:id/report", post(generate_report))
}
