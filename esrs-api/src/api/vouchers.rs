//! Payments and vouchers
//!
//! The payment provider's checkout is not integrated; a completed checkout is
//! reported to POST /vouchers/checkout/complete, which issues the voucher.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use esrs_common::db::{CheckoutCompletion, Payment, TenantScope, Voucher};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub payment: Payment,
    pub voucher: Voucher,
}

/// POST /vouchers/checkout/complete
///
/// Idempotent per checkout reference.
pub async fn complete_checkout(
    State(state): State<AppState>,
    Extension(scope): Extension<TenantScope>,
    Json(checkout): Json<CheckoutCompletion>,
) -> ApiResult<(StatusCode, Json<CheckoutResponse>)> {
    let (payment, voucher) = scope
        .complete_checkout(checkout, state.config.voucher_validity_days)
        .await?;
    Ok((StatusCode::CREATED, Json(CheckoutResponse { payment, voucher })))
}

/// GET /vouchers/:code
pub async fn get_voucher(
    Extension(scope): Extension<TenantScope>,
    Path(code): Path<String>,
) -> ApiResult<Json<Voucher>> {
    scope
        .get_voucher(&code)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Voucher {}", code)))
}

/// POST /vouchers/:code/redeem
pub async fn redeem_voucher(
    Extension(scope): Extension<TenantScope>,
    Path(code): Path<String>,
) -> ApiResult<Json<Voucher>> {
    Ok(Json(scope.redeem_voucher(&code).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/vouchers/checkout/complete", post(complete_checkout))
        .route("/vouchers/:code", get(get_voucher))
        .route("/vouchers/:code/redeem", post(redeem_voucher))
}
