//! Tenant resolution middleware
//!
//! Accepts the API key as `Authorization: Bearer <key>` or `X-Api-Key`.
//! The key's SHA-256 is looked up in the tenant table and the resulting
//! [`TenantScope`] is placed in the request extensions for handlers.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use esrs_common::db::{find_tenant_by_api_key, TenantScope};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// API key from the request headers, if one was sent
fn api_key(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    bearer
        .or_else(|| {
            headers
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
        })
        .filter(|key| !key.is_empty())
}

pub async fn tenant_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = api_key(request.headers())
        .map(str::to_string)
        .ok_or_else(|| ApiError::Unauthorized("API key required".to_string()))?;

    let tenant = match find_tenant_by_api_key(&state.db, &key).await? {
        Some(tenant) => tenant,
        None => {
            warn!("Rejected request with unknown API key");
            return Err(ApiError::Unauthorized("Unknown API key".to_string()));
        }
    };
    debug!(tenant = %tenant.guid, "Resolved tenant");

    request
        .extensions_mut()
        .insert(TenantScope::for_tenant(state.db.clone(), &tenant));
    request.extensions_mut().insert(tenant);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_preferred_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer esrs_a"));
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("esrs_b"));
        assert_eq!(api_key(&headers), Some("esrs_a"));
    }

    #[test]
    fn test_x_api_key_header() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("esrs_b"));
        assert_eq!(api_key(&headers), Some("esrs_b"));
    }

    #[test]
    fn test_missing_or_other_scheme() {
        let mut headers = HeaderMap::new();
        assert_eq!(api_key(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(api_key(&headers), None);
    }
}
