//! esrs-api library - ESRS emissions and disclosure HTTP service
//!
//! Tenants record activity data, run the compliance wizard and download
//! iXBRL disclosures. Every `/api/v1` route runs inside a tenant resolved
//! from its API key.

use std::sync::Arc;

use axum::Router;
use esrs_common::config::ServiceConfig;
use sqlx::SqlitePool;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cli;
pub mod error;
pub mod pagination;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: ServiceConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

/// Build application router
///
/// `/health` is public; everything under `/api/v1` requires a tenant key.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let protected = Router::new()
        .merge(api::emissions::routes())
        .merge(api::factors::routes())
        .merge(api::vouchers::routes())
        .merge(api::wizard::routes())
        .merge(api::disclosures::routes())
        .merge(api::materiality::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::tenant_middleware,
        ));

    Router::new()
        .nest("/api/v1", protected)
        .merge(api::health::health_routes())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
