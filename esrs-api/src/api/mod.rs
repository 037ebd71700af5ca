//! HTTP API handlers for esrs-api

pub mod auth;
pub mod disclosures;
pub mod emissions;
pub mod factors;
pub mod health;
pub mod materiality;
pub mod vouchers;
pub mod wizard;

pub use auth::tenant_middleware;
pub use health::health_routes;
