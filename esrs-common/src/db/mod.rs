//! Database initialization, models and tenant-scoped repositories

pub mod emissions;
pub mod factors;
pub mod init;
pub mod migrations;
pub mod models;
pub mod scope;
pub mod sessions;
pub mod tenants;
pub mod vouchers;

pub use emissions::StoredInventory;
pub use factors::FactorQuery;
pub use init::{init_database, init_memory_database};
pub use models::*;
pub use scope::TenantScope;
pub use tenants::{create_tenant, find_tenant_by_api_key, hash_api_key};
