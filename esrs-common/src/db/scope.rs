//! Tenant-scoped data access
//!
//! Every query against a tenant-owned table goes through a [`TenantScope`],
//! which binds the tenant id into the SQL itself. Records of other tenants
//! are therefore indistinguishable from absent ones.

use sqlx::SqlitePool;
use uuid::Uuid;

use super::models::Tenant;

#[derive(Debug, Clone)]
pub struct TenantScope {
    pool: SqlitePool,
    tenant_guid: Uuid,
    tenant_key: String,
}

impl TenantScope {
    pub fn new(pool: SqlitePool, tenant_guid: Uuid) -> Self {
        Self {
            pool,
            tenant_guid,
            tenant_key: tenant_guid.to_string(),
        }
    }

    pub fn for_tenant(pool: SqlitePool, tenant: &Tenant) -> Self {
        Self::new(pool, tenant.guid)
    }

    pub fn tenant_guid(&self) -> Uuid {
        self.tenant_guid
    }

    /// Tenant id as bound into queries
    pub(crate) fn key(&self) -> &str {
        &self.tenant_key
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
