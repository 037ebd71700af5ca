//! Tenant registry and API key resolution
//!
//! Only the SHA-256 of an API key is stored. A key is shown once, when the
//! tenant is created.

use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::models::{parse_guid, parse_timestamp, Tenant};
use crate::{Error, Result};

const API_KEY_PREFIX: &str = "esrs_";

/// Hex SHA-256 of an API key
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}{}", API_KEY_PREFIX, hex)
}

/// Create a tenant, returning it with its plaintext API key
pub async fn create_tenant(pool: &SqlitePool, name: &str) -> Result<(Tenant, String)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Tenant name is empty".to_string()));
    }

    let tenant = Tenant {
        guid: Uuid::new_v4(),
        name: name.to_string(),
        created_at: Utc::now(),
    };
    let api_key = generate_api_key();

    sqlx::query("INSERT INTO tenants (guid, name, api_key_hash, created_at) VALUES (?, ?, ?, ?)")
        .bind(tenant.guid.to_string())
        .bind(&tenant.name)
        .bind(hash_api_key(&api_key))
        .bind(tenant.created_at.to_rfc3339())
        .execute(pool)
        .await?;

    Ok((tenant, api_key))
}

/// Resolve the tenant owning an API key
pub async fn find_tenant_by_api_key(pool: &SqlitePool, api_key: &str) -> Result<Option<Tenant>> {
    let row = sqlx::query("SELECT guid, name, created_at FROM tenants WHERE api_key_hash = ?")
        .bind(hash_api_key(api_key))
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(Tenant {
            guid: parse_guid(row.get("guid"))?,
            name: row.get("name"),
            created_at: parse_timestamp(row.get("created_at"))?,
        })),
        None => Ok(None),
    }
}
