//! Wizard session persistence and disclosure documents

use chrono::Utc;
use esrs_calc::ixbrl::ExportedDocument;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use super::models::{parse_guid, parse_timestamp, DisclosureDocument, Voucher};
use super::scope::TenantScope;
use crate::wizard::{WizardSession, WizardState};
use crate::{Error, Result};

const SESSION_COLUMNS: &str = "guid, state, profile, activities, calculated, validation, \
                               voucher_code, disclosure_guid, created_at, updated_at";

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize {}: {}", what, e)))
}

fn from_json<T: DeserializeOwned>(value: &str, what: &str) -> Result<T> {
    serde_json::from_str(value)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", what, e)))
}

fn optional_json<T: DeserializeOwned>(value: Option<String>, what: &str) -> Result<Option<T>> {
    value.as_deref().map(|v| from_json(v, what)).transpose()
}

fn session_from_row(row: &SqliteRow) -> Result<WizardSession> {
    let activities: String = row.get("activities");
    let disclosure_guid: Option<String> = row.get("disclosure_guid");
    Ok(WizardSession {
        guid: parse_guid(row.get("guid"))?,
        state: WizardState::parse(row.get("state"))?,
        profile: optional_json(row.get("profile"), "profile")?,
        activities: from_json(&activities, "activities")?,
        calculated: optional_json(row.get("calculated"), "calculated emissions")?,
        validation: optional_json(row.get("validation"), "validation report")?,
        voucher_code: row.get("voucher_code"),
        disclosure_guid: disclosure_guid.as_deref().map(parse_guid).transpose()?,
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

fn disclosure_from_row(row: &SqliteRow) -> Result<DisclosureDocument> {
    Ok(DisclosureDocument {
        guid: parse_guid(row.get("guid"))?,
        session_guid: parse_guid(row.get("session_guid"))?,
        content: row.get("content"),
        sha256: row.get("sha256"),
        size_bytes: row.get("size_bytes"),
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

/// Serialized session columns, prepared before touching the database
struct SessionColumns {
    state: &'static str,
    profile: Option<String>,
    activities: String,
    calculated: Option<String>,
    validation: Option<String>,
    disclosure_guid: Option<String>,
    updated_at: String,
}

impl SessionColumns {
    fn of(session: &WizardSession) -> Result<Self> {
        Ok(Self {
            state: session.state.as_str(),
            profile: session
                .profile
                .as_ref()
                .map(|p| to_json(p, "profile"))
                .transpose()?,
            activities: to_json(&session.activities, "activities")?,
            calculated: session
                .calculated
                .as_ref()
                .map(|c| to_json(c, "calculated emissions"))
                .transpose()?,
            validation: session
                .validation
                .as_ref()
                .map(|v| to_json(v, "validation report"))
                .transpose()?,
            disclosure_guid: session.disclosure_guid.map(|g| g.to_string()),
            updated_at: session.updated_at.to_rfc3339(),
        })
    }
}

impl TenantScope {
    pub async fn create_session(&self) -> Result<WizardSession> {
        let session = WizardSession::new();
        let columns = SessionColumns::of(&session)?;
        sqlx::query(
            r#"
            INSERT INTO wizard_sessions (guid, tenant_guid, state, activities, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.guid.to_string())
        .bind(self.key())
        .bind(columns.state)
        .bind(&columns.activities)
        .bind(session.created_at.to_rfc3339())
        .bind(&columns.updated_at)
        .execute(self.pool())
        .await?;
        Ok(session)
    }

    pub async fn get_session(&self, guid: Uuid) -> Result<Option<WizardSession>> {
        let sql = format!(
            "SELECT {} FROM wizard_sessions WHERE guid = ? AND tenant_guid = ?",
            SESSION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(guid.to_string())
            .bind(self.key())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    /// Persist step data and state of an editable or just-submitted session
    ///
    /// `loaded_state` is the state the session had when it was read. The
    /// write only lands if the stored row is still in that state, so a stale
    /// copy cannot roll back a submission made in the meantime. Sessions that
    /// already produced a report are never rewritten.
    pub async fn save_session(
        &self,
        session: &WizardSession,
        loaded_state: WizardState,
    ) -> Result<()> {
        let columns = SessionColumns::of(session)?;
        let result = sqlx::query(
            r#"
            UPDATE wizard_sessions SET
                state = ?, profile = ?, activities = ?, calculated = ?, validation = ?, updated_at = ?
            WHERE guid = ? AND tenant_guid = ? AND state = ? AND state != 'REPORT_GENERATED'
            "#,
        )
        .bind(columns.state)
        .bind(&columns.profile)
        .bind(&columns.activities)
        .bind(&columns.calculated)
        .bind(&columns.validation)
        .bind(&columns.updated_at)
        .bind(session.guid.to_string())
        .bind(self.key())
        .bind(loaded_state.as_str())
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_session(session.guid).await? {
                Some(stored) if stored.state == WizardState::ReportGenerated => {
                    Err(Error::Conflict(format!(
                        "Session {} is {} and can no longer be changed",
                        stored.guid,
                        stored.state.as_str()
                    )))
                }
                Some(stored) => {
                    warn!(
                        session = %stored.guid,
                        expected = loaded_state.as_str(),
                        found = stored.state.as_str(),
                        "Rejected stale wizard session write"
                    );
                    Err(Error::Conflict(format!(
                        "Session {} moved from {} to {} since it was loaded",
                        stored.guid,
                        loaded_state.as_str(),
                        stored.state.as_str()
                    )))
                }
                None => Err(Error::NotFound(format!("Wizard session {}", session.guid))),
            };
        }
        Ok(())
    }

    /// Redeem the voucher, store the document and close the session
    ///
    /// All three happen in one transaction; on any failure nothing changes
    /// (apart from recording an expired voucher as EXPIRED).
    pub async fn finalize_report(
        &self,
        session: &mut WizardSession,
        voucher_code: &str,
        document: &ExportedDocument,
    ) -> Result<(DisclosureDocument, Voucher)> {
        session.require_submitted()?;

        let mut tx = self.pool().begin().await?;
        match self
            .finalize_in(&mut tx, session, voucher_code, document)
            .await
        {
            Ok((updated, disclosure, voucher)) => {
                tx.commit().await?;
                info!(
                    session = %updated.guid,
                    disclosure = %disclosure.guid,
                    sha256 = %disclosure.sha256,
                    "Disclosure report generated"
                );
                *session = updated;
                Ok((disclosure, voucher))
            }
            Err(e) => {
                tx.rollback().await?;
                self.persist_expiry(voucher_code).await?;
                Err(e)
            }
        }
    }

    async fn finalize_in(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        session: &WizardSession,
        voucher_code: &str,
        document: &ExportedDocument,
    ) -> Result<(WizardSession, DisclosureDocument, Voucher)> {
        let voucher = self.redeem_in(tx, voucher_code, Utc::now()).await?;

        let disclosure = DisclosureDocument {
            guid: Uuid::new_v4(),
            session_guid: session.guid,
            content: document.content.clone(),
            sha256: document.sha256.clone(),
            size_bytes: document.content.len() as i64,
            created_at: Utc::now(),
        };
        sqlx::query(
            r#"
            INSERT INTO disclosure_documents (guid, tenant_guid, session_guid, content, sha256, size_bytes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(disclosure.guid.to_string())
        .bind(self.key())
        .bind(session.guid.to_string())
        .bind(&disclosure.content)
        .bind(&disclosure.sha256)
        .bind(disclosure.size_bytes)
        .bind(disclosure.created_at.to_rfc3339())
        .execute(&mut **tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict(format!(
                "A disclosure already exists for session {}",
                session.guid
            )),
            other => Error::Database(other),
        })?;

        let mut updated = session.clone();
        updated.mark_report_generated(voucher.code.clone(), disclosure.guid)?;
        let result = sqlx::query(
            r#"
            UPDATE wizard_sessions SET
                state = ?, voucher_code = ?, disclosure_guid = ?, updated_at = ?
            WHERE guid = ? AND tenant_guid = ? AND state = 'SUBMITTED'
            "#,
        )
        .bind(updated.state.as_str())
        .bind(&updated.voucher_code)
        .bind(disclosure.guid.to_string())
        .bind(updated.updated_at.to_rfc3339())
        .bind(session.guid.to_string())
        .bind(self.key())
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "Session {} is no longer awaiting a report",
                session.guid
            )));
        }

        Ok((updated, disclosure, voucher))
    }

    pub async fn get_disclosure(&self, guid: Uuid) -> Result<Option<DisclosureDocument>> {
        let row = sqlx::query(
            r#"
            SELECT guid, session_guid, content, sha256, size_bytes, created_at
            FROM disclosure_documents
            WHERE guid = ? AND tenant_guid = ?
            "#,
        )
        .bind(guid.to_string())
        .bind(self.key())
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(disclosure_from_row).transpose()
    }
}
