//! Payments and vouchers
//!
//! A completed checkout creates a payment and its voucher in one
//! transaction. Redemption is guarded by the stored use count so two
//! concurrent redemptions cannot both consume the last use.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use super::models::{
    parse_guid, parse_timestamp, CheckoutCompletion, Payment, Voucher, VoucherStatus,
};
use super::scope::TenantScope;
use crate::{Error, Result};

/// Unambiguous characters only (no 0/O, 1/I)
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let groups: Vec<String> = (0..3)
        .map(|_| {
            (0..4)
                .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
                .collect()
        })
        .collect();
    format!("ESRS-{}", groups.join("-"))
}

fn voucher_from_row(row: &SqliteRow) -> Result<Voucher> {
    Ok(Voucher {
        guid: parse_guid(row.get("guid"))?,
        code: row.get("code"),
        payment_guid: parse_guid(row.get("payment_guid"))?,
        max_uses: row.get("max_uses"),
        uses: row.get("uses"),
        status: VoucherStatus::parse(row.get("status"))?,
        expires_at: parse_timestamp(row.get("expires_at"))?,
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

const VOUCHER_COLUMNS: &str =
    "guid, code, payment_guid, max_uses, uses, status, expires_at, created_at";

impl TenantScope {
    /// Record a completed checkout and issue its voucher
    ///
    /// Repeating a completion for the same checkout returns the voucher
    /// issued the first time.
    pub async fn complete_checkout(
        &self,
        checkout: CheckoutCompletion,
        validity_days: i64,
    ) -> Result<(Payment, Voucher)> {
        let reference = checkout.checkout_reference.trim().to_string();
        if reference.is_empty() {
            return Err(Error::InvalidInput("checkout_reference is empty".to_string()));
        }
        if checkout.amount_cents < 0 {
            return Err(Error::InvalidInput("amount_cents is negative".to_string()));
        }
        if checkout.max_uses < 1 {
            return Err(Error::InvalidInput("max_uses must be at least 1".to_string()));
        }
        if checkout.currency.len() != 3 || !checkout.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(Error::InvalidInput(format!(
                "currency must be an ISO 4217 code, got '{}'",
                checkout.currency
            )));
        }

        let mut tx = self.pool().begin().await?;

        let existing = sqlx::query(
            "SELECT guid, tenant_guid, amount_cents, currency, created_at FROM payments WHERE checkout_reference = ?",
        )
        .bind(&reference)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = existing {
            let owner: String = row.get("tenant_guid");
            if owner != self.key() {
                return Err(Error::Conflict(format!(
                    "Checkout {} was already recorded",
                    reference
                )));
            }
            let payment = Payment {
                guid: parse_guid(row.get("guid"))?,
                checkout_reference: reference,
                amount_cents: row.get("amount_cents"),
                currency: row.get("currency"),
                created_at: parse_timestamp(row.get("created_at"))?,
            };
            let sql = format!(
                "SELECT {} FROM vouchers WHERE payment_guid = ? AND tenant_guid = ?",
                VOUCHER_COLUMNS
            );
            let row = sqlx::query(&sql)
                .bind(payment.guid.to_string())
                .bind(self.key())
                .fetch_one(&mut *tx)
                .await?;
            let voucher = voucher_from_row(&row)?;
            tx.commit().await?;
            return Ok((payment, voucher));
        }

        let now = Utc::now();
        let payment = Payment {
            guid: Uuid::new_v4(),
            checkout_reference: reference,
            amount_cents: checkout.amount_cents,
            currency: checkout.currency,
            created_at: now,
        };
        sqlx::query(
            r#"
            INSERT INTO payments (guid, tenant_guid, checkout_reference, amount_cents, currency, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.guid.to_string())
        .bind(self.key())
        .bind(&payment.checkout_reference)
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let voucher = Voucher {
            guid: Uuid::new_v4(),
            code: generate_code(),
            payment_guid: payment.guid,
            max_uses: checkout.max_uses,
            uses: 0,
            status: VoucherStatus::Active,
            expires_at: now + Duration::days(validity_days),
            created_at: now,
        };
        sqlx::query(
            r#"
            INSERT INTO vouchers (guid, tenant_guid, payment_guid, code, max_uses, uses, status, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(voucher.guid.to_string())
        .bind(self.key())
        .bind(voucher.payment_guid.to_string())
        .bind(&voucher.code)
        .bind(voucher.max_uses)
        .bind(voucher.uses)
        .bind(voucher.status.as_str())
        .bind(voucher.expires_at.to_rfc3339())
        .bind(voucher.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            payment = %payment.guid,
            voucher = %voucher.guid,
            "Checkout completed, voucher issued"
        );
        Ok((payment, voucher))
    }

    /// Voucher with its status as of now
    pub async fn get_voucher(&self, code: &str) -> Result<Option<Voucher>> {
        let sql = format!(
            "SELECT {} FROM vouchers WHERE code = ? AND tenant_guid = ?",
            VOUCHER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(code)
            .bind(self.key())
            .fetch_optional(self.pool())
            .await?;
        let mut voucher = match row {
            Some(row) => voucher_from_row(&row)?,
            None => return Ok(None),
        };
        voucher.status = voucher.effective_status(Utc::now());
        Ok(Some(voucher))
    }

    /// Redeem one use of a voucher on its own
    pub async fn redeem_voucher(&self, code: &str) -> Result<Voucher> {
        let mut tx = self.pool().begin().await?;
        let outcome = self.redeem_in(&mut tx, code, Utc::now()).await;
        match outcome {
            Ok(voucher) => {
                tx.commit().await?;
                Ok(voucher)
            }
            Err(e) => {
                tx.rollback().await?;
                self.persist_expiry(code).await?;
                Err(e)
            }
        }
    }

    /// Redeem inside a caller's transaction
    pub(crate) async fn redeem_in(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Voucher> {
        let sql = format!(
            "SELECT {} FROM vouchers WHERE code = ? AND tenant_guid = ?",
            VOUCHER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(code)
            .bind(self.key())
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Voucher {}", code)))?;
        let mut voucher = voucher_from_row(&row)?;
        let previous_uses = voucher.uses;
        voucher.redeem(now)?;

        let result = sqlx::query(
            "UPDATE vouchers SET uses = ?, status = ? WHERE guid = ? AND tenant_guid = ? AND uses = ?",
        )
        .bind(voucher.uses)
        .bind(voucher.status.as_str())
        .bind(voucher.guid.to_string())
        .bind(self.key())
        .bind(previous_uses)
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "Voucher {} was redeemed concurrently",
                code
            )));
        }

        info!(voucher = %voucher.guid, uses = voucher.uses, status = voucher.status.as_str(), "Voucher redeemed");
        Ok(voucher)
    }

    /// Store EXPIRED for an active voucher past its expiry
    pub(crate) async fn persist_expiry(&self, code: &str) -> Result<()> {
        let sql = format!(
            "SELECT {} FROM vouchers WHERE code = ? AND tenant_guid = ?",
            VOUCHER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(code)
            .bind(self.key())
            .fetch_optional(self.pool())
            .await?;
        let voucher = match row {
            Some(row) => voucher_from_row(&row)?,
            None => return Ok(()),
        };
        if voucher.status == VoucherStatus::Active
            && voucher.effective_status(Utc::now()) == VoucherStatus::Expired
        {
            sqlx::query("UPDATE vouchers SET status = 'EXPIRED' WHERE guid = ? AND tenant_guid = ?")
                .bind(voucher.guid.to_string())
                .bind(self.key())
                .execute(self.pool())
                .await?;
            warn!(voucher = %voucher.guid, "Voucher marked expired");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_format() {
        let code = generate_code();
        assert_eq!(code.len(), "ESRS-XXXX-XXXX-XXXX".len());
        assert!(code.starts_with("ESRS-"));
        assert!(code[5..]
            .chars()
            .all(|c| c == '-' || CODE_CHARSET.contains(&(c as u8))));
    }
}
