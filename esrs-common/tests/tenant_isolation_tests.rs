//! Tenant scoping of every stored resource
//!
//! Each test creates two tenants on one database and checks that records of
//! one are invisible to (and unmodifiable by) the other.

use chrono::{Duration, Utc};
use esrs_calc::{DataQuality, EmissionFactor, GwpVersion, Scope2Method};
use esrs_common::db::init::init_memory_database;
use esrs_common::db::{
    create_tenant, CheckoutCompletion, EmissionInput, FactorQuery, NewEvidence, NewFactor,
    ScopeSelection, TenantScope, VoucherStatus,
};
use esrs_common::Error;
use sqlx::SqlitePool;

async fn two_tenants() -> (SqlitePool, TenantScope, TenantScope) {
    let pool = init_memory_database().await.unwrap();
    let (a, _) = create_tenant(&pool, "Tenant A").await.unwrap();
    let (b, _) = create_tenant(&pool, "Tenant B").await.unwrap();
    (
        pool.clone(),
        TenantScope::for_tenant(pool.clone(), &a),
        TenantScope::for_tenant(pool, &b),
    )
}

fn electricity_input(kwh: f64) -> EmissionInput {
    EmissionInput {
        activity_description: "Office electricity".to_string(),
        activity_value: kwh,
        activity_unit: "kWh".to_string(),
        emission_factor: Some(EmissionFactor {
            value: 0.4,
            unit: "kgCO2e/kWh".to_string(),
            source: "Supplier".to_string(),
            data_quality_tier: 2,
        }),
        emission_factor_id: None,
        gases: Vec::new(),
        gwp_version: None,
        scope: ScopeSelection {
            scope: "SCOPE_2".to_string(),
            scope2_method: Some(Scope2Method::LocationBased),
            scope3_category: None,
        },
        uncertainty_percent: Some(5.0),
        reporting_year: 2024,
    }
}

async fn store_emission(scope: &TenantScope, kwh: f64) -> uuid::Uuid {
    let input = electricity_input(kwh);
    let factor = input.emission_factor.clone().unwrap();
    let calculated = input.calculate(None, factor, GwpVersion::Ar6).unwrap();
    scope.create_emission(calculated).await.unwrap().guid
}

fn checkout(reference: &str, max_uses: i64) -> CheckoutCompletion {
    CheckoutCompletion {
        checkout_reference: reference.to_string(),
        amount_cents: 49_00,
        currency: "EUR".to_string(),
        max_uses,
    }
}

#[tokio::test]
async fn test_emissions_are_tenant_scoped() {
    let (_pool, a, b) = two_tenants().await;
    let guid = store_emission(&a, 1000.0).await;

    let own = a.get_emission(guid).await.unwrap().expect("own record");
    assert!((own.total_emissions_tco2e - 0.4).abs() < 1e-12);

    assert!(b.get_emission(guid).await.unwrap().is_none());
    assert_eq!(b.count_emissions(None).await.unwrap(), 0);
    assert!(b.list_emissions(None, 100, 0).await.unwrap().is_empty());
    assert!(b.inventory(None).await.unwrap().entries.is_empty());
    let own_inventory = a.inventory(None).await.unwrap();
    assert_eq!(own_inventory.entries.len(), 1);
    assert_eq!(own_inventory.gwp_versions.len(), 1);

    let update = electricity_input(2000.0);
    let factor = update.emission_factor.clone().unwrap();
    let calculated = update.calculate(None, factor, GwpVersion::Ar6).unwrap();
    assert!(matches!(
        b.update_emission(guid, calculated).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(b.delete_emission(guid).await, Err(Error::NotFound(_))));

    assert_eq!(a.count_emissions(Some(2024)).await.unwrap(), 1);
    assert_eq!(a.count_emissions(Some(2023)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_data_quality_and_evidence_are_tenant_scoped() {
    let (_pool, a, b) = two_tenants().await;
    let guid = store_emission(&a, 500.0).await;

    let quality = DataQuality {
        tier: 3,
        temporal: 5,
        geographical: 5,
        technological: 5,
        completeness: 1.0,
        uncertainty_percent: 0.0,
    };
    assert!(matches!(
        b.set_data_quality(guid, &quality).await,
        Err(Error::NotFound(_))
    ));
    let score = a.set_data_quality(guid, &quality).await.unwrap();
    assert!((score - 100.0).abs() < 1e-9);

    let record = a.get_emission(guid).await.unwrap().unwrap();
    assert_eq!(record.data_quality, Some(quality));

    let evidence = NewEvidence {
        filename: "invoice-2024-03.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        sha256: "A".repeat(64),
        size_bytes: 1024,
        storage_uri: None,
    };
    assert!(matches!(
        b.add_evidence(guid, evidence.clone()).await,
        Err(Error::NotFound(_))
    ));
    let stored = a.add_evidence(guid, evidence).await.unwrap();
    assert_eq!(stored.sha256, "a".repeat(64));

    assert_eq!(a.list_evidence(guid).await.unwrap().len(), 1);
    assert!(matches!(b.list_evidence(guid).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_private_factors_are_tenant_scoped() {
    let (_pool, a, b) = two_tenants().await;
    let created = a
        .create_factor(NewFactor {
            name: "Supplier green tariff".to_string(),
            category: Some("purchased_electricity".to_string()),
            region: Some("DE".to_string()),
            year: Some(2024),
            factor: EmissionFactor {
                value: 0.02,
                unit: "kgCO2e/kWh".to_string(),
                source: "Supplier disclosure".to_string(),
                data_quality_tier: 3,
            },
        })
        .await
        .unwrap();
    assert!(!created.shared);

    let query = FactorQuery {
        text: Some("green tariff".to_string()),
        activity_unit: None,
    };
    assert_eq!(a.list_factors(&query).await.unwrap().len(), 1);
    assert!(b.list_factors(&query).await.unwrap().is_empty());
    assert!(b.get_factor(created.guid).await.unwrap().is_none());

    let per_litre = b
        .list_factors(&FactorQuery {
            text: None,
            activity_unit: Some("litre".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(per_litre.len(), 2);
}

#[tokio::test]
async fn test_checkout_is_idempotent_per_reference() {
    let (_pool, a, b) = two_tenants().await;

    let (payment, voucher) = a.complete_checkout(checkout("cs_test_1", 1), 365).await.unwrap();
    let (again_payment, again_voucher) =
        a.complete_checkout(checkout("cs_test_1", 1), 365).await.unwrap();
    assert_eq!(payment.guid, again_payment.guid);
    assert_eq!(voucher.code, again_voucher.code);

    assert!(matches!(
        b.complete_checkout(checkout("cs_test_1", 1), 365).await,
        Err(Error::Conflict(_))
    ));
    assert!(b.get_voucher(&voucher.code).await.unwrap().is_none());
    assert!(matches!(
        b.redeem_voucher(&voucher.code).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_voucher_redeems_until_exhausted() {
    let (_pool, a, _b) = two_tenants().await;
    let (_, voucher) = a.complete_checkout(checkout("cs_test_2", 2), 365).await.unwrap();
    assert_eq!(voucher.status, VoucherStatus::Active);

    let first = a.redeem_voucher(&voucher.code).await.unwrap();
    assert_eq!(first.uses, 1);
    assert_eq!(first.status, VoucherStatus::Active);

    let second = a.redeem_voucher(&voucher.code).await.unwrap();
    assert_eq!(second.uses, 2);
    assert_eq!(second.status, VoucherStatus::Exhausted);

    assert!(matches!(
        a.redeem_voucher(&voucher.code).await,
        Err(Error::Conflict(_))
    ));
    let stored = a.get_voucher(&voucher.code).await.unwrap().unwrap();
    assert_eq!(stored.uses, 2);
}

#[tokio::test]
async fn test_expired_voucher_is_rejected_and_marked() {
    let (pool, a, _b) = two_tenants().await;
    let (_, voucher) = a.complete_checkout(checkout("cs_test_3", 1), 365).await.unwrap();

    sqlx::query("UPDATE vouchers SET expires_at = ? WHERE guid = ?")
        .bind((Utc::now() - Duration::days(1)).to_rfc3339())
        .bind(voucher.guid.to_string())
        .execute(&pool)
        .await
        .unwrap();

    assert!(matches!(
        a.redeem_voucher(&voucher.code).await,
        Err(Error::Conflict(_))
    ));

    let status: String = sqlx::query_scalar("SELECT status FROM vouchers WHERE guid = ?")
        .bind(voucher.guid.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "EXPIRED");

    let uses: i64 = sqlx::query_scalar("SELECT uses FROM vouchers WHERE guid = ?")
        .bind(voucher.guid.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(uses, 0);
}
