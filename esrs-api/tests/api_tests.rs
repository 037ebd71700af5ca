//! Integration tests for esrs-api endpoints
//!
//! Tests cover:
//! - Health endpoint (no API key required)
//! - Tenant resolution from `Authorization: Bearer` and `X-Api-Key`
//! - Emissions CRUD, summary, data quality and evidence
//! - Emission factor lookup
//! - Vouchers
//! - Materiality assessment

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use esrs_api::{build_router, AppState};
use esrs_common::config::ServiceConfig;
use esrs_common::db::{create_tenant, init_memory_database};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: app over a fresh in-memory database plus one tenant's key
async fn setup_app() -> (Router, String) {
    let pool = init_memory_database().await.expect("in-memory database");
    let (_, key) = create_tenant(&pool, "Acme Components").await.unwrap();
    let app = build_router(AppState::new(pool, ServiceConfig::default()));
    (app, key)
}

/// Test helper: request with a bearer key and optional JSON body
fn test_request(method: &str, uri: &str, key: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", key));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn electricity(kwh: f64) -> Value {
    json!({
        "activity_description": "Head office electricity",
        "activity_value": kwh,
        "activity_unit": "kWh",
        "emission_factor": {
            "value": 0.4,
            "unit": "kgCO2e/kWh",
            "source": "Supplier invoice",
            "data_quality_tier": 2
        },
        "scope": "SCOPE_2",
        "scope2_method": "LOCATION_BASED",
        "uncertainty_percent": 5.0,
        "reporting_year": 2024
    })
}

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let (app, _) = setup_app().await;
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "esrs-api");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_api_requires_known_key() {
    let (app, key) = setup_app().await;

    let anonymous = Request::builder()
        .uri("/api/v1/emissions")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, test_request("GET", "/api/v1/emissions", "esrs_wrong", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let via_header = Request::builder()
        .uri("/api/v1/emissions")
        .header("X-Api-Key", &key)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, via_header).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Emissions
// =============================================================================

#[tokio::test]
async fn test_create_emission_with_inline_factor() {
    let (app, key) = setup_app().await;
    let (status, body) = send(
        &app,
        test_request("POST", "/api/v1/emissions", &key, Some(electricity(1000.0))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!((body["total_emissions_tco2e"].as_f64().unwrap() - 0.4).abs() < 1e-12);
    assert_eq!(body["scope"], "SCOPE_2");
    assert_eq!(body["scope2_method"], "LOCATION_BASED");
    assert_eq!(body["gwp_version"], "AR6");
    assert!(body["emission_factor_id"].is_null());
}

#[tokio::test]
async fn test_create_emission_with_library_factor() {
    let (app, key) = setup_app().await;
    let request = json!({
        "activity_description": "Fleet diesel",
        "activity_value": 1000.0,
        "activity_unit": "litre",
        "emission_factor_id": "00000000-0000-4000-8000-000000000002",
        "scope": "SCOPE_1",
        "reporting_year": 2024
    });
    let (status, body) = send(&app, test_request("POST", "/api/v1/emissions", &key, Some(request))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!((body["total_emissions_tco2e"].as_f64().unwrap() - 2.51279).abs() < 1e-9);
    assert_eq!(body["emission_factor_id"], "00000000-0000-4000-8000-000000000002");
}

#[tokio::test]
async fn test_invalid_emission_input_is_unprocessable() {
    let (app, key) = setup_app().await;

    let (status, body) = send(
        &app,
        test_request("POST", "/api/v1/emissions", &key, Some(electricity(-5.0))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "UNPROCESSABLE");

    let mut mismatch = electricity(10.0);
    mismatch["activity_unit"] = json!("litre");
    let (status, _) = send(&app, test_request("POST", "/api/v1/emissions", &key, Some(mismatch))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let mut no_factor = electricity(10.0);
    no_factor.as_object_mut().unwrap().remove("emission_factor");
    let (status, _) = send(&app, test_request("POST", "/api/v1/emissions", &key, Some(no_factor))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let mut scope3 = electricity(10.0);
    scope3["scope"] = json!("SCOPE_3");
    scope3["scope3_category"] = json!(16);
    let (status, _) = send(&app, test_request("POST", "/api/v1/emissions", &key, Some(scope3))).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_emission_crud_and_pagination() {
    let (app, key) = setup_app().await;
    let mut ids = Vec::new();
    for kwh in [100.0, 200.0, 300.0] {
        let (_, body) = send(
            &app,
            test_request("POST", "/api/v1/emissions", &key, Some(electricity(kwh))),
        )
        .await;
        ids.push(body["guid"].as_str().unwrap().to_string());
    }

    let (status, body) = send(
        &app,
        test_request("GET", "/api/v1/emissions?page=2&page_size=2", &key, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["total_items"], 3);
    assert_eq!(body["pagination"]["total_pages"], 2);

    let uri = format!("/api/v1/emissions/{}", ids[0]);
    let (status, body) = send(&app, test_request("PUT", &uri, &key, Some(electricity(1000.0)))).await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["total_emissions_tco2e"].as_f64().unwrap() - 0.4).abs() < 1e-12);

    let (status, _) = send(&app, test_request("DELETE", &uri, &key, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, test_request("GET", &uri, &key, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_summary_aggregates_by_scope() {
    let (app, key) = setup_app().await;
    send(&app, test_request("POST", "/api/v1/emissions", &key, Some(electricity(10_000.0)))).await;

    let travel = json!({
        "activity_description": "Flights",
        "activity_value": 20_000.0,
        "activity_unit": "passenger.km",
        "emission_factor": {
            "value": 0.15,
            "unit": "kgCO2e/passenger.km",
            "source": "DEFRA 2024",
            "data_quality_tier": 1
        },
        "scope": "SCOPE_3",
        "scope3_category": 6,
        "reporting_year": 2024
    });
    send(&app, test_request("POST", "/api/v1/emissions", &key, Some(travel))).await;

    let (status, body) = send(
        &app,
        test_request("GET", "/api/v1/emissions/summary?reporting_year=2024&sector=services", &key, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record_count"], 2);
    assert!((body["scope2_location_tco2e"].as_f64().unwrap() - 4.0).abs() < 1e-9);
    assert!((body["scope3_tco2e"].as_f64().unwrap() - 3.0).abs() < 1e-9);
    assert!((body["total_location_based_tco2e"].as_f64().unwrap() - 7.0).abs() < 1e-9);

    let travel_assessment = &body["materiality"][5];
    assert_eq!(travel_assessment["category"], 6);
    assert_eq!(travel_assessment["material"], true);
    assert_eq!(body["gwp_versions"], json!(["AR6"]));
    assert_eq!(body["gwp_version"], "AR6");
}

#[tokio::test]
async fn test_summary_reports_gwp_versions_present() {
    let (app, key) = setup_app().await;

    let mut older = electricity(1_000.0);
    older["gwp_version"] = json!("AR5");
    send(&app, test_request("POST", "/api/v1/emissions", &key, Some(older))).await;

    let (_, body) = send(&app, test_request("GET", "/api/v1/emissions/summary", &key, None)).await;
    assert_eq!(body["gwp_versions"], json!(["AR5"]));
    assert_eq!(body["gwp_version"], "AR5");

    send(&app, test_request("POST", "/api/v1/emissions", &key, Some(electricity(2_000.0)))).await;
    let (status, body) = send(&app, test_request("GET", "/api/v1/emissions/summary", &key, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record_count"], 2);
    assert_eq!(body["gwp_versions"], json!(["AR5", "AR6"]));
}

#[tokio::test]
async fn test_data_quality_and_evidence() {
    let (app, key) = setup_app().await;
    let (_, created) = send(
        &app,
        test_request("POST", "/api/v1/emissions", &key, Some(electricity(500.0))),
    )
    .await;
    let id = created["guid"].as_str().unwrap();

    let quality = json!({
        "tier": 2,
        "temporal": 4,
        "geographical": 4,
        "technological": 4,
        "completeness": 0.9,
        "uncertainty_percent": 10.0
    });
    let (status, body) = send(
        &app,
        test_request("POST", &format!("/api/v1/emissions/{}/data-quality", id), &key, Some(quality)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // 40*2/3 + 30*4/5 + 20*0.9 + 10*0.9
    let expected = 40.0 * 2.0 / 3.0 + 24.0 + 18.0 + 9.0;
    assert!((body["score"].as_f64().unwrap() - expected).abs() < 1e-9);

    let bad_quality = json!({
        "tier": 4, "temporal": 4, "geographical": 4, "technological": 4,
        "completeness": 0.9, "uncertainty_percent": 10.0
    });
    let (status, _) = send(
        &app,
        test_request("POST", &format!("/api/v1/emissions/{}/data-quality", id), &key, Some(bad_quality)),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let evidence = json!({
        "filename": "meter-readings-2024.csv",
        "content_type": "text/csv",
        "sha256": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
        "size_bytes": 2048
    });
    let uri = format!("/api/v1/emissions/{}/evidence", id);
    let (status, _) = send(&app, test_request("POST", &uri, &key, Some(evidence))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, test_request("GET", &uri, &key, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["filename"], "meter-readings-2024.csv");

    let (_, record) = send(&app, test_request("GET", &format!("/api/v1/emissions/{}", id), &key, None)).await;
    assert_eq!(record["data_quality"]["tier"], 2);
}

// =============================================================================
// Emission factors
// =============================================================================

#[tokio::test]
async fn test_factor_lookup_and_creation() {
    let (app, key) = setup_app().await;

    let (status, body) = send(&app, test_request("GET", "/api/v1/emission-factors?unit=kWh", &key, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let factor = json!({
        "name": "Own solar PPA",
        "category": "purchased_electricity",
        "value": 0.0,
        "unit": "kgCO2e/kWh",
        "source": "Contract",
        "data_quality_tier": 3
    });
    let (status, created) = send(&app, test_request("POST", "/api/v1/emission-factors", &key, Some(factor))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["shared"], false);

    let (_, body) = send(&app, test_request("GET", "/api/v1/emission-factors?q=solar", &key, None)).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let uri = format!("/api/v1/emission-factors/{}", created["guid"].as_str().unwrap());
    let (status, body) = send(&app, test_request("GET", &uri, &key, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Own solar PPA");

    let bad = json!({
        "name": "Broken",
        "value": 1.0,
        "unit": "kWh",
        "source": "x",
        "data_quality_tier": 1
    });
    let (status, _) = send(&app, test_request("POST", "/api/v1/emission-factors", &key, Some(bad))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Vouchers
// =============================================================================

#[tokio::test]
async fn test_voucher_checkout_and_redeem() {
    let (app, key) = setup_app().await;
    let checkout = json!({
        "checkout_reference": "cs_live_123",
        "amount_cents": 4900,
        "currency": "EUR",
        "max_uses": 1
    });
    let (status, body) = send(
        &app,
        test_request("POST", "/api/v1/vouchers/checkout/complete", &key, Some(checkout.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let code = body["voucher"]["code"].as_str().unwrap().to_string();
    assert_eq!(body["voucher"]["status"], "ACTIVE");

    // Same checkout reported twice yields the same voucher
    let (_, again) = send(
        &app,
        test_request("POST", "/api/v1/vouchers/checkout/complete", &key, Some(checkout)),
    )
    .await;
    assert_eq!(again["voucher"]["code"], code.as_str());

    let redeem = format!("/api/v1/vouchers/{}/redeem", code);
    let (status, body) = send(&app, test_request("POST", &redeem, &key, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "EXHAUSTED");

    let (status, _) = send(&app, test_request("POST", &redeem, &key, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, test_request("GET", &format!("/api/v1/vouchers/{}", code), &key, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["uses"], 1);

    let (status, _) = send(&app, test_request("GET", "/api/v1/vouchers/ESRS-NONE-NONE-NONE", &key, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Materiality
// =============================================================================

#[tokio::test]
async fn test_materiality_assess() {
    let (app, key) = setup_app().await;
    let request = json!({
        "sector": "services",
        "total_emissions_tco2e": 1000.0,
        "categories": [
            { "category": 6, "emissions_tco2e": 120.0 },
            { "category": 7, "emissions_tco2e": 50.0 }
        ]
    });
    let (status, body) = send(&app, test_request("POST", "/api/v1/materiality/assess", &key, Some(request))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threshold"], 0.1);
    assert_eq!(body["material_categories"], json!([6]));
    assert_eq!(body["assessments"].as_array().unwrap().len(), 15);

    let inconsistent = json!({
        "sector": "services",
        "total_emissions_tco2e": 10.0,
        "categories": [{ "category": 6, "emissions_tco2e": 120.0 }]
    });
    let (status, _) = send(&app, test_request("POST", "/api/v1/materiality/assess", &key, Some(inconsistent))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
