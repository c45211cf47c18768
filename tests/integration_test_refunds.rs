mod common;

use axum::http::StatusCode;
use common::{days_ahead, test_settings, AuthHeaders, TestApp, SERVICE_PRICE};
use chrono::Utc;
use reservation_backend::config::BookingSettings;
use reservation_backend::domain::models::refund::{RefundInitiator, RefundPolicy, RefundTier};
use reservation_backend::domain::services::refund::RefundService;
use serde_json::json;
use std::sync::Arc;

const OWNER_ID: &str = "user-owner";

/// Books `days` out as an authenticated customer and returns the booking reference.
async fn paid_booking(app: &TestApp, owner: &AuthHeaders, days: i64, option: &str) -> String {
    let token = app.create_draft(days_ahead(days)).await;
    app.attach_item(&token).await;
    let (status, body) = app.request_as(owner, "PUT", &format!("/api/v1/drafts/{}/profile", token), Some(json!({
        "name": "Jamie Driver", "email": "jamie@example.com"
    }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let (status, _) = app.choose_option(&token, option).await;
    assert_eq!(status, StatusCode::OK);

    let intent_id = app.enter_payment(&token).await;
    let (status, _) = app.payment_succeeded(&intent_id).await;
    assert_eq!(status, StatusCode::OK);

    let booking = app.state.repos.bookings.find_by_intent_id(&intent_id).await.unwrap().unwrap();
    booking.reference
}

fn refund_uri(reference: &str) -> String {
    format!("/api/v1/bookings/{}/refund-calculation", reference)
}

fn settings_with_fees() -> BookingSettings {
    let mut settings = test_settings();
    settings.refund_policy.deduct_gateway_fee = true;
    settings
}

#[tokio::test]
async fn test_admin_gets_full_refund_well_ahead() {
    let app = TestApp::new().await;
    let owner = app.mint_token(OWNER_ID, "USER");
    let reference = paid_booking(&app, &owner, 20, "online_full").await;

    let admin = app.mint_token("admin-1", "ADMIN");
    let (status, body) = app.request_as(&admin, "POST", &refund_uri(&reference), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["reference"], reference);
    assert_eq!(body["final_amount"], SERVICE_PRICE);
    assert_eq!(body["calculation"]["percentage_bps"], 10_000);
    assert_eq!(body["calculation"]["matched_tier"]["days_before"], 7);
    assert_eq!(body["calculation"]["fee_deducted"], 0);
    assert_eq!(body["record"]["initiated_by"], "admin");
    assert_eq!(body["record"]["payment_type"], "full");
    assert_eq!(body["record"]["policy_version"], "v1");

    assert_eq!(app.count("SELECT COUNT(*) FROM refund_calculations").await, 1);
}

#[tokio::test]
async fn test_gateway_fee_depends_on_card_origin() {
    let app = TestApp::with_settings(settings_with_fees()).await;
    let owner = app.mint_token(OWNER_ID, "USER");
    let reference = paid_booking(&app, &owner, 20, "online_full").await;
    let admin = app.mint_token("admin-1", "ADMIN");

    let (status, body) = app.request_as(&admin, "POST", &refund_uri(&reference), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["calculation"]["fee_deducted"], 370);
    assert_eq!(body["final_amount"], 19_630);

    let (_, body) = app.request_as(&admin, "POST", &refund_uri(&reference), Some(json!({ "international": true }))).await;
    assert_eq!(body["calculation"]["fee_deducted"], 730);
    assert_eq!(body["final_amount"], 19_270);

    // Every calculation is kept for audit.
    assert_eq!(app.count("SELECT COUNT(*) FROM refund_calculations").await, 2);
}

#[tokio::test]
async fn test_refund_shrinks_closer_to_the_date() {
    let app = TestApp::new().await;
    let owner = app.mint_token(OWNER_ID, "USER");
    let half = paid_booking(&app, &owner, 4, "online_full").await;
    let none = paid_booking(&app, &owner, 2, "online_full").await;

    let (_, body) = app.request_as(&owner, "POST", &refund_uri(&half), None).await;
    assert_eq!(body["calculation"]["percentage_bps"], 5_000);
    assert_eq!(body["final_amount"], SERVICE_PRICE / 2);

    let (_, body) = app.request_as(&owner, "POST", &refund_uri(&none), None).await;
    assert_eq!(body["calculation"]["percentage_bps"], 0);
    assert_eq!(body["final_amount"], 0);
}

#[tokio::test]
async fn test_deposit_refund_uses_deposit_tiers() {
    let app = TestApp::new().await;
    let owner = app.mint_token(OWNER_ID, "USER");
    let reference = paid_booking(&app, &owner, 20, "online_deposit").await;

    let (status, body) = app.request_as(&owner, "POST", &refund_uri(&reference), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["record"]["payment_type"], "deposit");
    assert_eq!(body["record"]["amount_paid"], 5_000);
    assert_eq!(body["final_amount"], 5_000);
}

#[tokio::test]
async fn test_only_owner_or_admin_may_calculate() {
    let app = TestApp::new().await;
    let owner = app.mint_token(OWNER_ID, "USER");
    let reference = paid_booking(&app, &owner, 20, "online_full").await;

    let (status, body) = app.request_as(&owner, "POST", &refund_uri(&reference), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["initiated_by"], "customer");

    let stranger = app.mint_token("user-stranger", "USER");
    let (status, _) = app.request_as(&stranger, "POST", &refund_uri(&reference), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.request("POST", &refund_uri(&reference), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.request_as(&owner, "POST", &refund_uri("SVC-NOPE"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.count("SELECT COUNT(*) FROM refund_calculations").await, 1);
}

#[tokio::test]
async fn test_csrf_token_must_match() {
    let app = TestApp::new().await;
    let owner = app.mint_token(OWNER_ID, "USER");
    let reference = paid_booking(&app, &owner, 20, "online_full").await;

    let forged = AuthHeaders { access_token: owner.access_token.clone(), csrf_token: "not-the-token".into() };
    let (status, _) = app.request_as(&forged, "POST", &refund_uri(&reference), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_in_store_bookings_are_refunded_manually() {
    let app = TestApp::new().await;
    let token = app.draft_ready_for_payment(days_ahead(20), "in_store").await;
    let (status, body) = app.request("POST", &format!("/api/v1/drafts/{}/confirm-in-store", token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let reference = body["reference"].as_str().unwrap().to_string();

    let admin = app.mint_token("admin-1", "ADMIN");
    let (status, body) = app.request_as(&admin, "POST", &refund_uri(&reference), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("in-store"));
    assert_eq!(app.count("SELECT COUNT(*) FROM refund_calculations").await, 0);
}

#[tokio::test]
async fn test_refund_uses_policy_in_force_at_payment() {
    let app = TestApp::new().await;
    let owner = app.mint_token(OWNER_ID, "USER");
    let reference = paid_booking(&app, &owner, 20, "online_full").await;

    let booking = app.state.repos.bookings.find_by_reference(&reference).await.unwrap().unwrap();
    assert_eq!(booking.refund_policy.0.version, "v1");

    // The shop tightens its policy after the customer has paid.
    let mut stricter = test_settings();
    stricter.refund_policy = RefundPolicy {
        version: "v2".into(),
        full_payment: vec![RefundTier { days_before: 0, percentage_bps: 0 }],
        deposit: vec![RefundTier { days_before: 0, percentage_bps: 0 }],
        deduct_gateway_fee: true,
    };
    let refunds = RefundService::new(Arc::new(stricter), app.state.repos.refunds.clone());

    let (outcome, record) = refunds
        .calculate_for_booking(&booking, RefundInitiator::Admin, false, Utc::now())
        .await
        .unwrap();
    assert_eq!(outcome.final_amount, SERVICE_PRICE);
    assert_eq!(outcome.fee_deducted, 0);
    assert_eq!(record.policy_version, "v1");

    let (_, body) = app.request_as(&owner, "POST", &refund_uri(&reference), None).await;
    assert_eq!(body["record"]["policy_version"], "v1");
}
