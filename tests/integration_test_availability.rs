mod common;

use axum::http::StatusCode;
use common::{days_ahead, test_settings, TestApp};
use reservation_backend::domain::models::availability::AvailabilityRule;
use serde_json::{json, Value};

fn disabled_contains(body: &Value, date: &str) -> bool {
    body["disabled_dates"].as_array().unwrap().iter().any(|entry| match entry {
        Value::String(single) => single == date,
        Value::Object(range) => {
            let from = range["from"].as_str().unwrap();
            let to = range["to"].as_str().unwrap();
            from <= date && date <= to
        }
        _ => false,
    })
}

#[tokio::test]
async fn test_min_date_respects_advance_notice() {
    let app = TestApp::new().await;

    let (status, body) = app.request("GET", "/api/v1/availability", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["min_date"], days_ahead(1).to_string());
    assert!(!disabled_contains(&body, &days_ahead(1).to_string()));
}

#[tokio::test]
async fn test_blocked_period_is_reported_as_range() {
    let app = TestApp::new().await;
    let start = days_ahead(10);
    let end = days_ahead(14);
    app.block(start, end, "Workshop closed for stocktake").await;

    let (status, body) = app.request("GET", "/api/v1/availability", None).await;
    assert_eq!(status, StatusCode::OK);

    let ranges: Vec<&Value> = body["disabled_dates"].as_array().unwrap().iter()
        .filter(|entry| entry.is_object())
        .collect();
    assert!(ranges.iter().any(|r| r["from"] == start.to_string() && r["to"] == end.to_string()));
    assert!(!disabled_contains(&body, &days_ahead(9).to_string()));
    assert!(!disabled_contains(&body, &days_ahead(15).to_string()));
}

#[tokio::test]
async fn test_capacity_boundary_and_counted_statuses() {
    let app = TestApp::new().await;
    let date = days_ahead(5);
    let date_str = date.to_string();

    app.seed_booking(date, "confirmed").await;
    let (_, body) = app.request("GET", "/api/v1/availability", None).await;
    assert!(!disabled_contains(&body, &date_str), "N-1 bookings must leave the date open");

    // Cancelled bookings never consume capacity.
    app.seed_booking(date, "cancelled").await;
    let (_, body) = app.request("GET", "/api/v1/availability", None).await;
    assert!(!disabled_contains(&body, &date_str));

    app.seed_booking(date, "pending").await;
    let (_, body) = app.request("GET", "/api/v1/availability", None).await;
    assert!(disabled_contains(&body, &date_str), "N bookings must close the date");
}

#[tokio::test]
async fn test_unset_capacity_never_closes_a_date() {
    let mut settings = test_settings();
    settings.availability = Some(AvailabilityRule {
        open_days: "Mon,Tue,Wed,Thu,Fri,Sat,Sun".into(),
        advance_notice_days: 1,
        daily_capacity: Some(0),
    });
    let app = TestApp::with_settings(settings).await;
    let date = days_ahead(3);
    for _ in 0..5 {
        app.seed_booking(date, "confirmed").await;
    }

    let (_, body) = app.request("GET", "/api/v1/availability", None).await;
    assert!(!disabled_contains(&body, &date.to_string()));
}

#[tokio::test]
async fn test_unparseable_open_days_close_everything() {
    let mut settings = test_settings();
    settings.availability = Some(AvailabilityRule {
        open_days: "Someday, Funday".into(),
        advance_notice_days: 0,
        daily_capacity: None,
    });
    settings.horizon_days = 30;
    let app = TestApp::with_settings(settings).await;

    let (_, body) = app.request("GET", "/api/v1/availability", None).await;
    for offset in 0..30 {
        assert!(disabled_contains(&body, &days_ahead(offset).to_string()));
    }
}

#[tokio::test]
async fn test_draft_creation_rechecks_the_date() {
    let app = TestApp::new().await;
    let blocked = days_ahead(8);
    app.block(blocked, blocked, "Public holiday").await;

    for date in [days_ahead(0), blocked] {
        let (status, body) = app.request("POST", "/api/v1/drafts", Some(json!({
            "service_type_id": app.service.id,
            "booking_date": date.to_string()
        }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
        assert_eq!(body["fields"][0]["field"], "booking_date");
    }

    let (_, body) = app.request("POST", "/api/v1/drafts", Some(json!({
        "service_type_id": app.service.id,
        "booking_date": blocked.to_string()
    }))).await;
    assert!(body["fields"][0]["message"].as_str().unwrap().contains("Public holiday"));
}

#[tokio::test]
async fn test_unknown_service_is_a_field_error() {
    let app = TestApp::new().await;
    let (status, body) = app.request("POST", "/api/v1/drafts", Some(json!({
        "service_type_id": "does-not-exist",
        "booking_date": days_ahead(3).to_string()
    }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "service_type_id");
}
