// libs/schedule-cell/tests/handlers_test.rs

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use schedule_cell::router::schedule_routes_with_service;
use schedule_cell::services::{FixedClock, ScheduleService};
use shared_utils::test_utils::TestConfig;

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

fn create_test_app(config: TestConfig) -> Router {
    let today = NaiveDate::from_ymd_opt(2024, 1, 13).unwrap();
    let service = ScheduleService::with_clock(&config.to_app_config(), Arc::new(FixedClock(today)));
    schedule_routes_with_service(Arc::new(service))
}

fn slot_json(date: &str, time: &str, doctor_id: &str) -> Value {
    json!({
        "date": date,
        "time": time,
        "doctor_id": doctor_id
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

// ==============================================================================
// ROSTER & SETTINGS
// ==============================================================================

#[tokio::test]
async fn test_list_doctors() {
    let app = create_test_app(TestConfig::default());

    let (status, body) = send(&app, "GET", "/doctors", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["doctors"][0]["id"], "1");
}

#[tokio::test]
async fn test_settings_round_trip() {
    let app = create_test_app(TestConfig::default());

    let (status, body) = send(&app, "GET", "/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slot_duration"], 12);
    assert_eq!(body["schedule_range"], 7);
    assert_eq!(body["orphan_policy"], "preserve");

    let (status, body) = send(
        &app,
        "PUT",
        "/settings",
        Some(json!({ "slot_duration": 15, "orphan_policy": "drop" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slot_duration"], 15);
    assert_eq!(body["orphan_policy"], "drop");

    let (status, body) = send(&app, "PUT", "/settings", Some(json!({ "slot_duration": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Slot duration"));
}

// ==============================================================================
// GENERATION & GRID
// ==============================================================================

#[tokio::test]
async fn test_generate_schedule() {
    let app = create_test_app(TestConfig::default());

    let (status, _) = send(&app, "POST", "/doctors/99/generate", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", "/doctors/1/generate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["working_days"], 5);
    assert_eq!(body["slots_generated"], 250);

    let (status, body) = send(&app, "GET", "/doctors/1/slots", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 250);
    assert_eq!(body["slots"][0]["time"], "08:00");
    assert_eq!(body["slots"][0]["status"], "available");
    assert_eq!(body["slots"][0]["id"], "2024-01-14-08:00-1");
}

#[tokio::test]
async fn test_weekly_grid_endpoint() {
    let app = create_test_app(TestConfig::default());
    send(&app, "POST", "/doctors/1/generate", None).await;

    let (status, body) = send(
        &app,
        "GET",
        "/doctors/1/week?today=2024-01-16&working=false&non_working=true",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["week_start"], "2024-01-13");
    assert_eq!(body["days"][6]["weekday_name"], "جمعه");

    let rows = body["rows"].as_array().unwrap();
    assert!(rows.iter().all(|row| row["is_working_hour"] == false));
    assert_eq!(rows[0]["time"], "05:00");
    assert_eq!(rows[0]["cells"][0]["kind"], "empty");
}

#[tokio::test]
async fn test_weekly_grid_lists_cell_actions() {
    let app = create_test_app(TestConfig::default());
    send(&app, "POST", "/doctors/1/generate", None).await;

    let (status, body) = send(&app, "GET", "/doctors/1/week?today=2024-01-15", None).await;

    assert_eq!(status, StatusCode::OK);
    // first working row, Monday column
    let cell = &body["rows"][0]["cells"][2];
    assert_eq!(cell["kind"], "materialized");
    assert_eq!(cell["slot"]["status"], "available");
    assert_eq!(cell["actions"], json!(["book", "toggle", "transfer_into"]));
}

#[tokio::test]
async fn test_weekly_grid_rejects_week_past_calendar_end() {
    let app = create_test_app(TestConfig::default());

    let (status, body) = send(&app, "GET", "/doctors/1/week?today=%2B262142-12-31", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("outside the supported calendar"));
}

// ==============================================================================
// SLOT MUTATIONS
// ==============================================================================

#[tokio::test]
async fn test_book_and_cancel_slot() {
    let app = create_test_app(TestConfig::default());
    send(&app, "POST", "/doctors/1/generate", None).await;

    let mut request = slot_json("2024-01-15", "09:00", "1");
    request["patient_name"] = json!("علی احمدی");
    request["patient_phone"] = json!("۰۹۱۲۳۴۵۶۷۸۹");

    let (status, body) = send(&app, "POST", "/slots/book", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "booked");
    assert_eq!(body["patient_phone"], "09123456789");

    let (status, body) = send(&app, "POST", "/slots/book", Some(request)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Cannot book a booked slot");

    let (status, body) = send(
        &app,
        "POST",
        "/slots/cancel",
        Some(slot_json("2024-01-15", "09:00", "1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "available");
    assert!(body.get("patient_name").is_none());
}

#[tokio::test]
async fn test_book_requires_patient_fields() {
    let app = create_test_app(TestConfig::default());
    send(&app, "POST", "/doctors/1/generate", None).await;

    let mut request = slot_json("2024-01-15", "09:00", "1");
    request["patient_name"] = json!("");
    request["patient_phone"] = json!("09123456789");

    let (status, _) = send(&app, "POST", "/slots/book", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_toggle_slot() {
    let app = create_test_app(TestConfig::default());

    let (status, body) = send(
        &app,
        "POST",
        "/slots/toggle",
        Some(slot_json("2024-01-15", "۱۰:۰۰", "1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "available");
    assert_eq!(body["time"], "10:00");

    let (_, body) = send(
        &app,
        "POST",
        "/slots/toggle",
        Some(slot_json("2024-01-15", "10:00", "1")),
    )
    .await;
    assert_eq!(body["status"], "blocked");

    let (status, _) = send(
        &app,
        "POST",
        "/slots/toggle",
        Some(slot_json("2024-01-15", "20:00", "1")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ==============================================================================
// TRANSFERS
// ==============================================================================

#[tokio::test]
async fn test_transfer_flow() {
    let app = create_test_app(TestConfig::default());
    send(&app, "POST", "/doctors/1/generate", None).await;

    let mut request = slot_json("2024-01-15", "09:00", "1");
    request["patient_name"] = json!("n");
    request["patient_phone"] = json!("p");
    send(&app, "POST", "/slots/book", Some(request)).await;

    let (status, body) = send(
        &app,
        "POST",
        "/transfer/begin",
        Some(slot_json("2024-01-15", "09:00", "1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patient_name"], "n");

    let (_, body) = send(&app, "GET", "/transfer", None).await;
    assert_eq!(body["pending_transfer"]["source"]["time"], "09:00");

    let (status, body) = send(
        &app,
        "POST",
        "/transfer/complete",
        Some(json!({
            "from": slot_json("2024-01-15", "09:00", "1"),
            "to": slot_json("2024-01-17", "15:00", "1")
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"]["status"], "available");
    assert_eq!(body["destination"]["status"], "booked");
    assert_eq!(body["destination"]["patient_phone"], "p");

    let (_, body) = send(&app, "GET", "/transfer", None).await;
    assert!(body["pending_transfer"].is_null());
}

#[tokio::test]
async fn test_cancel_transfer() {
    let app = create_test_app(TestConfig::default());
    send(&app, "POST", "/doctors/1/generate", None).await;

    let (status, _) = send(
        &app,
        "POST",
        "/transfer/begin",
        Some(slot_json("2024-01-15", "09:00", "1")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "DELETE", "/transfer", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);
}

#[tokio::test]
async fn test_busy_service_returns_unavailable() {
    let app = create_test_app(TestConfig::default().with_latency(300));

    let generating = tokio::spawn({
        let app = app.clone();
        async move { send(&app, "POST", "/doctors/1/generate", None).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (status, body) = send(
        &app,
        "POST",
        "/slots/toggle",
        Some(slot_json("2024-01-15", "10:00", "1")),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Another schedule operation is in progress");

    let (status, _) = generating.await.unwrap();
    assert_eq!(status, StatusCode::OK);
}
