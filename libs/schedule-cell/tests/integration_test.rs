mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use schedule_cell::router::{schedule_routes, schedule_routes_with_service};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

use common::{monday_morning_profile, service_for, InMemoryScheduleStore};

async fn create_test_app(mock_server: &MockServer) -> Router {
    schedule_routes(TestConfig::with_supabase_url(mock_server.uri()).to_arc())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn mount_doctor(mock_server: &MockServer, doctor_id: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_availability_response(doctor_id, &["Monday"], "09:00:00", "12:00:00")
        ])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_schedule_endpoint_generates_when_store_is_empty() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    mount_doctor(&mock_server, &doctor_id).await;

    let app = create_test_app(&mock_server).await;
    let (status, body) = get_json(app, &format!("/{}/schedule?date=2024-01-01", doctor_id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doctor_id"], doctor_id);
    assert_eq!(body["days"][0]["source"], "generated");
    let slots = body["days"][0]["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0]["start_time"], "09:00");
    assert_eq!(slots[0]["end_time"], "10:00");
    assert_eq!(slots[0]["status"], "available");
    assert_eq!(slots[0]["patient_id"], Value::Null);
}

#[tokio::test]
async fn test_schedule_endpoint_serves_persisted_rows_with_patient_names() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::schedule_row_response(
                &doctor_id, "2024-01-01", "10:00:00", "11:00:00", "booked", Some(&patient_id),
            )
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(&patient_id, "Jane", "Doe")
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server).await;
    let (status, body) = get_json(app, &format!("/{}/schedule?date=2024-01-01", doctor_id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"][0]["source"], "persisted");
    let slot = &body["days"][0]["slots"][0];
    assert_eq!(slot["status"], "booked");
    assert_eq!(slot["patient_id"], patient_id);
    assert_eq!(slot["patient_display_name"], "Jane Doe");
}

#[tokio::test]
async fn test_schedule_endpoint_falls_back_when_store_errors() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database is down"))
        .mount(&mock_server)
        .await;
    mount_doctor(&mock_server, &doctor_id).await;

    let app = create_test_app(&mock_server).await;
    let (status, body) = get_json(
        app,
        &format!("/{}/schedule?from=2024-01-01&to=2024-01-02", doctor_id),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"].as_array().unwrap().len(), 2);
    assert_eq!(body["days"][0]["slots"].as_array().unwrap().len(), 3);
    assert_eq!(body["days"][1]["slots"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_schedule_endpoint_unknown_doctor_is_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server).await;
    let (status, body) = get_json(app, &format!("/{}/schedule?date=2024-01-01", Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_schedule_endpoint_rejects_bad_input() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    let (status, _) = get_json(create_test_app(&mock_server).await, "/not-a-uuid/schedule?date=2024-01-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(create_test_app(&mock_server).await, &format!("/{}/schedule", doctor_id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get_json(
        create_test_app(&mock_server).await,
        &format!("/{}/schedule?from=2024-02-01&to=2024-01-01", doctor_id),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_candidate_slots_endpoint() {
    let doctor_id = Uuid::new_v4();
    let store = Arc::new(InMemoryScheduleStore::with_profile(monday_morning_profile(doctor_id)));
    let app = schedule_routes_with_service(Arc::new(service_for(store)));

    let (status, body) = get_json(
        app,
        &format!("/{}/candidate-slots?from=2024-01-01&to=2024-01-07", doctor_id),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["candidate_slots"][2]["start_time"], "11:00");
    assert_eq!(body["candidate_slots"][2]["slot_date"], "2024-01-01");
}
