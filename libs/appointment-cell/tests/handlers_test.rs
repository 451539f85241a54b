use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::router::appointment_routes;
use shared_database::{AppState, BookingStore, NewSlot};
use shared_models::booking::{AvailabilitySlot, SessionType};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn test_state() -> Arc<AppState> {
    TestConfig::default().to_state()
}

fn bearer(user: &TestUser) -> String {
    let secret = TestConfig::default().jwt_secret;
    format!(
        "Bearer {}",
        JwtTestUtils::create_test_token(user, &secret, None)
    )
}

async fn seed_slot(state: &AppState, doctor_id: Uuid, capacity: i32) -> AvailabilitySlot {
    let start_time = Utc::now() + Duration::hours(48);
    state
        .store
        .create_slots(vec![NewSlot {
            doctor_id,
            start_time,
            end_time: start_time + Duration::minutes(30),
            capacity,
            session_type: SessionType::Consultation,
            rule_id: None,
        }])
        .await
        .unwrap()
        .pop()
        .unwrap()
}

fn book_body(slot_id: Uuid) -> Body {
    Body::from(
        json!({
            "slot_id": slot_id,
            "consulting_type": "in_person",
            "complaint": "sore throat",
            "visit_type": "first-visit"
        })
        .to_string(),
    )
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn booking_requires_authentication() {
    let state = test_state();
    let app = appointment_routes(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(book_body(Uuid::new_v4()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let state = test_state();
    let app = appointment_routes(state);
    let patient = TestUser::patient("patient@example.com");
    let secret = TestConfig::default().jwt_secret;
    let token = JwtTestUtils::create_expired_token(&patient, &secret);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(book_body(Uuid::new_v4()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn doctors_cannot_book_appointments() {
    let state = test_state();
    let doctor = TestUser::doctor("doctor@example.com");
    let slot = seed_slot(&state, doctor.id, 1).await;
    let app = appointment_routes(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::AUTHORIZATION, bearer(&doctor))
                .header(header::CONTENT_TYPE, "application/json")
                .body(book_body(slot.id))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patient_books_and_fetches_an_appointment() {
    let state = test_state();
    let patient = TestUser::patient("patient@example.com");
    let slot = seed_slot(&state, Uuid::new_v4(), 1).await;
    let app = appointment_routes(state.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::AUTHORIZATION, bearer(&patient))
                .header(header::CONTENT_TYPE, "application/json")
                .body(book_body(slot.id))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["appointment"]["status"], json!("booked"));
    let appointment_id = body["appointment"]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/{appointment_id}"))
                .header(header::AUTHORIZATION, bearer(&patient))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["slot_id"], json!(slot.id.to_string()));
}

#[tokio::test]
async fn booking_a_full_slot_returns_conflict() {
    let state = test_state();
    let first = TestUser::patient("first@example.com");
    let second = TestUser::patient("second@example.com");
    let slot = seed_slot(&state, Uuid::new_v4(), 1).await;
    let app = appointment_routes(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::AUTHORIZATION, bearer(&first))
                .header(header::CONTENT_TYPE, "application/json")
                .body(book_body(slot.id))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::AUTHORIZATION, bearer(&second))
                .header(header::CONTENT_TYPE, "application/json")
                .body(book_body(slot.id))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(body["error"], json!("Slot full"));
}

#[tokio::test]
async fn booking_an_unknown_slot_returns_not_found() {
    let state = test_state();
    let patient = TestUser::patient("patient@example.com");
    let app = appointment_routes(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::AUTHORIZATION, bearer(&patient))
                .header(header::CONTENT_TYPE, "application/json")
                .body(book_body(Uuid::new_v4()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_endpoint_cancels_a_booked_appointment() {
    let state = test_state();
    let patient = TestUser::patient("patient@example.com");
    let slot = seed_slot(&state, Uuid::new_v4(), 1).await;
    let app = appointment_routes(state.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::AUTHORIZATION, bearer(&patient))
                .header(header::CONTENT_TYPE, "application/json")
                .body(book_body(slot.id))
                .unwrap(),
        )
        .await
        .unwrap();
    let body = read_json(response).await;
    let appointment_id = body["appointment"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{appointment_id}/cancel"))
                .header(header::AUTHORIZATION, bearer(&patient))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["appointment"]["status"], json!("cancelled"));

    // Cancelled is terminal; a second cancel conflicts.
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{appointment_id}/cancel"))
                .header(header::AUTHORIZATION, bearer(&patient))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn reschedule_endpoint_moves_the_appointment() {
    let state = test_state();
    let patient = TestUser::patient("patient@example.com");
    let doctor_id = Uuid::new_v4();
    let old_slot = seed_slot(&state, doctor_id, 1).await;
    let new_start = Utc::now() + Duration::hours(96);
    let new_slot = state
        .store
        .create_slots(vec![NewSlot {
            doctor_id,
            start_time: new_start,
            end_time: new_start + Duration::minutes(30),
            capacity: 1,
            session_type: SessionType::Consultation,
            rule_id: None,
        }])
        .await
        .unwrap()
        .pop()
        .unwrap();
    let app = appointment_routes(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::AUTHORIZATION, bearer(&patient))
                .header(header::CONTENT_TYPE, "application/json")
                .body(book_body(old_slot.id))
                .unwrap(),
        )
        .await
        .unwrap();
    let body = read_json(response).await;
    let appointment_id = body["appointment"]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/{appointment_id}/reschedule"))
                .header(header::AUTHORIZATION, bearer(&patient))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "new_slot_id": new_slot.id }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(
        body["appointment"]["slot_id"],
        json!(new_slot.id.to_string())
    );
}

#[tokio::test]
async fn complete_endpoint_is_doctor_only() {
    let state = test_state();
    let patient = TestUser::patient("patient@example.com");
    let doctor = TestUser::doctor("doctor@example.com");
    let slot = seed_slot(&state, doctor.id, 1).await;
    let app = appointment_routes(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::AUTHORIZATION, bearer(&patient))
                .header(header::CONTENT_TYPE, "application/json")
                .body(book_body(slot.id))
                .unwrap(),
        )
        .await
        .unwrap();
    let body = read_json(response).await;
    let appointment_id = body["appointment"]["id"].as_str().unwrap().to_string();

    // The patient cannot complete their own appointment.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{appointment_id}/complete"))
                .header(header::AUTHORIZATION, bearer(&patient))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{appointment_id}/complete"))
                .header(header::AUTHORIZATION, bearer(&doctor))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["appointment"]["status"], json!("completed"));
}
