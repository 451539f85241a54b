use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use uuid::Uuid;

use availability_cell::models::{AvailabilityError, CreateRecurringRuleRequest, CreateSlotRequest};
use availability_cell::services::slots::AvailabilityService;
use shared_database::{AppState, BookingStore, NewSlot, SlotFilter};
use shared_models::booking::SessionType;
use shared_utils::test_utils::{FixedClock, TestConfig};

fn test_state() -> Arc<AppState> {
    TestConfig::default().to_state()
}

fn slot_request(start_in_hours: i64) -> CreateSlotRequest {
    CreateSlotRequest {
        start_time: Utc::now() + Duration::hours(start_in_hours),
        duration_min: 30,
        session_type: SessionType::Consultation,
        capacity: 1,
    }
}

fn wave_rule_request() -> CreateRecurringRuleRequest {
    CreateRecurringRuleRequest {
        weekdays: vec![1, 2, 3, 4, 5],
        is_stream: false,
        start_min: 540,
        end_min: Some(720),
        duration_min: 30,
        capacity: 2,
        valid_from: Utc::now().date_naive(),
        valid_until: None,
        session_type: SessionType::Consultation,
    }
}

#[tokio::test]
async fn create_slot_persists_an_open_slot() {
    let state = test_state();
    let service = AvailabilityService::new(&state);
    let doctor_id = Uuid::new_v4();

    let request = slot_request(24);
    let expected_end = request.start_time + Duration::minutes(30);
    let slot = service.create_slot(doctor_id, request).await.unwrap();

    assert_eq!(slot.doctor_id, doctor_id);
    assert_eq!(slot.booked_count, 0);
    assert_eq!(slot.end_time, expected_end);
    assert_eq!(slot.rule_id, None);
}

#[tokio::test]
async fn create_slot_rejects_bad_input() {
    let state = test_state();
    let service = AvailabilityService::new(&state);
    let doctor_id = Uuid::new_v4();

    let mut request = slot_request(24);
    request.capacity = 0;
    assert_matches!(
        service.create_slot(doctor_id, request).await,
        Err(AvailabilityError::InvalidInput(_))
    );

    let mut request = slot_request(24);
    request.duration_min = 0;
    assert_matches!(
        service.create_slot(doctor_id, request).await,
        Err(AvailabilityError::InvalidInput(_))
    );
}

#[tokio::test]
async fn create_slot_rejects_overlap_with_existing_slot() {
    let state = test_state();
    let service = AvailabilityService::new(&state);
    let doctor_id = Uuid::new_v4();

    let request = slot_request(24);
    let mut overlapping = request.clone();
    overlapping.start_time = request.start_time + Duration::minutes(15);

    service.create_slot(doctor_id, request).await.unwrap();
    assert_matches!(
        service.create_slot(doctor_id, overlapping).await,
        Err(AvailabilityError::OverlappingSlot)
    );
}

#[tokio::test]
async fn overlap_check_is_per_doctor() {
    let state = test_state();
    let service = AvailabilityService::new(&state);

    let request = slot_request(24);
    service.create_slot(Uuid::new_v4(), request.clone()).await.unwrap();
    // Same window, different doctor: fine.
    service.create_slot(Uuid::new_v4(), request).await.unwrap();
}

#[tokio::test]
async fn recurring_rule_materializes_slots_synchronously() {
    let state = test_state();
    let service = AvailabilityService::new(&state);
    let doctor_id = Uuid::new_v4();

    let (rule, slots) = service
        .create_recurring_rule(doctor_id, wave_rule_request())
        .await
        .unwrap();

    assert!(!slots.is_empty());
    assert!(slots.iter().all(|s| s.rule_id == Some(rule.id)));
    assert!(slots.iter().all(|s| s.doctor_id == doctor_id));
    assert!(slots.iter().all(|s| s.booked_count == 0 && s.capacity == 2));

    // The slots are really in the store, not just in the response.
    let stored = state
        .store
        .list_slots(SlotFilter {
            doctor_id: Some(doctor_id),
            ..SlotFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(stored.len(), slots.len());
}

#[tokio::test]
async fn valid_until_defaults_to_thirty_days() {
    let state = test_state();
    let service = AvailabilityService::new(&state);

    let request = wave_rule_request();
    let valid_from = request.valid_from;
    let (rule, _) = service
        .create_recurring_rule(Uuid::new_v4(), request)
        .await
        .unwrap();

    assert_eq!(rule.valid_until, valid_from + Duration::days(30));
}

#[tokio::test]
async fn wave_rule_requires_a_clean_window() {
    let state = test_state();
    let service = AvailabilityService::new(&state);
    let doctor_id = Uuid::new_v4();

    let mut request = wave_rule_request();
    request.end_min = None;
    assert_matches!(
        service.create_recurring_rule(doctor_id, request).await,
        Err(AvailabilityError::InvalidInput(_))
    );

    let mut request = wave_rule_request();
    request.end_min = Some(730); // not a multiple of 30 past 540
    assert_matches!(
        service.create_recurring_rule(doctor_id, request).await,
        Err(AvailabilityError::InvalidInput(_))
    );

    let mut request = wave_rule_request();
    request.end_min = Some(500); // before start
    assert_matches!(
        service.create_recurring_rule(doctor_id, request).await,
        Err(AvailabilityError::InvalidInput(_))
    );

    let mut request = wave_rule_request();
    request.end_min = Some(100_000); // wave window may not spill past midnight
    assert_matches!(
        service.create_recurring_rule(doctor_id, request).await,
        Err(AvailabilityError::InvalidInput(_))
    );
}

#[tokio::test]
async fn wave_window_may_end_exactly_at_midnight() {
    let state = test_state();
    let service = AvailabilityService::new(&state);

    let mut request = wave_rule_request();
    request.start_min = 1380; // 23:00
    request.end_min = Some(1440);

    let (_, slots) = service
        .create_recurring_rule(Uuid::new_v4(), request)
        .await
        .unwrap();
    assert!(!slots.is_empty());
}

#[tokio::test]
async fn rule_weekdays_are_validated() {
    let state = test_state();
    let service = AvailabilityService::new(&state);
    let doctor_id = Uuid::new_v4();

    let mut request = wave_rule_request();
    request.weekdays = vec![];
    assert_matches!(
        service.create_recurring_rule(doctor_id, request).await,
        Err(AvailabilityError::InvalidInput(_))
    );

    let mut request = wave_rule_request();
    request.weekdays = vec![7];
    assert_matches!(
        service.create_recurring_rule(doctor_id, request).await,
        Err(AvailabilityError::InvalidInput(_))
    );
}

#[tokio::test]
async fn stream_rule_ignores_end_min() {
    let state = test_state();
    let service = AvailabilityService::new(&state);

    let mut request = wave_rule_request();
    request.is_stream = true;
    request.end_min = None;
    request.capacity = 8;

    let (rule, slots) = service
        .create_recurring_rule(Uuid::new_v4(), request)
        .await
        .unwrap();

    assert!(rule.is_stream);
    assert_eq!(rule.end_min, None);
    // One slot per matching day, each with the full stream capacity.
    assert!(slots.iter().all(|s| s.capacity == 8));
    let mut dates: Vec<_> = slots.iter().map(|s| s.start_time.date_naive()).collect();
    dates.dedup();
    assert_eq!(dates.len(), slots.len());
}

#[tokio::test]
async fn listing_hides_past_and_full_slots() {
    let state = test_state();
    let now = Utc::now();
    let service = AvailabilityService::with_clock(&state, Arc::new(FixedClock::new(now)));
    let doctor_id = Uuid::new_v4();

    let open_start = now + Duration::hours(24);
    let full_start = now + Duration::hours(48);
    let past_start = now - Duration::hours(1);
    let created = state
        .store
        .create_slots(vec![
            NewSlot {
                doctor_id,
                start_time: open_start,
                end_time: open_start + Duration::minutes(30),
                capacity: 1,
                session_type: SessionType::Consultation,
                rule_id: None,
            },
            NewSlot {
                doctor_id,
                start_time: full_start,
                end_time: full_start + Duration::minutes(30),
                capacity: 1,
                session_type: SessionType::Consultation,
                rule_id: None,
            },
            NewSlot {
                doctor_id,
                start_time: past_start,
                end_time: past_start + Duration::minutes(30),
                capacity: 1,
                session_type: SessionType::Consultation,
                rule_id: None,
            },
        ])
        .await
        .unwrap();

    assert!(state.store.try_reserve(created[1].id).await.unwrap());

    let listed = service.list_available_slots(doctor_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created[0].id);
}
