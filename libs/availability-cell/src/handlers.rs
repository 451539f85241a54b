// libs/availability-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::Identity;
use shared_models::error::AppError;

use crate::models::{
    AvailabilityError, AvailableSlotsQuery, CreateRecurringRuleRequest, CreateSlotRequest,
};
use crate::services::slots::AvailabilityService;

fn map_availability_error(err: AvailabilityError) -> AppError {
    match err {
        AvailabilityError::InvalidInput(msg) => AppError::BadRequest(msg),
        AvailabilityError::OverlappingSlot => {
            AppError::Conflict("Slot overlaps an existing slot".to_string())
        }
        AvailabilityError::Store(e) => AppError::Internal(e.to_string()),
    }
}

/// Create a single ad-hoc availability slot for the calling doctor.
#[axum::debug_handler]
pub async fn create_availability_slot(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    if !identity.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can publish availability".to_string(),
        ));
    }

    let service = AvailabilityService::new(&state);
    let slot = service
        .create_slot(identity.subject_id, request)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "slot": slot
    })))
}

/// Create a recurring rule; slots up to the horizon are materialized in
/// the same request.
#[axum::debug_handler]
pub async fn create_recurring_rule(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateRecurringRuleRequest>,
) -> Result<Json<Value>, AppError> {
    if !identity.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can publish availability".to_string(),
        ));
    }

    let service = AvailabilityService::new(&state);
    let (rule, slots) = service
        .create_recurring_rule(identity.subject_id, request)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "rule": rule,
        "slots_created": slots.len()
    })))
}

/// List a doctor's future slots with spare capacity.
#[axum::debug_handler]
pub async fn list_available_slots(
    State(state): State<Arc<AppState>>,
    Extension(_identity): Extension<Identity>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let slots = service
        .list_available_slots(query.doctor_id)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({ "slots": slots })))
}
