// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::Identity;
use shared_models::error::AppError;

use crate::models::{AppointmentError, BookAppointmentRequest, RescheduleAppointmentRequest};
use crate::services::booking::BookingService;

fn map_appointment_error(err: AppointmentError) -> AppError {
    match err {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
        AppointmentError::SlotAlreadyStarted => {
            AppError::Conflict("Slot already started".to_string())
        }
        AppointmentError::SlotFull => AppError::Conflict("Slot full".to_string()),
        AppointmentError::NewSlotFull => AppError::Conflict("New slot full".to_string()),
        AppointmentError::TooCloseToReschedule => {
            AppError::Conflict("Too close to reschedule".to_string())
        }
        AppointmentError::CrossDoctorReschedule => {
            AppError::Conflict("Cannot reschedule to a different doctor".to_string())
        }
        AppointmentError::InvalidStatusTransition(status) => AppError::Conflict(format!(
            "Appointment cannot be modified in current status: {}",
            status
        )),
        AppointmentError::ValidationError(msg) => AppError::BadRequest(msg),
        AppointmentError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

/// Book an appointment on a slot for the calling patient.
#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    if !identity.is_patient() {
        return Err(AppError::Auth(
            "Only patients can book appointments".to_string(),
        ));
    }

    let booking_service = BookingService::new(&state);
    let appointment = booking_service
        .book_appointment(identity.subject_id, request)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);
    let appointment = booking_service
        .get_appointment(&identity, appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointment)))
}

/// Cancel a booked appointment; frees the slot's capacity.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    if !identity.is_patient() {
        return Err(AppError::Auth(
            "Only the owning patient can cancel an appointment".to_string(),
        ));
    }

    let booking_service = BookingService::new(&state);
    let appointment = booking_service
        .cancel_appointment(identity.subject_id, appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled successfully"
    })))
}

/// Move an appointment to a new slot of the same doctor.
#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    if !identity.is_patient() {
        return Err(AppError::Auth(
            "Only the owning patient can reschedule an appointment".to_string(),
        ));
    }

    let booking_service = BookingService::new(&state);
    let appointment = booking_service
        .reschedule_appointment(identity.subject_id, appointment_id, request.new_slot_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

/// Mark an appointment completed; doctor-only.
#[axum::debug_handler]
pub async fn mark_completed(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    if !identity.is_doctor() {
        return Err(AppError::Auth(
            "Only doctors can complete appointments".to_string(),
        ));
    }

    let booking_service = BookingService::new(&state);
    let appointment = booking_service
        .mark_completed(identity.subject_id, appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment marked completed"
    })))
}
