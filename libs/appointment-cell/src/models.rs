// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::booking::{AppointmentStatus, ConsultingType};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Booking request; the patient id comes from the verified identity, the
/// doctor and times are derived from the slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub slot_id: Uuid,
    pub consulting_type: ConsultingType,
    pub complaint: String,
    pub visit_type: String,
    pub weight: Option<f32>,
    pub recorded_age: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_slot_id: Uuid,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Slot already started")]
    SlotAlreadyStarted,

    #[error("Slot full")]
    SlotFull,

    #[error("New slot full")]
    NewSlotFull,

    #[error("Too close to reschedule")]
    TooCloseToReschedule,

    #[error("Cannot reschedule to a different doctor")]
    CrossDoctorReschedule,

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        AppointmentError::DatabaseError(err.to_string())
    }
}
