// libs/shared/database/src/port.rs
//
// Storage contract consumed by the booking and availability cells. Any
// backend works as long as `try_reserve` is a single atomic test-and-set:
// the increment must only happen while `booked_count < capacity`, checked
// and applied in one step. Everything else is plain point/range access.
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use shared_models::booking::{
    Appointment, AppointmentStatus, AvailabilitySlot, ConsultingType, RecurringRule, SessionType,
};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Backend(String),
}

/// Slot spec before persistence, as produced by rule expansion or ad-hoc
/// creation. `booked_count` always starts at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSlot {
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub session_type: SessionType,
    pub rule_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewRecurringRule {
    pub doctor_id: Uuid,
    pub weekday_mask: u8,
    pub is_stream: bool,
    pub start_min: i32,
    pub end_min: Option<i32>,
    pub duration_min: i32,
    pub capacity: i32,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub session_type: SessionType,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub consulting_type: ConsultingType,
    pub complaint: String,
    pub visit_type: String,
    pub weight: Option<f32>,
    pub recorded_age: Option<i32>,
}

/// Partial update applied to an existing appointment row. Reschedule
/// repoints the slot and time fields; cancel/complete only touch status.
#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub status: Option<AppointmentStatus>,
    pub slot_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<NaiveTime>,
}

/// Point-lookup filter. Ownership scoping (patient or doctor) happens in
/// the same query so "absent" and "not owned" are indistinguishable to the
/// caller, both surfacing as a miss.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

impl AppointmentFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn owned_by_patient(id: Uuid, patient_id: Uuid) -> Self {
        Self {
            id: Some(id),
            patient_id: Some(patient_id),
            doctor_id: None,
        }
    }

    pub fn owned_by_doctor(id: Uuid, doctor_id: Uuid) -> Self {
        Self {
            id: Some(id),
            patient_id: None,
            doctor_id: Some(doctor_id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SlotFilter {
    pub doctor_id: Option<Uuid>,
    pub starts_after: Option<DateTime<Utc>>,
    pub starts_before: Option<DateTime<Utc>>,
    pub only_open: bool,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_slot(&self, slot_id: Uuid) -> Result<Option<AvailabilitySlot>, StoreError>;

    /// Range query over slots, ordered by start time ascending.
    async fn list_slots(&self, filter: SlotFilter) -> Result<Vec<AvailabilitySlot>, StoreError>;

    async fn create_slots(&self, batch: Vec<NewSlot>) -> Result<Vec<AvailabilitySlot>, StoreError>;

    /// Atomic conditional increment: bump `booked_count` by one only while
    /// it is below capacity. Returns false (without modifying anything)
    /// when the slot is full. `StoreError::NotFound` if the slot is gone.
    async fn try_reserve(&self, slot_id: Uuid) -> Result<bool, StoreError>;

    /// Decrement `booked_count` by one, flooring at zero.
    async fn release(&self, slot_id: Uuid) -> Result<(), StoreError>;

    async fn create_rule(&self, rule: NewRecurringRule) -> Result<RecurringRule, StoreError>;

    async fn find_appointment(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Option<Appointment>, StoreError>;

    async fn create_appointment(
        &self,
        fields: NewAppointment,
    ) -> Result<Appointment, StoreError>;

    async fn update_appointment(
        &self,
        appointment_id: Uuid,
        patch: AppointmentPatch,
    ) -> Result<Appointment, StoreError>;
}
