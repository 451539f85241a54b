// libs/shared/models/src/booking.rs
//
// Core persisted records shared by the availability and appointment cells.
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// SLOTS
// ==============================================================================

/// A bookable time window on a doctor's calendar.
///
/// Invariants maintained by the storage layer: `0 <= booked_count <= capacity`
/// and `end_time > start_time`. `rule_id` links back to the recurring rule
/// that materialized the slot; ad-hoc slots carry `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub booked_count: i32,
    pub session_type: SessionType,
    pub rule_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AvailabilitySlot {
    pub fn has_spare_capacity(&self) -> bool {
        self.booked_count < self.capacity
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now
    }

    pub fn appointment_date(&self) -> NaiveDate {
        self.start_time.date_naive()
    }

    pub fn appointment_time(&self) -> NaiveTime {
        self.start_time.time()
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Consultation,
    FollowUp,
    WalkIn,
    Telemedicine,
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Consultation => write!(f, "consultation"),
            SessionType::FollowUp => write!(f, "follow_up"),
            SessionType::WalkIn => write!(f, "walk_in"),
            SessionType::Telemedicine => write!(f, "telemedicine"),
        }
    }
}

// ==============================================================================
// RECURRING RULES
// ==============================================================================

/// A template that expands deterministically into concrete slots.
///
/// `weekday_mask` is a 7-bit set with Sunday at bit 0. Stream rules emit one
/// continuously-refillable slot per matching day (`end_min` unused); wave
/// rules slice `[start_min, end_min)` into consecutive `duration_min` slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringRule {
    pub id: Uuid,
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
    pub created_at: DateTime<Utc>,
}

impl RecurringRule {
    /// Whether this rule's weekday mask selects the given date.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        let bit = date.weekday().num_days_from_sunday();
        self.weekday_mask & (1u8 << bit) != 0
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_id: Uuid,
    pub status: AppointmentStatus,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub consulting_type: ConsultingType,
    pub complaint: String,
    pub visit_type: String,
    pub weight: Option<f32>,
    pub recorded_age: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Cancelled and completed appointments never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Booked => write!(f, "booked"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultingType {
    InPerson,
    Virtual,
}

impl fmt::Display for ConsultingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultingType::InPerson => write!(f, "in_person"),
            ConsultingType::Virtual => write!(f, "virtual"),
        }
    }
}
