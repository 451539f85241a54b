// libs/availability-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::booking::SessionType;

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Ad-hoc slot creation; the caller's identity supplies the doctor id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub start_time: DateTime<Utc>,
    pub duration_min: i32,
    pub session_type: SessionType,
    pub capacity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecurringRuleRequest {
    /// Weekdays the rule fires on, 0 = Sunday through 6 = Saturday.
    pub weekdays: Vec<u8>,
    pub is_stream: bool,
    pub start_min: i32,
    /// Required for wave rules, ignored for stream rules.
    pub end_min: Option<i32>,
    pub duration_min: i32,
    pub capacity: i32,
    pub valid_from: NaiveDate,
    /// Defaults to `valid_from` + 30 days when omitted.
    pub valid_until: Option<NaiveDate>,
    pub session_type: SessionType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsQuery {
    pub doctor_id: Uuid,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Slot overlaps an existing slot for this doctor")]
    OverlappingSlot,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
