// libs/availability-cell/src/services/slots.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{AppState, BookingStore, NewRecurringRule, NewSlot, SlotFilter};
use shared_models::booking::{AvailabilitySlot, RecurringRule};
use shared_utils::clock::{Clock, SystemClock};

use crate::models::{AvailabilityError, CreateRecurringRuleRequest, CreateSlotRequest};
use crate::services::expander::RecurringRuleExpander;

const DEFAULT_VALIDITY_DAYS: i64 = 30;

pub struct AvailabilityService {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    horizon_days: i64,
}

impl AvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            clock: Arc::new(SystemClock),
            horizon_days: state.config.slot_horizon_days,
        }
    }

    pub fn with_clock(state: &AppState, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::clone(&state.store),
            clock,
            horizon_days: state.config.slot_horizon_days,
        }
    }

    /// Create a single ad-hoc slot for a doctor.
    pub async fn create_slot(
        &self,
        doctor_id: Uuid,
        request: CreateSlotRequest,
    ) -> Result<AvailabilitySlot, AvailabilityError> {
        debug!("Creating ad-hoc slot for doctor: {}", doctor_id);

        if request.duration_min < 1 {
            return Err(AvailabilityError::InvalidInput(
                "Slot duration must be at least one minute".to_string(),
            ));
        }
        if request.capacity < 1 {
            return Err(AvailabilityError::InvalidInput(
                "Slot capacity must be at least 1".to_string(),
            ));
        }

        let start_time = request.start_time;
        let end_time = start_time + Duration::minutes(request.duration_min as i64);

        // Reject a slot that intersects any existing slot of the same doctor.
        let existing = self
            .store
            .list_slots(SlotFilter {
                doctor_id: Some(doctor_id),
                ..SlotFilter::default()
            })
            .await?;
        if existing.iter().any(|slot| slot.overlaps(start_time, end_time)) {
            return Err(AvailabilityError::OverlappingSlot);
        }

        let mut created = self
            .store
            .create_slots(vec![NewSlot {
                doctor_id,
                start_time,
                end_time,
                capacity: request.capacity,
                session_type: request.session_type,
                rule_id: None,
            }])
            .await?;

        let slot = created.pop().ok_or_else(|| {
            AvailabilityError::Store(shared_database::StoreError::Backend(
                "slot batch came back empty".to_string(),
            ))
        })?;

        info!("Slot {} created for doctor {}", slot.id, doctor_id);
        Ok(slot)
    }

    /// Create a recurring rule and synchronously materialize its slots up
    /// to the configured horizon.
    pub async fn create_recurring_rule(
        &self,
        doctor_id: Uuid,
        request: CreateRecurringRuleRequest,
    ) -> Result<(RecurringRule, Vec<AvailabilitySlot>), AvailabilityError> {
        debug!("Creating recurring rule for doctor: {}", doctor_id);

        let weekday_mask = Self::weekday_mask(&request.weekdays)?;
        Self::validate_rule_shape(&request)?;

        let valid_until = match request.valid_until {
            Some(until) if until < request.valid_from => {
                return Err(AvailabilityError::InvalidInput(
                    "valid_until must not precede valid_from".to_string(),
                ));
            }
            Some(until) => until,
            None => request.valid_from + Duration::days(DEFAULT_VALIDITY_DAYS),
        };

        let rule = self
            .store
            .create_rule(NewRecurringRule {
                doctor_id,
                weekday_mask,
                is_stream: request.is_stream,
                start_min: request.start_min,
                end_min: if request.is_stream { None } else { request.end_min },
                duration_min: request.duration_min,
                capacity: request.capacity,
                valid_from: request.valid_from,
                valid_until,
                session_type: request.session_type,
            })
            .await?;

        let window_end = self.window_end();
        let specs = RecurringRuleExpander::expand(&rule, window_end);
        let slots = self.store.create_slots(specs).await?;

        info!(
            "Recurring rule {} created for doctor {}, {} slot(s) materialized",
            rule.id,
            doctor_id,
            slots.len()
        );
        Ok((rule, slots))
    }

    /// Future slots with spare capacity for a doctor, soonest first.
    pub async fn list_available_slots(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<AvailabilitySlot>, AvailabilityError> {
        let slots = self
            .store
            .list_slots(SlotFilter {
                doctor_id: Some(doctor_id),
                starts_after: Some(self.clock.now()),
                starts_before: None,
                only_open: true,
            })
            .await?;

        debug!("Found {} available slots for doctor {}", slots.len(), doctor_id);
        Ok(slots)
    }

    fn window_end(&self) -> NaiveDate {
        self.clock.now().date_naive() + Duration::days(self.horizon_days)
    }

    fn weekday_mask(weekdays: &[u8]) -> Result<u8, AvailabilityError> {
        if weekdays.is_empty() {
            return Err(AvailabilityError::InvalidInput(
                "At least one weekday is required".to_string(),
            ));
        }
        let mut mask = 0u8;
        for &day in weekdays {
            if day > 6 {
                return Err(AvailabilityError::InvalidInput(
                    "Weekdays must be between 0 (Sunday) and 6 (Saturday)".to_string(),
                ));
            }
            mask |= 1 << day;
        }
        Ok(mask)
    }

    fn validate_rule_shape(request: &CreateRecurringRuleRequest) -> Result<(), AvailabilityError> {
        if request.duration_min < 1 {
            return Err(AvailabilityError::InvalidInput(
                "duration_min must be at least 1".to_string(),
            ));
        }
        if request.capacity < 1 {
            return Err(AvailabilityError::InvalidInput(
                "capacity must be at least 1".to_string(),
            ));
        }
        if !(0..1440).contains(&request.start_min) {
            return Err(AvailabilityError::InvalidInput(
                "start_min must be a minute of day (0-1439)".to_string(),
            ));
        }

        if request.is_stream {
            return Ok(());
        }

        // Wave rules slice a window into fixed slots, so the window must
        // exist and divide evenly.
        let end_min = request.end_min.ok_or_else(|| {
            AvailabilityError::InvalidInput("end_min is required for wave rules".to_string())
        })?;
        if end_min <= request.start_min {
            return Err(AvailabilityError::InvalidInput(
                "end_min must be after start_min".to_string(),
            ));
        }
        if end_min > 1440 {
            return Err(AvailabilityError::InvalidInput(
                "end_min must not run past midnight (max 1440)".to_string(),
            ));
        }
        if (end_min - request.start_min) % request.duration_min != 0 {
            return Err(AvailabilityError::InvalidInput(
                "window length must be a multiple of duration_min".to_string(),
            ));
        }
        Ok(())
    }
}
