// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_database::{
    AppState, AppointmentFilter, AppointmentPatch, BookingStore, NewAppointment,
};
use shared_models::auth::Identity;
use shared_models::booking::{Appointment, AppointmentStatus, AvailabilitySlot};
use shared_utils::clock::{Clock, SystemClock};

use crate::models::{AppointmentError, BookAppointmentRequest};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Rescheduling is only allowed while the current slot is still at least
/// this far away.
const RESCHEDULE_CUTOFF_HOURS: i64 = 24;

/// Orchestrates book/cancel/reschedule/complete as all-or-nothing units.
///
/// Race safety rests on a single storage primitive: `try_reserve`, the
/// atomic bounded increment of a slot's occupancy. It is always the first
/// mutation of an operation, so a lost race costs nothing, and any failure
/// in a later step unwinds the reservation before the error surfaces.
/// Nothing here retries; conflicts go back to the caller.
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    lifecycle_service: AppointmentLifecycleService,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            lifecycle_service: AppointmentLifecycleService::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(state: &AppState, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::clone(&state.store),
            lifecycle_service: AppointmentLifecycleService::new(),
            clock,
        }
    }

    /// Book a patient into a slot.
    pub async fn book_appointment(
        &self,
        patient_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking appointment for patient {} on slot {}",
            patient_id, request.slot_id
        );

        if request.complaint.trim().is_empty() {
            return Err(AppointmentError::ValidationError(
                "complaint must not be empty".to_string(),
            ));
        }
        if matches!(request.recorded_age, Some(age) if age < 0) {
            return Err(AppointmentError::ValidationError(
                "recorded_age must not be negative".to_string(),
            ));
        }
        if matches!(request.weight, Some(weight) if !weight.is_finite() || weight < 0.0) {
            return Err(AppointmentError::ValidationError(
                "weight must be a non-negative number".to_string(),
            ));
        }

        let slot = self
            .store
            .find_slot(request.slot_id)
            .await?
            .ok_or(AppointmentError::SlotNotFound)?;

        if slot.has_started(self.clock.now()) {
            return Err(AppointmentError::SlotAlreadyStarted);
        }

        // The race-safety core: capacity test and increment in one atomic
        // storage call. Losing it means the slot filled up; no retry.
        if !self.store.try_reserve(slot.id).await? {
            warn!("Slot {} full, rejecting booking", slot.id);
            return Err(AppointmentError::SlotFull);
        }

        match self.create_appointment_record(patient_id, &slot, request).await {
            Ok(appointment) => {
                info!(
                    "Appointment {} booked on slot {} for patient {}",
                    appointment.id, slot.id, patient_id
                );
                Ok(appointment)
            }
            Err(err) => {
                // Unwind the reservation so the failed booking never shows
                // up in the slot's occupancy.
                if let Err(release_err) = self.store.release(slot.id).await {
                    error!(
                        "Failed to release slot {} after booking failure: {}",
                        slot.id, release_err
                    );
                }
                Err(err)
            }
        }
    }

    /// Cancel a booked appointment, freeing its slot capacity.
    pub async fn cancel_appointment(
        &self,
        patient_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let appointment = self
            .store
            .find_appointment(AppointmentFilter::owned_by_patient(appointment_id, patient_id))
            .await?
            .ok_or(AppointmentError::NotFound)?;

        self.lifecycle_service
            .validate_status_transition(&appointment.status, &AppointmentStatus::Cancelled)?;

        let cancelled = self
            .store
            .update_appointment(
                appointment.id,
                AppointmentPatch {
                    status: Some(AppointmentStatus::Cancelled),
                    ..AppointmentPatch::default()
                },
            )
            .await?;

        if let Err(release_err) = self.store.release(appointment.slot_id).await {
            // Put the row back so status stays consistent with occupancy.
            error!(
                "Failed to release slot {} on cancel: {}",
                appointment.slot_id, release_err
            );
            if let Err(revert_err) = self
                .store
                .update_appointment(
                    appointment.id,
                    AppointmentPatch {
                        status: Some(AppointmentStatus::Booked),
                        ..AppointmentPatch::default()
                    },
                )
                .await
            {
                error!(
                    "Failed to revert appointment {} after release failure: {}",
                    appointment.id, revert_err
                );
            }
            return Err(release_err.into());
        }

        info!("Appointment {} cancelled", appointment.id);
        Ok(cancelled)
    }

    /// Move a booked appointment to another slot of the same doctor.
    pub async fn reschedule_appointment(
        &self,
        patient_id: Uuid,
        appointment_id: Uuid,
        new_slot_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Rescheduling appointment {} to slot {}",
            appointment_id, new_slot_id
        );

        let appointment = self
            .store
            .find_appointment(AppointmentFilter::owned_by_patient(appointment_id, patient_id))
            .await?
            .ok_or(AppointmentError::NotFound)?;

        // Reschedule is a same-state transition; still gated on Booked.
        self.lifecycle_service
            .validate_status_transition(&appointment.status, &AppointmentStatus::Booked)?;

        let old_slot = self
            .store
            .find_slot(appointment.slot_id)
            .await?
            .ok_or(AppointmentError::SlotNotFound)?;

        let now = self.clock.now();

        // The cutoff is judged against the slot being moved away from.
        if old_slot.start_time <= now + Duration::hours(RESCHEDULE_CUTOFF_HOURS) {
            return Err(AppointmentError::TooCloseToReschedule);
        }

        let new_slot = self
            .store
            .find_slot(new_slot_id)
            .await?
            .ok_or(AppointmentError::SlotNotFound)?;

        if new_slot.has_started(now) {
            return Err(AppointmentError::SlotAlreadyStarted);
        }
        if new_slot.doctor_id != appointment.doctor_id {
            return Err(AppointmentError::CrossDoctorReschedule);
        }

        // Same atomic gate as booking, against the target slot.
        if !self.store.try_reserve(new_slot.id).await? {
            warn!("New slot {} full, rejecting reschedule", new_slot.id);
            return Err(AppointmentError::NewSlotFull);
        }

        match self.apply_reschedule(&appointment, &new_slot).await {
            Ok(updated) => {
                info!(
                    "Appointment {} rescheduled from slot {} to slot {}",
                    appointment.id, old_slot.id, new_slot.id
                );
                Ok(updated)
            }
            Err(err) => {
                if let Err(release_err) = self.store.release(new_slot.id).await {
                    error!(
                        "Failed to release slot {} after reschedule failure: {}",
                        new_slot.id, release_err
                    );
                }
                Err(err)
            }
        }
    }

    /// Mark a booked appointment completed. Doctor-scoped; the slot's
    /// occupancy is left alone since the visit already happened.
    pub async fn mark_completed(
        &self,
        doctor_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Completing appointment: {}", appointment_id);

        let appointment = self
            .store
            .find_appointment(AppointmentFilter::owned_by_doctor(appointment_id, doctor_id))
            .await?
            .ok_or(AppointmentError::NotFound)?;

        self.lifecycle_service
            .validate_status_transition(&appointment.status, &AppointmentStatus::Completed)?;

        let completed = self
            .store
            .update_appointment(
                appointment.id,
                AppointmentPatch {
                    status: Some(AppointmentStatus::Completed),
                    ..AppointmentPatch::default()
                },
            )
            .await?;

        info!("Appointment {} marked completed", appointment.id);
        Ok(completed)
    }

    /// Fetch an appointment scoped to the caller: patients see their own,
    /// doctors see appointments booked with them.
    pub async fn get_appointment(
        &self,
        identity: &Identity,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let filter = if identity.is_doctor() {
            AppointmentFilter::owned_by_doctor(appointment_id, identity.subject_id)
        } else {
            AppointmentFilter::owned_by_patient(appointment_id, identity.subject_id)
        };

        self.store
            .find_appointment(filter)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    async fn create_appointment_record(
        &self,
        patient_id: Uuid,
        slot: &AvailabilitySlot,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .store
            .create_appointment(NewAppointment {
                patient_id,
                doctor_id: slot.doctor_id,
                slot_id: slot.id,
                appointment_date: slot.appointment_date(),
                appointment_time: slot.appointment_time(),
                consulting_type: request.consulting_type,
                complaint: request.complaint,
                visit_type: request.visit_type,
                weight: request.weight,
                recorded_age: request.recorded_age,
            })
            .await?;
        Ok(appointment)
    }

    async fn apply_reschedule(
        &self,
        appointment: &Appointment,
        new_slot: &AvailabilitySlot,
    ) -> Result<Appointment, AppointmentError> {
        self.store.release(appointment.slot_id).await?;

        match self
            .store
            .update_appointment(
                appointment.id,
                AppointmentPatch {
                    status: Some(AppointmentStatus::Booked),
                    slot_id: Some(new_slot.id),
                    doctor_id: Some(new_slot.doctor_id),
                    appointment_date: Some(new_slot.appointment_date()),
                    appointment_time: Some(new_slot.appointment_time()),
                },
            )
            .await
        {
            Ok(updated) => Ok(updated),
            Err(err) => {
                // Give the old slot its occupancy back; it cannot be full
                // since we just released it.
                if !matches!(self.store.try_reserve(appointment.slot_id).await, Ok(true)) {
                    error!(
                        "Failed to restore occupancy on slot {} after reschedule failure",
                        appointment.slot_id
                    );
                }
                Err(err.into())
            }
        }
    }
}
