// libs/shared/database/src/memory.rs
//
// Reference backend for the `BookingStore` port. All tables live behind one
// `RwLock`; every primitive takes the write guard for mutations, so each
// call is atomic with respect to every other. `try_reserve` performs the
// capacity test and the increment under the same guard, which is the
// compare-and-swap the booking engine's race safety rests on.
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::booking::{Appointment, AppointmentStatus, AvailabilitySlot, RecurringRule};

use crate::port::{
    AppointmentFilter, AppointmentPatch, BookingStore, NewAppointment, NewRecurringRule, NewSlot,
    SlotFilter, StoreError,
};

#[derive(Default)]
struct Tables {
    slots: HashMap<Uuid, AvailabilitySlot>,
    rules: HashMap<Uuid, RecurringRule>,
    appointments: HashMap<Uuid, Appointment>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn find_slot(&self, slot_id: Uuid) -> Result<Option<AvailabilitySlot>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.slots.get(&slot_id).cloned())
    }

    async fn list_slots(&self, filter: SlotFilter) -> Result<Vec<AvailabilitySlot>, StoreError> {
        let tables = self.tables.read().await;
        let mut slots: Vec<AvailabilitySlot> = tables
            .slots
            .values()
            .filter(|slot| {
                filter.doctor_id.map_or(true, |id| slot.doctor_id == id)
                    && filter.starts_after.map_or(true, |t| slot.start_time > t)
                    && filter.starts_before.map_or(true, |t| slot.start_time < t)
                    && (!filter.only_open || slot.has_spare_capacity())
            })
            .cloned()
            .collect();
        slots.sort_by_key(|slot| slot.start_time);
        Ok(slots)
    }

    async fn create_slots(&self, batch: Vec<NewSlot>) -> Result<Vec<AvailabilitySlot>, StoreError> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let mut created = Vec::with_capacity(batch.len());
        for spec in batch {
            let slot = AvailabilitySlot {
                id: Uuid::new_v4(),
                doctor_id: spec.doctor_id,
                start_time: spec.start_time,
                end_time: spec.end_time,
                capacity: spec.capacity,
                booked_count: 0,
                session_type: spec.session_type,
                rule_id: spec.rule_id,
                created_at: now,
                updated_at: now,
            };
            tables.slots.insert(slot.id, slot.clone());
            created.push(slot);
        }
        debug!("Persisted {} slot(s)", created.len());
        Ok(created)
    }

    async fn try_reserve(&self, slot_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let slot = tables.slots.get_mut(&slot_id).ok_or(StoreError::NotFound)?;
        if slot.booked_count >= slot.capacity {
            return Ok(false);
        }
        slot.booked_count += 1;
        slot.updated_at = Utc::now();
        Ok(true)
    }

    async fn release(&self, slot_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let slot = tables.slots.get_mut(&slot_id).ok_or(StoreError::NotFound)?;
        if slot.booked_count > 0 {
            slot.booked_count -= 1;
        }
        slot.updated_at = Utc::now();
        Ok(())
    }

    async fn create_rule(&self, rule: NewRecurringRule) -> Result<RecurringRule, StoreError> {
        let mut tables = self.tables.write().await;
        let record = RecurringRule {
            id: Uuid::new_v4(),
            doctor_id: rule.doctor_id,
            weekday_mask: rule.weekday_mask,
            is_stream: rule.is_stream,
            start_min: rule.start_min,
            end_min: rule.end_min,
            duration_min: rule.duration_min,
            capacity: rule.capacity,
            valid_from: rule.valid_from,
            valid_until: rule.valid_until,
            session_type: rule.session_type,
            created_at: Utc::now(),
        };
        tables.rules.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_appointment(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Option<Appointment>, StoreError> {
        let tables = self.tables.read().await;
        let found = tables
            .appointments
            .values()
            .find(|appt| {
                filter.id.map_or(true, |id| appt.id == id)
                    && filter.patient_id.map_or(true, |id| appt.patient_id == id)
                    && filter.doctor_id.map_or(true, |id| appt.doctor_id == id)
            })
            .cloned();
        Ok(found)
    }

    async fn create_appointment(
        &self,
        fields: NewAppointment,
    ) -> Result<Appointment, StoreError> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: fields.patient_id,
            doctor_id: fields.doctor_id,
            slot_id: fields.slot_id,
            status: AppointmentStatus::Booked,
            appointment_date: fields.appointment_date,
            appointment_time: fields.appointment_time,
            consulting_type: fields.consulting_type,
            complaint: fields.complaint,
            visit_type: fields.visit_type,
            weight: fields.weight,
            recorded_age: fields.recorded_age,
            created_at: now,
            updated_at: now,
        };
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update_appointment(
        &self,
        appointment_id: Uuid,
        patch: AppointmentPatch,
    ) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.write().await;
        let appointment = tables
            .appointments
            .get_mut(&appointment_id)
            .ok_or(StoreError::NotFound)?;
        if let Some(status) = patch.status {
            appointment.status = status;
        }
        if let Some(slot_id) = patch.slot_id {
            appointment.slot_id = slot_id;
        }
        if let Some(doctor_id) = patch.doctor_id {
            appointment.doctor_id = doctor_id;
        }
        if let Some(date) = patch.appointment_date {
            appointment.appointment_date = date;
        }
        if let Some(time) = patch.appointment_time {
            appointment.appointment_time = time;
        }
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }
}
