pub mod memory;
pub mod port;

pub use memory::MemoryStore;
pub use port::{
    AppointmentFilter, AppointmentPatch, BookingStore, NewAppointment, NewRecurringRule, NewSlot,
    SlotFilter, StoreError,
};

use std::sync::Arc;

use shared_config::AppConfig;

/// Shared state handed to every router: configuration plus the storage port.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn BookingStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn BookingStore>) -> Self {
        Self { config, store }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            config,
            store: Arc::new(MemoryStore::new()),
        }
    }
}
