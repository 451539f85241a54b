pub mod expander;
pub mod slots;

pub use expander::RecurringRuleExpander;
pub use slots::AvailabilityService;
