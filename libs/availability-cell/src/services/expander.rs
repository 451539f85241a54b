// libs/availability-cell/src/services/expander.rs
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use shared_database::NewSlot;
use shared_models::booking::RecurringRule;

/// Turns a recurring rule into the concrete slot specs to persist.
///
/// Expansion is a pure function of the rule and the window end: the same
/// inputs always yield the same sequence, so a partially failed
/// materialization can simply be re-run. Rule validation (mask, duration
/// divisibility) happens before expansion, never inside it.
pub struct RecurringRuleExpander;

impl RecurringRuleExpander {
    /// Walk calendar dates from `valid_from` through the earlier of
    /// `valid_until` and `window_end`, inclusive, emitting slots for every
    /// date the weekday mask selects. A window with no matching dates
    /// yields an empty vec.
    pub fn expand(rule: &RecurringRule, window_end: NaiveDate) -> Vec<NewSlot> {
        let last_day = rule.valid_until.min(window_end);
        let mut slots = Vec::new();

        let mut date = rule.valid_from;
        while date <= last_day {
            if rule.applies_on(date) {
                if rule.is_stream {
                    // One continuously-refillable slot covering the window;
                    // capacity models concurrent throughput.
                    slots.push(Self::slot_spec(rule, date, rule.start_min));
                } else if let Some(end_min) = rule.end_min {
                    // Back-to-back fixed windows, stopping once the next
                    // slot would spill past the end of the window.
                    let mut current = rule.start_min;
                    while current + rule.duration_min <= end_min {
                        slots.push(Self::slot_spec(rule, date, current));
                        current += rule.duration_min;
                    }
                }
            }
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        slots
    }

    fn slot_spec(rule: &RecurringRule, date: NaiveDate, start_min: i32) -> NewSlot {
        let midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        let start_time = midnight + Duration::minutes(start_min as i64);
        NewSlot {
            doctor_id: rule.doctor_id,
            start_time,
            end_time: start_time + Duration::minutes(rule.duration_min as i64),
            capacity: rule.capacity,
            session_type: rule.session_type,
            rule_id: Some(rule.id),
        }
    }
}
