use chrono::NaiveDate;

use crate::model::{Schedule, SlotId, TimeSlot};

/// Canonical slots of `day`: one per granularity step from opening time. A
/// slot that would end after closing time is dropped, never truncated. All
/// slots come back free and unblocked. A day whose hours cannot be
/// represented has no slots.
pub fn generate(day: NaiveDate, schedule: &Schedule) -> Vec<TimeSlot> {
    let step = schedule.slot_length();
    let (Some(mut start), Some(close)) = (schedule.opens_at(day), schedule.closes_at(day)) else {
        return Vec::new();
    };
    let mut slots = Vec::new();
    while let Some(end) = start.checked_add_signed(step).filter(|end| *end <= close) {
        slots.push(TimeSlot {
            id: SlotId::new(start),
            start,
            end,
            is_booked: false,
            is_blocked: false,
        });
        start = end;
    }
    slots
}
