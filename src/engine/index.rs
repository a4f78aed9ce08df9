use chrono::NaiveDate;

use crate::model::*;
use crate::notify::Notice;
use crate::observability::{BLOCK_CHANGES_TOTAL, DAYS_CACHED};

use super::{Engine, EngineError};

/// Slot state of one cached day. Slot order and ids never change after
/// generation; only the booked/blocked flags do.
#[derive(Debug)]
pub struct DayState {
    pub day: NaiveDate,
    slots: Vec<TimeSlot>,
    /// Set when the day is evicted from the cache. A writer holding a retired
    /// state must re-fetch the day.
    pub(super) retired: bool,
}

impl DayState {
    pub fn new(day: NaiveDate, slots: Vec<TimeSlot>) -> Self {
        Self {
            day,
            slots,
            retired: false,
        }
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    fn position(&self, id: SlotId) -> Option<usize> {
        self.slots.binary_search_by_key(&id, |s| s.id).ok()
    }

    pub fn slot(&self, id: SlotId) -> Option<&TimeSlot> {
        self.position(id).map(|i| &self.slots[i])
    }

    /// Mark every slot starting inside `[start_time, end_time)` as booked.
    pub fn apply_booking(&mut self, booking: &Booking) {
        for slot in &mut self.slots {
            if booking.covers(slot.start) {
                slot.is_booked = true;
            }
        }
    }

    /// Whether setting `blocked` on `id` changes anything. Booked slots
    /// reject the toggle in both directions.
    pub fn block_transition(&self, id: SlotId, blocked: bool) -> Result<bool, EngineError> {
        let slot = self.slot(id).ok_or(EngineError::SlotNotFound(id))?;
        if slot.is_booked {
            return Err(EngineError::InvalidTransition(id));
        }
        Ok(slot.is_blocked != blocked)
    }

    pub fn set_blocked(&mut self, id: SlotId, blocked: bool) -> Result<(), EngineError> {
        let i = self.position(id).ok_or(EngineError::SlotNotFound(id))?;
        if self.slots[i].is_booked {
            return Err(EngineError::InvalidTransition(id));
        }
        self.slots[i].is_blocked = blocked;
        Ok(())
    }
}

impl Engine {
    /// Slots of `day` with current flags, generating the day on first use.
    pub async fn get_day_slots(&self, day: NaiveDate) -> Result<Vec<TimeSlot>, EngineError> {
        self.check_horizon(day)?;
        let guard = self.read_day(day).await;
        Ok(guard.slots().to_vec())
    }

    /// Provider block toggle. Persists before the flag changes; re-setting
    /// the current value is a no-op that writes nothing.
    pub async fn set_blocked(&self, id: SlotId, blocked: bool) -> Result<TimeSlot, EngineError> {
        let day = id.day();
        self.check_horizon(day)?;
        let mut guard = self.write_day(day).await;

        if guard.block_transition(id, blocked)? {
            self.store.put_block(id, blocked).await?;
            if blocked {
                self.blocks.entry(day).or_default().insert(id);
            } else if let Some(mut set) = self.blocks.get_mut(&day) {
                set.remove(&id);
            }
            guard.set_blocked(id, blocked)?;

            let action = if blocked { "blocked" } else { "unblocked" };
            metrics::counter!(BLOCK_CHANGES_TOTAL, "action" => action).increment(1);
            tracing::info!("slot {id} {action}");
            self.notify.send(Notice {
                day,
                at: self.now(),
                message: format!("slot {} on {day} {action}", id.clock()),
            });
        }

        guard
            .slot(id)
            .cloned()
            .ok_or(EngineError::SlotNotFound(id))
    }

    /// Drop cached days strictly before `cutoff`. They regenerate from the
    /// ledger and the block set on next use. Returns how many were dropped.
    pub async fn evict_days_before(&self, cutoff: NaiveDate) -> usize {
        let stale: Vec<_> = self
            .days
            .iter()
            .filter(|e| *e.key() < cutoff)
            .map(|e| (*e.key(), e.value().clone()))
            .collect();

        let mut evicted = 0;
        for (day, shared) in stale {
            let mut guard = shared.write().await;
            if guard.retired {
                continue;
            }
            guard.retired = true;
            if self
                .days
                .remove_if(&day, |_, current| std::sync::Arc::ptr_eq(current, &shared))
                .is_some()
            {
                evicted += 1;
            }
        }
        metrics::gauge!(DAYS_CACHED).set(self.days.len() as f64);
        evicted
    }

    pub fn cached_days(&self) -> usize {
        self.days.len()
    }
}
