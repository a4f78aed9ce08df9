mod allocator;
mod error;
mod index;
mod queries;
pub mod slots;
#[cfg(test)]
mod tests;

pub use allocator::available_starts;
pub use error::EngineError;
pub use index::DayState;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use ulid::Ulid;

use crate::catalog::ServiceCatalog;
use crate::limits::BOOKING_HORIZON_DAYS;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::observability::DAYS_CACHED;
use crate::store::Store;

pub type SharedDay = Arc<RwLock<DayState>>;

/// Slot availability and booking allocation for a single provider.
///
/// The day cache is derived state: any day can be dropped and rebuilt from
/// the schedule, the booking ledger and the block set. Those two are the
/// records of truth and are mirrored in the [`Store`].
pub struct Engine {
    pub(super) schedule: Schedule,
    pub(super) catalog: ServiceCatalog,
    pub(super) days: DashMap<NaiveDate, SharedDay>,
    pub(super) bookings: DashMap<Ulid, Booking>,
    pub(super) bookings_by_day: DashMap<NaiveDate, Vec<Ulid>>,
    pub(super) blocks: DashMap<NaiveDate, BTreeSet<SlotId>>,
    pub(super) store: Arc<dyn Store>,
    pub notify: Arc<NotifyHub>,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl Engine {
    /// Build the ledger and the block set from everything the store holds.
    pub async fn open(
        schedule: Schedule,
        catalog: ServiceCatalog,
        store: Arc<dyn Store>,
        notify: Arc<NotifyHub>,
    ) -> Result<Self, EngineError> {
        let snapshot = store.load().await?;

        let engine = Self {
            schedule,
            catalog,
            days: DashMap::new(),
            bookings: DashMap::new(),
            bookings_by_day: DashMap::new(),
            blocks: DashMap::new(),
            store,
            notify,
            clock: local_now,
        };
        for booking in &snapshot.bookings {
            engine.record_booking(booking);
        }
        for slot in snapshot.blocks {
            engine.blocks.entry(slot.day()).or_default().insert(slot);
        }

        tracing::info!(
            "engine loaded: {} bookings, {} blocked slots",
            engine.bookings.len(),
            engine.blocks.iter().map(|e| e.value().len()).sum::<usize>()
        );
        Ok(engine)
    }

    /// Replace the wall clock. Past/future checks and timestamps use it.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    /// Days more than [`BOOKING_HORIZON_DAYS`] ahead are refused so the day
    /// cache cannot grow without bound.
    pub(super) fn check_horizon(&self, day: NaiveDate) -> Result<(), EngineError> {
        let last = self.now().date() + Duration::days(BOOKING_HORIZON_DAYS);
        if day > last {
            return Err(EngineError::LimitExceeded("day beyond booking horizon"));
        }
        Ok(())
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    /// Cached state of `day`, generated on first use. Lookup and generation
    /// happen under the map's entry lock, so a day is generated at most once
    /// per cache lifetime.
    pub(super) fn day(&self, day: NaiveDate) -> SharedDay {
        let mut generated = false;
        let shared = self
            .days
            .entry(day)
            .or_insert_with(|| {
                generated = true;
                Arc::new(RwLock::new(self.build_day(day)))
            })
            .value()
            .clone();
        if generated {
            metrics::gauge!(DAYS_CACHED).set(self.days.len() as f64);
        }
        shared
    }

    fn build_day(&self, day: NaiveDate) -> DayState {
        let mut state = DayState::new(day, slots::generate(day, &self.schedule));
        if let Some(ids) = self.bookings_by_day.get(&day) {
            for id in ids.iter() {
                if let Some(b) = self.bookings.get(id) {
                    state.apply_booking(b.value());
                }
            }
        }
        if let Some(blocked) = self.blocks.get(&day) {
            for id in blocked.iter() {
                // Blocks outside the current schedule are kept but not shown.
                let _ = state.set_blocked(*id, true);
            }
        }
        state
    }

    pub(super) async fn read_day(&self, day: NaiveDate) -> OwnedRwLockReadGuard<DayState> {
        loop {
            let guard = self.day(day).read_owned().await;
            if !guard.retired {
                return guard;
            }
        }
    }

    /// Write lock on a live day. A day retired by eviction while we waited is
    /// re-fetched, which regenerates it from the ledger.
    pub(super) async fn write_day(&self, day: NaiveDate) -> OwnedRwLockWriteGuard<DayState> {
        loop {
            let guard = self.day(day).write_owned().await;
            if !guard.retired {
                return guard;
            }
        }
    }

    /// Ledger insert. Callers hold the day's write lock, or own the engine
    /// exclusively during `open`.
    pub(super) fn record_booking(&self, booking: &Booking) {
        self.bookings.insert(booking.id, booking.clone());
        self.bookings_by_day
            .entry(booking.day())
            .or_default()
            .push(booking.id);
    }
}
