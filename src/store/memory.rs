use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use crate::model::{Booking, Event, SlotId, Snapshot};

use super::Store;

/// Non-durable store. Used when no data directory is configured, and by tests,
/// which can make every write fail to exercise the engine's rollback paths.
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Snapshot>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing state.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            ..Self::default()
        }
    }

    /// Make subsequent writes fail (`true`) or succeed again (`false`).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn write(&self, event: Event) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::other("memory store: writes disabled"));
        }
        let mut snapshot = self
            .snapshot
            .lock()
            .map_err(|_| io::Error::other("memory store: poisoned lock"))?;
        snapshot.apply(&event);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load(&self) -> io::Result<Snapshot> {
        self.snapshot
            .lock()
            .map(|s| s.clone())
            .map_err(|_| io::Error::other("memory store: poisoned lock"))
    }

    async fn append_booking(&self, booking: &Booking) -> io::Result<()> {
        self.write(Event::BookingCreated {
            booking: booking.clone(),
        })
    }

    async fn put_block(&self, slot: SlotId, blocked: bool) -> io::Result<()> {
        let event = if blocked {
            Event::SlotBlocked { slot }
        } else {
            Event::SlotUnblocked { slot }
        };
        self.write(event)
    }
}
