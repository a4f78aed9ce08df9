//! Persistence behind the engine.
//!
//! The engine only needs three things from a backing store: read everything
//! at startup, append a new booking, and set or clear the provider block of a
//! single slot. Anything that can do that durably can sit behind [`Store`].

mod memory;
mod wal;

pub use memory::MemoryStore;
pub use wal::{Replay, Wal, WalStore};

use std::io;

use async_trait::async_trait;

use crate::model::{Booking, SlotId, Snapshot};

#[async_trait]
pub trait Store: Send + Sync {
    /// Full persisted state.
    async fn load(&self) -> io::Result<Snapshot>;

    /// Durably record a new booking. On `Err` nothing was recorded.
    async fn append_booking(&self, booking: &Booking) -> io::Result<()>;

    /// Durably set (`blocked = true`) or clear the block on one slot.
    async fn put_block(&self, slot: SlotId, blocked: bool) -> io::Result<()>;

    /// Rewrite storage to the minimal form of the current state.
    async fn compact(&self) -> io::Result<()> {
        Ok(())
    }

    /// Writes since the last compaction; stores that never compact report 0.
    async fn appends_since_compact(&self) -> u64 {
        0
    }
}
