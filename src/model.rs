use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Business hours and slot granularity. All times are in the single implicit
/// local zone; no timezone is ever attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub open_hour: u32,
    pub close_hour: u32,
    pub slot_minutes: u32,
}

impl Schedule {
    pub fn new(open_hour: u32, close_hour: u32, slot_minutes: u32) -> Self {
        debug_assert!(open_hour < close_hour && close_hour <= 24);
        debug_assert!(slot_minutes > 0);
        Self {
            open_hour,
            close_hour,
            slot_minutes,
        }
    }

    pub fn slot_length(&self) -> Duration {
        Duration::minutes(i64::from(self.slot_minutes))
    }

    /// Opening instant, or `None` when it falls outside the representable
    /// calendar.
    pub fn opens_at(&self, day: NaiveDate) -> Option<NaiveDateTime> {
        day.and_time(NaiveTime::MIN)
            .checked_add_signed(Duration::hours(i64::from(self.open_hour)))
    }

    /// Closing instant. `close_hour = 24` is midnight of the next day.
    pub fn closes_at(&self, day: NaiveDate) -> Option<NaiveDateTime> {
        day.and_time(NaiveTime::MIN)
            .checked_add_signed(Duration::hours(i64::from(self.close_hour)))
    }

    /// Number of consecutive slots a service of `duration_minutes` occupies.
    /// Callers validate `duration_minutes > 0` first.
    pub fn slots_needed(&self, duration_minutes: i64) -> usize {
        let g = i64::from(self.slot_minutes);
        ((duration_minutes + g - 1) / g) as usize
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new(8, 18, 30)
    }
}

/// Parse a local timestamp. Accepts `T` or a space between date and time,
/// with or without seconds.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];
    let s = s.trim();
    FORMATS[1..]
        .iter()
        .fold(NaiveDateTime::parse_from_str(s, FORMATS[0]), |acc, fmt| {
            acc.or_else(|_| NaiveDateTime::parse_from_str(s, fmt))
        })
}

pub fn parse_day(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
}

/// Slot identity: the slot's start. Unique per day for a single provider in a
/// single zone. Text form is `YYYY-MM-DDTHH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(NaiveDateTime);

impl SlotId {
    pub fn new(start: NaiveDateTime) -> Self {
        Self(start)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.0
    }

    pub fn day(&self) -> NaiveDate {
        self.0.date()
    }

    /// `HH:MM` part, as shown to providers.
    pub fn clock(&self) -> String {
        self.0.format("%H:%M").to_string()
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M"))
    }
}

impl FromStr for SlotId {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_timestamp(s).map(SlotId)
    }
}

/// One schedulable interval `[start, end)` of a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: SlotId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Covered by a committed booking. Never set by provider action.
    pub is_booked: bool,
    /// Explicitly closed by the provider.
    pub is_blocked: bool,
}

impl TimeSlot {
    pub fn is_free(&self) -> bool {
        !self.is_booked && !self.is_blocked
    }
}

/// A bookable service. Reference data; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub duration_minutes: i64,
    pub base_price: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Digits only.
    pub zip_code: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.street, self.number)?;
        if let Some(c) = self.complement.as_deref().filter(|c| !c.is_empty()) {
            write!(f, " ({c})")?;
        }
        write!(
            f,
            " - {}, {}/{} {}",
            self.neighborhood, self.city, self.state, self.zip_code
        )
    }
}

/// What a client submits to book a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDetails {
    pub service_id: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub address: Address,
    pub start_time: NaiveDateTime,
    pub notes: Option<String>,
}

/// A committed reservation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub service_id: String,
    pub service_name: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub address: Address,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Booking {
    pub fn day(&self) -> NaiveDate {
        self.start_time.date()
    }

    /// True if `t` falls in `[start_time, end_time)`.
    pub fn covers(&self, t: NaiveDateTime) -> bool {
        self.start_time <= t && t < self.end_time
    }
}

/// Persistence record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated { booking: Booking },
    SlotBlocked { slot: SlotId },
    SlotUnblocked { slot: SlotId },
}

/// Everything a store holds: the booking list and the explicit block set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub bookings: Vec<Booking>,
    pub blocks: BTreeSet<SlotId>,
}

impl Snapshot {
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::BookingCreated { booking } => self.bookings.push(booking.clone()),
            Event::SlotBlocked { slot } => {
                self.blocks.insert(*slot);
            }
            Event::SlotUnblocked { slot } => {
                self.blocks.remove(slot);
            }
        }
    }

    /// Minimal event sequence that recreates this snapshot.
    pub fn to_events(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .bookings
            .iter()
            .map(|b| Event::BookingCreated { booking: b.clone() })
            .collect();
        events.extend(self.blocks.iter().map(|s| Event::SlotBlocked { slot: *s }));
        events
    }
}

// ── Query types ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookingView {
    All,
    #[default]
    Upcoming,
    Past,
}

impl FromStr for BookingView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(BookingView::All),
            "upcoming" => Ok(BookingView::Upcoming),
            "past" => Ok(BookingView::Past),
            other => Err(format!("unknown booking view: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub day: Option<NaiveDate>,
    pub view: BookingView,
    pub search: Option<String>,
}
