/// Max bytes in a single client field (name, email, street, ...).
pub const MAX_FIELD_LEN: usize = 200;

/// Max bytes in free-form booking notes.
pub const MAX_NOTES_LEN: usize = 2_000;

/// Max bytes in a booking search term.
pub const MAX_SEARCH_LEN: usize = 100;

/// Postal codes are stored as digits only and must have exactly this many.
pub const POSTAL_CODE_DIGITS: usize = 8;

/// Notices kept in the recent-history feed.
pub const NOTICE_HISTORY: usize = 256;

/// Smallest allowed slot granularity in minutes.
pub const MIN_SLOT_MINUTES: u32 = 5;

/// Largest allowed service duration in minutes (one full day).
pub const MAX_SERVICE_MINUTES: i64 = 24 * 60;

/// Max services in the catalog.
pub const MAX_SERVICES: usize = 1_000;

/// How many days ahead of today the calendar can be read or booked.
pub const BOOKING_HORIZON_DAYS: i64 = 366;
