use chrono::{Duration, NaiveDate};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::notify::Notice;
use crate::observability::{BOOKINGS_CREATED_TOTAL, BOOKING_CONFLICTS_TOTAL};

use super::{Engine, EngineError};

/// Every slot that starts a run of `needed` consecutive free slots, in
/// order. Runs may end exactly at closing time.
pub fn available_starts(slots: &[TimeSlot], needed: usize) -> Vec<TimeSlot> {
    if needed == 0 {
        return Vec::new();
    }
    slots
        .windows(needed)
        .filter(|run| run.iter().all(TimeSlot::is_free))
        .map(|run| run[0].clone())
        .collect()
}

impl Engine {
    /// Candidate starts on `day` for the given service. Starts already in
    /// the past are never candidates.
    pub async fn find_available_starts(
        &self,
        day: NaiveDate,
        service_id: &str,
    ) -> Result<Vec<TimeSlot>, EngineError> {
        let service = self
            .catalog
            .get(service_id)
            .ok_or_else(|| EngineError::InvalidService(service_id.to_string()))?;
        let needed = self.slots_needed(service.duration_minutes)?;
        self.check_horizon(day)?;
        let now = self.now();
        let guard = self.read_day(day).await;
        let mut starts = available_starts(guard.slots(), needed);
        starts.retain(|s| s.start >= now);
        Ok(starts)
    }

    /// Book using the catalog duration of `details.service_id`.
    pub async fn book(&self, details: BookingDetails) -> Result<Booking, EngineError> {
        let duration = self
            .catalog
            .get(&details.service_id)
            .map(|s| s.duration_minutes)
            .ok_or_else(|| EngineError::InvalidService(details.service_id.clone()))?;
        self.create_booking(details, duration).await
    }

    /// Reserve `[start_time, start_time + duration_minutes)`. Under the day's
    /// write lock the start is checked against a fresh candidate set, then the
    /// booking is persisted, recorded in the ledger and its slots marked.
    /// Nothing changes unless all three happen.
    pub async fn create_booking(
        &self,
        details: BookingDetails,
        duration_minutes: i64,
    ) -> Result<Booking, EngineError> {
        let service = self
            .catalog
            .get(&details.service_id)
            .ok_or_else(|| EngineError::InvalidService(details.service_id.clone()))?;
        let needed = self.slots_needed(duration_minutes)?;
        let details = validate_details(details)?;

        let start = details.start_time;
        let day = start.date();
        self.check_horizon(day)?;
        if start < self.now() {
            metrics::counter!(BOOKING_CONFLICTS_TOTAL).increment(1);
            return Err(EngineError::SlotUnavailable(start));
        }
        let mut guard = self.write_day(day).await;

        let candidates = available_starts(guard.slots(), needed);
        if !candidates.iter().any(|s| s.start == start) {
            metrics::counter!(BOOKING_CONFLICTS_TOTAL).increment(1);
            tracing::debug!("booking rejected: {start} not a free start for {needed} slots");
            return Err(EngineError::SlotUnavailable(start));
        }

        let booking = Booking {
            id: Ulid::new(),
            service_id: service.id.clone(),
            service_name: service.name.clone(),
            client_name: details.client_name,
            client_email: details.client_email,
            client_phone: details.client_phone,
            address: details.address,
            start_time: start,
            end_time: start + Duration::minutes(duration_minutes),
            notes: details.notes,
            created_at: self.now(),
        };

        self.store.append_booking(&booking).await?;
        self.record_booking(&booking);
        guard.apply_booking(&booking);
        drop(guard);

        metrics::counter!(BOOKINGS_CREATED_TOTAL).increment(1);
        tracing::info!(
            "booking {} created: {} at {}",
            booking.id,
            booking.service_id,
            booking.start_time
        );
        self.notify.send(Notice {
            day,
            at: booking.created_at,
            message: format!(
                "new booking: {} with {} on {day} at {}",
                booking.service_name,
                booking.client_name,
                booking.start_time.format("%H:%M")
            ),
        });
        Ok(booking)
    }

    fn slots_needed(&self, duration_minutes: i64) -> Result<usize, EngineError> {
        if duration_minutes <= 0 {
            return Err(EngineError::InvalidDuration(duration_minutes));
        }
        if duration_minutes > MAX_SERVICE_MINUTES {
            return Err(EngineError::LimitExceeded("duration too long"));
        }
        Ok(self.schedule.slots_needed(duration_minutes))
    }
}

fn required(value: String, field: &'static str) -> Result<String, EngineError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(EngineError::MissingField(field));
    }
    if value.len() > MAX_FIELD_LEN {
        return Err(EngineError::LimitExceeded("field too long"));
    }
    Ok(value)
}

fn optional(value: Option<String>, max: usize) -> Result<Option<String>, EngineError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    if value.as_ref().is_some_and(|v| v.len() > max) {
        return Err(EngineError::LimitExceeded("field too long"));
    }
    Ok(value)
}

/// Trim and check client fields. Postal codes are reduced to their digits.
fn validate_details(d: BookingDetails) -> Result<BookingDetails, EngineError> {
    let client_email = required(d.client_email, "client_email")?;
    if !client_email.contains('@') {
        return Err(EngineError::LimitExceeded("malformed email address"));
    }

    let zip_code: String = required(d.address.zip_code, "zip_code")?
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    if zip_code.len() != POSTAL_CODE_DIGITS {
        return Err(EngineError::LimitExceeded("postal code must have 8 digits"));
    }

    Ok(BookingDetails {
        service_id: d.service_id,
        client_name: required(d.client_name, "client_name")?,
        client_email,
        client_phone: optional(d.client_phone, MAX_FIELD_LEN)?,
        address: Address {
            zip_code,
            street: required(d.address.street, "street")?,
            number: required(d.address.number, "number")?,
            complement: optional(d.address.complement, MAX_FIELD_LEN)?,
            neighborhood: required(d.address.neighborhood, "neighborhood")?,
            city: required(d.address.city, "city")?,
            state: required(d.address.state, "state")?,
        },
        start_time: d.start_time,
        notes: optional(d.notes, MAX_NOTES_LEN)?,
    })
}
