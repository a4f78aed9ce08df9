use chrono::{NaiveDate, NaiveDateTime};
use ulid::Ulid;

use crate::limits::MAX_SEARCH_LEN;
use crate::model::*;
use crate::notify::Notice;

use super::{Engine, EngineError};

impl Engine {
    pub fn services(&self) -> &[Service] {
        self.catalog.all()
    }

    pub fn get_booking(&self, id: &Ulid) -> Option<Booking> {
        self.bookings.get(id).map(|b| b.value().clone())
    }

    /// Bookings matching `filter`, judged against the current local time.
    pub fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, EngineError> {
        self.list_bookings_at(filter, self.now())
    }

    /// Upcoming sorts by start ascending, all and past by start descending.
    pub fn list_bookings_at(
        &self,
        filter: &BookingFilter,
        now: NaiveDateTime,
    ) -> Result<Vec<Booking>, EngineError> {
        let needle = match filter.search.as_deref().map(str::trim) {
            Some(s) if s.len() > MAX_SEARCH_LEN => {
                return Err(EngineError::LimitExceeded("search too long"));
            }
            Some(s) if !s.is_empty() => Some(s.to_lowercase()),
            _ => None,
        };

        let mut out: Vec<Booking> = match filter.day {
            Some(day) => self.bookings_on(day),
            None => self.bookings.iter().map(|e| e.value().clone()).collect(),
        };
        out.retain(|b| match filter.view {
            BookingView::All => true,
            BookingView::Upcoming => b.start_time >= now,
            BookingView::Past => b.start_time < now,
        });
        if let Some(needle) = &needle {
            out.retain(|b| matches_search(b, needle));
        }

        out.sort_by_key(|b| (b.start_time, b.id));
        if filter.view != BookingView::Upcoming {
            out.reverse();
        }
        Ok(out)
    }

    pub fn recent_notifications(&self, day: Option<NaiveDate>) -> Vec<Notice> {
        self.notify.recent(day)
    }

    fn bookings_on(&self, day: NaiveDate) -> Vec<Booking> {
        let Some(ids) = self.bookings_by_day.get(&day) else {
            return Vec::new();
        };
        ids.iter().filter_map(|id| self.get_booking(id)).collect()
    }
}

fn matches_search(b: &Booking, needle: &str) -> bool {
    let a = &b.address;
    [
        &b.client_name,
        &b.service_name,
        &b.client_email,
        &a.zip_code,
        &a.street,
        &a.neighborhood,
        &a.city,
        &a.state,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}
