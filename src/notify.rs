use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::broadcast;

use crate::limits::NOTICE_HISTORY;

const CHANNEL_CAPACITY: usize = 256;

/// Human-readable event about one day of the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub day: NaiveDate,
    pub at: NaiveDateTime,
    pub message: String,
}

/// Fire-and-forget notification fan-out: one broadcast feed and a bounded
/// history of recent notices.
pub struct NotifyHub {
    all: broadcast::Sender<Notice>,
    recent: Mutex<VecDeque<Notice>>,
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            all: broadcast::channel(CHANNEL_CAPACITY).0,
            recent: Mutex::new(VecDeque::with_capacity(NOTICE_HISTORY)),
        }
    }

    /// Every notice, whatever the day.
    pub fn subscribe_all(&self) -> broadcast::Receiver<Notice> {
        self.all.subscribe()
    }

    /// Publish. Never fails and never blocks the caller.
    pub fn send(&self, notice: Notice) {
        if let Ok(mut recent) = self.recent.lock() {
            if recent.len() == NOTICE_HISTORY {
                recent.pop_front();
            }
            recent.push_back(notice.clone());
        }
        let _ = self.all.send(notice);
    }

    /// Recent notices, oldest first, optionally for one day only.
    pub fn recent(&self, day: Option<NaiveDate>) -> Vec<Notice> {
        let Ok(recent) = self.recent.lock() else {
            return Vec::new();
        };
        recent
            .iter()
            .filter(|n| day.is_none_or(|d| n.day == d))
            .cloned()
            .collect()
    }
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}
