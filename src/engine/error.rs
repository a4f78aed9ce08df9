use chrono::NaiveDateTime;

use crate::model::SlotId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    InvalidService(String),
    InvalidDuration(i64),
    SlotUnavailable(NaiveDateTime),
    SlotNotFound(SlotId),
    InvalidTransition(SlotId),
    MissingField(&'static str),
    LimitExceeded(&'static str),
    StoreError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidService(id) if id.is_empty() => write!(f, "missing service id"),
            EngineError::InvalidService(id) => write!(f, "unknown service: {id}"),
            EngineError::InvalidDuration(m) => {
                write!(f, "invalid duration: {m} minutes (must be positive)")
            }
            EngineError::SlotUnavailable(start) => write!(
                f,
                "slot unavailable: {} is no longer a free start, \
                 re-query available starts and retry",
                start.format("%Y-%m-%dT%H:%M")
            ),
            EngineError::SlotNotFound(id) => write!(f, "slot not found: {id}"),
            EngineError::InvalidTransition(id) => {
                write!(f, "invalid transition: slot {id} is booked")
            }
            EngineError::MissingField(name) => write!(f, "missing required field: {name}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::StoreError(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::StoreError(e.to_string())
    }
}
