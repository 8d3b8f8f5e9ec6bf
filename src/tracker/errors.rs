//! Tracker errors

use thiserror::Error;

use crate::storage::StorageError;

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid patron name: {0:?}")]
    InvalidPatron(String),

    #[error("Cycle lock poisoned for patron {0:?}")]
    LockPoisoned(String),
}

impl TrackerError {
    /// Stable error code for machine consumers.
    pub fn code(&self) -> &'static str {
        match self {
            TrackerError::Storage(e) => e.code().code(),
            TrackerError::InvalidPatron(_) => "SHELF_INVALID_PATRON",
            TrackerError::LockPoisoned(_) => "SHELF_CYCLE_LOCK_POISONED",
        }
    }

    /// Only data corruption is fatal; the store must not be used again.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TrackerError::Storage(e) if e.is_fatal())
    }
}
