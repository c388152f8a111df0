//! Reservation lifecycle rules.
//!
//! A reservation moves `booked` -> `completed` exactly once. The state
//! changes themselves are applied atomically by the storage layer; this
//! module holds the pure rules they share: cost, booking-window validation
//! and wall-clock time parsing.

mod cost;
mod time;

pub use cost::{booking_cost, round_cents};
pub use time::{BookingClock, TimeParseError};

use parklot_core::db::DatabaseError;

/// Failures of lifecycle and registry operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("End time must be after start time")]
    InvalidWindow,

    #[error("Spot {0} is not available for booking")]
    SpotUnavailable(i64),

    #[error("Parking lot {0} is currently inactive")]
    LotInactive(i64),

    #[error("Reservation {0} is already released")]
    AlreadyReleased(i64),

    #[error("Spot {0} cannot be toggled while occupied")]
    SpotOccupied(i64),

    #[error("Cannot delete lot: {0}")]
    LotInUse(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for LifecycleError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e.into())
    }
}

/// Check that a booking window is non-empty.
pub fn validate_window(start: i64, end: i64) -> Result<(), LifecycleError> {
    if end <= start {
        return Err(LifecycleError::InvalidWindow);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_must_be_positive() {
        assert!(validate_window(100, 101).is_ok());
        assert!(matches!(
            validate_window(100, 100),
            Err(LifecycleError::InvalidWindow)
        ));
        assert!(matches!(
            validate_window(100, 50),
            Err(LifecycleError::InvalidWindow)
        ));
    }
}
