//! Wall-clock booking time parsing.
//!
//! Booking forms send times like `10:30 AM`, meaning that time on the
//! current day at the lot's local offset. Full dates are accepted too.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};

const CLOCK_FORMATS: &[&str] = &["%I:%M %p", "%H:%M"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("Invalid time format '{0}'. Please use a format like '10:30 AM'")]
    Format(String),

    #[error("Invalid UTC offset: {0} minutes")]
    Offset(i32),

    #[error("Timestamp out of range: {0}")]
    OutOfRange(i64),
}

/// Interprets booking times in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct BookingClock {
    offset: FixedOffset,
}

impl BookingClock {
    pub fn new(utc_offset_minutes: i32) -> Result<Self, TimeParseError> {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(TimeParseError::Offset(utc_offset_minutes))?;
        Ok(Self { offset })
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Parse a booking time into Unix seconds. Clock-only input is taken on
    /// the local date of `now`.
    pub fn parse(&self, raw: &str, now: i64) -> Result<i64, TimeParseError> {
        let input = raw.trim().to_uppercase();

        if let Ok(dt) = DateTime::parse_from_rfc3339(&input) {
            return Ok(dt.timestamp());
        }

        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(&input, fmt) {
                return self.localize(naive, raw);
            }
        }

        let today = self.local_date(now)?;
        for fmt in CLOCK_FORMATS {
            if let Ok(time) = NaiveTime::parse_from_str(&input, fmt) {
                return self.localize(today.and_time(time), raw);
            }
        }

        Err(TimeParseError::Format(raw.trim().to_string()))
    }

    /// Local calendar day (`YYYY-MM-DD`) of a Unix timestamp.
    pub fn day_of(&self, ts: i64) -> Option<String> {
        DateTime::from_timestamp(ts, 0).map(|dt| {
            dt.with_timezone(&self.offset)
                .format("%Y-%m-%d")
                .to_string()
        })
    }

    fn local_date(&self, ts: i64) -> Result<NaiveDate, TimeParseError> {
        DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.with_timezone(&self.offset).date_naive())
            .ok_or(TimeParseError::OutOfRange(ts))
    }

    fn localize(&self, naive: NaiveDateTime, raw: &str) -> Result<i64, TimeParseError> {
        self.offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.timestamp())
            .ok_or_else(|| TimeParseError::Format(raw.trim().to_string()))
    }
}
