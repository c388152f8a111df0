//! Parking cost computation.

const SECS_PER_HOUR: f64 = 3600.0;

/// Round to two decimal places, halves away from zero.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Cost of parking from `start` to `end` (Unix seconds) at `price_per_hour`.
///
/// A window that ends before it starts costs nothing.
#[allow(clippy::cast_precision_loss)]
pub fn booking_cost(start: i64, end: i64, price_per_hour: f64) -> f64 {
    let secs = (end - start).max(0) as f64;
    round_cents(secs / SECS_PER_HOUR * price_per_hour)
}
