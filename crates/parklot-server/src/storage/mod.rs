//! `SQLite` storage for Parklot.
//!
//! Provides persistence for accounts, sessions, lots, spots and
//! reservations. Every state change of the reservation lifecycle runs in a
//! single transaction guarded by the row's current status.

mod db;
mod models;
mod queries_accounts;
mod queries_lots;
mod queries_reports;
mod queries_reservations;


pub use db::{DatabaseError, ParkingDatabase};
pub use models::*;
pub use queries_lots::{LotParams, SpotFilter};
pub use queries_reservations::BookingParams;
