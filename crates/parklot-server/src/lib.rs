//! Parklot Server Library
//!
//! Parking lot registry, spot bookings and the reservation lifecycle,
//! served as a JSON HTTP API.

pub mod auth;
pub mod dashboard;
pub mod lifecycle;
pub mod routes;
pub mod storage;
pub mod sweeper;
