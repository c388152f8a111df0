//! Data models for Parklot storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Spot state. `Unavailable` is set only by an admin; `Occupied` only by a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SpotStatus {
    Available,
    Unavailable,
    Occupied,
}

impl SpotStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Occupied => "occupied",
        }
    }
}

impl fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SpotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" | "a" => Ok(Self::Available),
            "unavailable" | "u" => Ok(Self::Unavailable),
            "occupied" | "o" => Ok(Self::Occupied),
            other => Err(format!("unknown spot status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReservationStatus {
    Booked,
    Completed,
}

impl ReservationStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ParkingLot {
    pub id: i64,
    pub location_name: String,
    pub address: String,
    pub pin_code: String,
    pub price_per_hour: f64,
    pub max_spots: i64,
    pub is_active: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ParkingSpot {
    pub id: i64,
    pub lot_id: i64,
    pub spot_number: String,
    pub status: SpotStatus,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reservation {
    pub id: i64,
    pub spot_id: i64,
    pub user_id: i64,
    pub vehicle_number: String,
    pub parking_time: i64,
    pub leaving_time: i64,
    pub cost: f64,
    pub status: ReservationStatus,
    pub created_at: i64,
}

/// Reservation joined with its user, spot and lot for admin listings.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookingDetail {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub spot_id: i64,
    pub spot_number: String,
    pub lot_id: i64,
    pub lot_location: String,
    pub vehicle_number: String,
    pub parking_time: i64,
    pub leaving_time: i64,
    pub cost: f64,
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: String,
    pub account: String,
    pub expires_at: i64,
    pub revoked: i64,
    pub created_at: i64,
}
