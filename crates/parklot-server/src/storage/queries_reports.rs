//! Read-only aggregates for dashboards.

use super::db::{DatabaseError, ParkingDatabase};
use super::models::SpotStatus;

impl ParkingDatabase {
    /// Users with the most reservations, as `(full_name, count)`.
    pub async fn top_users(&self, limit: u32) -> Result<Vec<(String, i64)>, DatabaseError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r"
            SELECT u.full_name, COUNT(r.id) AS bookings
            FROM users u
            JOIN reservations r ON r.user_id = u.id
            GROUP BY u.id, u.full_name
            ORDER BY bookings DESC, u.id
            LIMIT ?
            ",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Reservation count per lot name, busiest first.
    pub async fn bookings_per_lot(&self) -> Result<Vec<(String, i64)>, DatabaseError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r"
            SELECT l.location_name, COUNT(r.id) AS bookings
            FROM reservations r
            JOIN parking_spots s ON s.id = r.spot_id
            JOIN parking_lots l ON l.id = s.lot_id
            GROUP BY l.id, l.location_name
            ORDER BY bookings DESC, l.id
            ",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Number of spots in each status.
    pub async fn spot_status_counts(&self) -> Result<Vec<(SpotStatus, i64)>, DatabaseError> {
        let rows = sqlx::query_as::<_, (SpotStatus, i64)>(
            "SELECT status, COUNT(*) FROM parking_spots GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}
