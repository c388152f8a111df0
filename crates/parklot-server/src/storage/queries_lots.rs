//! Lot and spot registry queries.

use sqlx::SqliteConnection;

use parklot_core::db::unix_timestamp;

use super::db::{DatabaseError, ParkingDatabase};
use super::models::{ParkingLot, ParkingSpot, SpotStatus};
use crate::lifecycle::LifecycleError;

/// Editable fields of a parking lot.
pub struct LotParams<'a> {
    pub location_name: &'a str,
    pub address: &'a str,
    pub pin_code: &'a str,
    pub price_per_hour: f64,
    pub max_spots: i64,
}

/// Optional filters for spot listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpotFilter {
    pub lot_id: Option<i64>,
    pub status: Option<SpotStatus>,
}

/// Insert `count` available spots labelled `S{first}`, `S{first + 1}`, ...
async fn insert_spots(
    conn: &mut SqliteConnection,
    lot_id: i64,
    first: i64,
    count: i64,
) -> Result<(), sqlx::Error> {
    for n in first..first + count {
        sqlx::query(
            "INSERT INTO parking_spots (lot_id, spot_number, status, is_available) VALUES (?, ?, 'available', 1)",
        )
        .bind(lot_id)
        .bind(format!("S{n}"))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

impl ParkingDatabase {
    // =========================================================================
    // Lot queries
    // =========================================================================

    /// Create a lot together with its `max_spots` spots.
    pub async fn create_lot(&self, params: &LotParams<'_>) -> Result<ParkingLot, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.begin_write().await?;

        let result = sqlx::query(
            r"
            INSERT INTO parking_lots
                (location_name, address, pin_code, price_per_hour, max_spots, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            ",
        )
        .bind(params.location_name)
        .bind(params.address)
        .bind(params.pin_code)
        .bind(params.price_per_hour)
        .bind(params.max_spots)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let lot_id = result.last_insert_rowid();
        insert_spots(&mut *tx, lot_id, 1, params.max_spots).await?;

        tx.commit().await?;

        self.get_lot(lot_id).await
    }

    /// Get a lot by ID.
    pub async fn get_lot(&self, id: i64) -> Result<ParkingLot, DatabaseError> {
        sqlx::query_as::<_, ParkingLot>("SELECT * FROM parking_lots WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Parking lot {id}")))
    }

    pub async fn list_lots(&self) -> Result<Vec<ParkingLot>, DatabaseError> {
        let lots = sqlx::query_as::<_, ParkingLot>("SELECT * FROM parking_lots ORDER BY id")
            .fetch_all(self.pool())
            .await?;
        Ok(lots)
    }

    pub async fn list_active_lots(&self) -> Result<Vec<ParkingLot>, DatabaseError> {
        let lots = sqlx::query_as::<_, ParkingLot>(
            "SELECT * FROM parking_lots WHERE is_active = 1 ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(lots)
    }

    /// Update a lot's fields. Existing spots are left untouched.
    pub async fn update_lot(
        &self,
        id: i64,
        params: &LotParams<'_>,
    ) -> Result<ParkingLot, DatabaseError> {
        let result = sqlx::query(
            r"
            UPDATE parking_lots
            SET location_name = ?, address = ?, pin_code = ?, price_per_hour = ?, max_spots = ?
            WHERE id = ?
            ",
        )
        .bind(params.location_name)
        .bind(params.address)
        .bind(params.pin_code)
        .bind(params.price_per_hour)
        .bind(params.max_spots)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Parking lot {id}")));
        }

        self.get_lot(id).await
    }

    /// Flip a lot between active and inactive.
    pub async fn toggle_lot_active(&self, id: i64) -> Result<ParkingLot, DatabaseError> {
        let result = sqlx::query("UPDATE parking_lots SET is_active = NOT is_active WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Parking lot {id}")));
        }

        self.get_lot(id).await
    }

    /// Create spots until the lot has `max_spots` of them. Returns how many were added.
    pub async fn add_missing_spots(&self, lot_id: i64) -> Result<i64, DatabaseError> {
        let mut tx = self.begin_write().await?;

        let max_spots: i64 = sqlx::query_scalar("SELECT max_spots FROM parking_lots WHERE id = ?")
            .bind(lot_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Parking lot {lot_id}")))?;

        let current: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parking_spots WHERE lot_id = ?")
            .bind(lot_id)
            .fetch_one(&mut *tx)
            .await?;

        let missing = max_spots - current;
        if missing <= 0 {
            return Ok(0);
        }

        insert_spots(&mut *tx, lot_id, current + 1, missing).await?;
        tx.commit().await?;

        Ok(missing)
    }

    /// Delete a lot and its spots.
    ///
    /// Refused while any spot is occupied or has ever been reserved.
    pub async fn delete_lot(&self, id: i64) -> Result<(), LifecycleError> {
        let mut tx = self.begin_write().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM parking_lots WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(LifecycleError::NotFound(format!("Parking lot {id}")));
        }

        let occupied: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM parking_spots WHERE lot_id = ? AND status = 'occupied'",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if occupied > 0 {
            return Err(LifecycleError::LotInUse(
                "some spots are occupied".to_string(),
            ));
        }

        let history: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM reservations r
            JOIN parking_spots s ON s.id = r.spot_id
            WHERE s.lot_id = ?
            ",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if history > 0 {
            return Err(LifecycleError::LotInUse(
                "spots have reservation history".to_string(),
            ));
        }

        sqlx::query("DELETE FROM parking_lots WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Spot queries
    // =========================================================================

    /// Get a spot by ID.
    pub async fn get_spot(&self, id: i64) -> Result<ParkingSpot, DatabaseError> {
        sqlx::query_as::<_, ParkingSpot>("SELECT * FROM parking_spots WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Parking spot {id}")))
    }

    pub async fn list_spots(&self, filter: SpotFilter) -> Result<Vec<ParkingSpot>, DatabaseError> {
        let spots = sqlx::query_as::<_, ParkingSpot>(
            r"
            SELECT * FROM parking_spots
            WHERE (? IS NULL OR lot_id = ?) AND (? IS NULL OR status = ?)
            ORDER BY lot_id, id
            ",
        )
        .bind(filter.lot_id)
        .bind(filter.lot_id)
        .bind(filter.status)
        .bind(filter.status)
        .fetch_all(self.pool())
        .await?;

        Ok(spots)
    }

    /// Spots that can be booked right now: available, in an active lot.
    pub async fn list_bookable_spots(&self) -> Result<Vec<ParkingSpot>, DatabaseError> {
        let spots = sqlx::query_as::<_, ParkingSpot>(
            r"
            SELECT s.* FROM parking_spots s
            JOIN parking_lots l ON l.id = s.lot_id
            WHERE s.status = 'available' AND l.is_active = 1
            ORDER BY s.lot_id, s.id
            ",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(spots)
    }

    /// Switch a spot between available and unavailable.
    ///
    /// An occupied spot is left alone; its reservation must be released first.
    pub async fn toggle_spot(&self, id: i64) -> Result<ParkingSpot, LifecycleError> {
        let result = sqlx::query(
            r"
            UPDATE parking_spots
            SET status = CASE status WHEN 'available' THEN 'unavailable' ELSE 'available' END,
                is_available = CASE status WHEN 'available' THEN 0 ELSE 1 END
            WHERE id = ? AND status IN ('available', 'unavailable')
            ",
        )
        .bind(id)
        .execute(self.pool())
        .await?;

        let spot = self.get_spot(id).await.map_err(|e| match e {
            DatabaseError::NotFound(what) => LifecycleError::NotFound(what),
            other => LifecycleError::Database(other),
        })?;

        if result.rows_affected() == 0 {
            return Err(LifecycleError::SpotOccupied(id));
        }

        Ok(spot)
    }
}
