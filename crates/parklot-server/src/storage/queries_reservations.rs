//! Reservation lifecycle queries.
//!
//! Booking, release and expiry each run in one transaction. The spot row is
//! claimed with a conditional update on its current status, so two bookings
//! racing for the same spot cannot both succeed.

use parklot_core::db::unix_timestamp;

use super::db::{DatabaseError, ParkingDatabase};
use super::models::{BookingDetail, Reservation, ReservationStatus, SpotStatus};
use crate::lifecycle::{LifecycleError, booking_cost, validate_window};

/// Parameters for a new booking. Times are Unix seconds.
pub struct BookingParams<'a> {
    pub user_id: i64,
    pub spot_id: i64,
    pub vehicle_number: &'a str,
    pub parking_time: i64,
    pub leaving_time: i64,
}

impl ParkingDatabase {
    /// Book a spot for a time window.
    ///
    /// The spot must be available and belong to an active lot. Cost is
    /// computed from the requested window and the lot's hourly price.
    pub async fn book_spot(&self, params: &BookingParams<'_>) -> Result<Reservation, LifecycleError> {
        validate_window(params.parking_time, params.leaving_time)?;

        let now = unix_timestamp();
        let mut tx = self.begin_write().await?;

        let claimed = sqlx::query(
            r"
            UPDATE parking_spots
            SET status = 'occupied', is_available = 0
            WHERE id = ?
              AND status = 'available'
              AND lot_id IN (SELECT id FROM parking_lots WHERE is_active = 1)
            ",
        )
        .bind(params.spot_id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            let row: Option<(SpotStatus, bool, i64)> = sqlx::query_as(
                r"
                SELECT s.status, l.is_active, l.id FROM parking_spots s
                JOIN parking_lots l ON l.id = s.lot_id
                WHERE s.id = ?
                ",
            )
            .bind(params.spot_id)
            .fetch_optional(&mut *tx)
            .await?;

            return Err(match row {
                None => LifecycleError::NotFound(format!("Parking spot {}", params.spot_id)),
                Some((_, false, lot_id)) => LifecycleError::LotInactive(lot_id),
                Some(_) => LifecycleError::SpotUnavailable(params.spot_id),
            });
        }

        let price_per_hour: f64 = sqlx::query_scalar(
            r"
            SELECT l.price_per_hour FROM parking_lots l
            JOIN parking_spots s ON s.lot_id = l.id
            WHERE s.id = ?
            ",
        )
        .bind(params.spot_id)
        .fetch_one(&mut *tx)
        .await?;

        let cost = booking_cost(params.parking_time, params.leaving_time, price_per_hour);

        let result = sqlx::query(
            r"
            INSERT INTO reservations
                (spot_id, user_id, vehicle_number, parking_time, leaving_time, cost, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(params.spot_id)
        .bind(params.user_id)
        .bind(params.vehicle_number)
        .bind(params.parking_time)
        .bind(params.leaving_time)
        .bind(cost)
        .bind(ReservationStatus::Booked)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(self.get_reservation(result.last_insert_rowid()).await?)
    }

    /// Release a booked reservation at `now`.
    ///
    /// The cost is recomputed from the actual time parked. Releasing before
    /// the booked start charges nothing. A completed reservation is never
    /// touched again.
    pub async fn release_reservation(
        &self,
        id: i64,
        now: i64,
    ) -> Result<Reservation, LifecycleError> {
        let mut tx = self.begin_write().await?;

        let reservation =
            sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| LifecycleError::NotFound(format!("Reservation {id}")))?;

        if reservation.status == ReservationStatus::Completed {
            return Err(LifecycleError::AlreadyReleased(id));
        }

        let price_per_hour: f64 = sqlx::query_scalar(
            r"
            SELECT l.price_per_hour FROM parking_lots l
            JOIN parking_spots s ON s.lot_id = l.id
            WHERE s.id = ?
            ",
        )
        .bind(reservation.spot_id)
        .fetch_one(&mut *tx)
        .await?;

        let leaving_time = now.max(reservation.parking_time);
        let cost = booking_cost(reservation.parking_time, leaving_time, price_per_hour);

        let updated = sqlx::query(
            r"
            UPDATE reservations
            SET status = 'completed', leaving_time = ?, cost = ?
            WHERE id = ? AND status = 'booked'
            ",
        )
        .bind(leaving_time)
        .bind(cost)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(LifecycleError::AlreadyReleased(id));
        }

        sqlx::query(
            "UPDATE parking_spots SET status = 'available', is_available = 1 WHERE id = ? AND status = 'occupied'",
        )
        .bind(reservation.spot_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(self.get_reservation(id).await?)
    }

    /// Complete every booked reservation whose end time is before `now` and
    /// free its spot. Booked cost is kept. Returns the reservations completed.
    pub async fn expire_reservations(&self, now: i64) -> Result<Vec<Reservation>, DatabaseError> {
        let mut tx = self.begin_write().await?;

        let expired = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE status = 'booked' AND leaving_time < ? ORDER BY id",
        )
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;

        if expired.is_empty() {
            return Ok(expired);
        }

        for reservation in &expired {
            sqlx::query(
                "UPDATE parking_spots SET status = 'available', is_available = 1 WHERE id = ? AND status = 'occupied'",
            )
            .bind(reservation.spot_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "UPDATE reservations SET status = 'completed' WHERE status = 'booked' AND leaving_time < ?",
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(expired
            .into_iter()
            .map(|r| Reservation {
                status: ReservationStatus::Completed,
                ..r
            })
            .collect())
    }

    /// Get a reservation by ID.
    pub async fn get_reservation(&self, id: i64) -> Result<Reservation, DatabaseError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Reservation {id}")))
    }

    /// List reservations, optionally for one user, in booking order.
    pub async fn list_reservations(
        &self,
        user_id: Option<i64>,
    ) -> Result<Vec<Reservation>, DatabaseError> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE (? IS NULL OR user_id = ?) ORDER BY id",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(reservations)
    }

    /// A user's reservations, newest start first.
    pub async fn list_user_history(&self, user_id: i64) -> Result<Vec<Reservation>, DatabaseError> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE user_id = ? ORDER BY parking_time DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(reservations)
    }

    /// The user's most recent booking that is still open.
    pub async fn active_reservation(
        &self,
        user_id: i64,
    ) -> Result<Option<Reservation>, DatabaseError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r"
            SELECT * FROM reservations
            WHERE user_id = ? AND status = 'booked'
            ORDER BY parking_time DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(reservation)
    }

    /// Reservations joined with user, spot and lot names.
    pub async fn list_booking_details(&self) -> Result<Vec<BookingDetail>, DatabaseError> {
        let details = sqlx::query_as::<_, BookingDetail>(
            r"
            SELECT r.id, r.user_id, u.full_name AS user_name,
                   r.spot_id, s.spot_number, s.lot_id, l.location_name AS lot_location,
                   r.vehicle_number, r.parking_time, r.leaving_time, r.cost, r.status
            FROM reservations r
            JOIN users u ON u.id = r.user_id
            JOIN parking_spots s ON s.id = r.spot_id
            JOIN parking_lots l ON l.id = s.lot_id
            ORDER BY r.id
            ",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(details)
    }
}
