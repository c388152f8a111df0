//! Booking and release endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use parklot_core::db::unix_timestamp;

use super::AppState;
use super::error::ApiError;
use super::session::AuthSession;
use crate::auth::Account;
use crate::storage::BookingParams;

const MAX_VEHICLE_NUMBER_LEN: usize = 20;

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub spot_id: i64,
    pub vehicle_number: String,
    pub start_time: String,
    pub end_time: String,
}

fn vehicle_number(raw: &str) -> Result<String, ApiError> {
    let cleaned = raw.trim().to_uppercase();
    if cleaned.is_empty() || cleaned.chars().count() > MAX_VEHICLE_NUMBER_LEN {
        return Err(ApiError::Validation(format!(
            "Vehicle number must be between 1 and {MAX_VEHICLE_NUMBER_LEN} characters."
        )));
    }
    Ok(cleaned)
}

/// `GET /book`: active lots and the spots that can be booked now.
pub async fn book_page(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    session.require_user()?;
    let lots = state.db.list_active_lots().await?;
    let spots = state.db.list_bookable_spots().await?;
    Ok(Json(json!({ "lots": lots, "spots": spots })))
}

/// `POST /book`
#[instrument(skip(session, state, req), fields(route = "Book", spot_id = req.spot_id))]
pub async fn book(
    session: AuthSession,
    State(state): State<AppState>,
    Json(req): Json<BookRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user_id = session.require_user()?;
    let vehicle_number = vehicle_number(&req.vehicle_number)?;

    let now = unix_timestamp();
    let parking_time = state.clock.parse(&req.start_time, now)?;
    let leaving_time = state.clock.parse(&req.end_time, now)?;

    let reservation = state
        .db
        .book_spot(&BookingParams {
            user_id,
            spot_id: req.spot_id,
            vehicle_number: &vehicle_number,
            parking_time,
            leaving_time,
        })
        .await?;
    info!(
        reservation_id = reservation.id,
        spot_id = reservation.spot_id,
        user_id,
        cost = reservation.cost,
        "Spot booked"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Booking successful!",
            "reservation": reservation,
        })),
    ))
}

/// `POST /release/{id}`: owners release their own bookings; admins any.
#[instrument(skip(session, state), fields(route = "Release"))]
pub async fn release(
    session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let existing = state.db.get_reservation(id).await?;
    if let Account::User(user_id) = session.account {
        if existing.user_id != user_id {
            return Err(ApiError::Forbidden);
        }
    }

    let reservation = state.db.release_reservation(id, unix_timestamp()).await?;
    info!(
        reservation_id = id,
        spot_id = reservation.spot_id,
        cost = reservation.cost,
        by = %session.account,
        "Reservation released"
    );

    Ok(Json(json!({
        "message": format!("Slot released. Total cost: {:.2}", reservation.cost),
        "reservation": reservation,
    })))
}
