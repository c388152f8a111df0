//! Admin endpoints: lot registry, spot management, users and reports.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use parklot_core::db::unix_timestamp;

use super::AppState;
use super::error::ApiError;
use super::session::AuthSession;
use crate::auth::Account;
use crate::dashboard::{self, AdminDashboard};
use crate::storage::{LotParams, SpotFilter, SpotStatus};
use crate::sweeper;

const MAX_SPOTS_PER_LOT: i64 = 10_000;
const MAX_PIN_CODE_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct LotForm {
    #[serde(alias = "location")]
    pub location_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, alias = "pincode")]
    pub pin_code: String,
    #[serde(alias = "price")]
    pub price_per_hour: f64,
    pub max_spots: i64,
}

impl LotForm {
    fn validate(&self) -> Result<LotParams<'_>, ApiError> {
        let location_name = self.location_name.trim();
        if location_name.is_empty() {
            return Err(ApiError::Validation("Location name is required.".to_string()));
        }
        if !self.price_per_hour.is_finite() || self.price_per_hour < 0.0 {
            return Err(ApiError::Validation(
                "Price per hour must be a non-negative number.".to_string(),
            ));
        }
        if !(0..=MAX_SPOTS_PER_LOT).contains(&self.max_spots) {
            return Err(ApiError::Validation(format!(
                "Max spots must be between 0 and {MAX_SPOTS_PER_LOT}."
            )));
        }
        let pin_code = self.pin_code.trim();
        if pin_code.chars().count() > MAX_PIN_CODE_LEN {
            return Err(ApiError::Validation(format!(
                "Pin code must be at most {MAX_PIN_CODE_LEN} characters."
            )));
        }
        Ok(LotParams {
            location_name,
            address: self.address.trim(),
            pin_code,
            price_per_hour: self.price_per_hour,
            max_spots: self.max_spots,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LotToggle {
    pub lot_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpotQuery {
    pub lot_id: Option<i64>,
    pub status: Option<String>,
}

impl SpotQuery {
    pub fn filter(&self) -> Result<SpotFilter, ApiError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("" | "all") => None,
            Some(raw) => Some(raw.parse::<SpotStatus>().map_err(ApiError::Validation)?),
        };
        Ok(SpotFilter {
            lot_id: self.lot_id,
            status,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserSelection {
    pub user_id: Option<i64>,
}

/// `GET /admin/dashboard`
pub async fn dashboard(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboard>, ApiError> {
    session.require_admin()?;
    Ok(Json(dashboard::admin_dashboard(&state.db, &state.clock).await?))
}

/// `GET /admin/bookings`
pub async fn bookings(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let bookings = state.db.list_booking_details().await?;
    Ok(Json(json!({ "bookings": bookings })))
}

/// `POST /admin/sweep`: run the expiry sweep now.
#[instrument(skip(session, state), fields(route = "Sweep"))]
pub async fn sweep(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let report = sweeper::sweep(&state.db, unix_timestamp()).await?;
    Ok(Json(json!({
        "message": format!("{} reservation(s) expired", report.expired),
        "expired": report.expired,
        "sessions_purged": report.sessions_purged,
    })))
}

// =========================================================================
// Lots
// =========================================================================

/// `GET /admin/lots`
pub async fn list_lots(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let lots = state.db.list_lots().await?;
    Ok(Json(json!({ "lots": lots })))
}

/// `POST /admin/lots`: flip a lot between active and inactive.
#[instrument(skip(session, state), fields(route = "ToggleLot"))]
pub async fn toggle_lot(
    session: AuthSession,
    State(state): State<AppState>,
    Json(req): Json<LotToggle>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let lot = state.db.toggle_lot_active(req.lot_id).await?;
    let label = if lot.is_active { "Active" } else { "Inactive" };
    info!(lot_id = lot.id, active = lot.is_active, "Lot toggled");
    Ok(Json(json!({
        "message": format!("Lot '{}' status changed to {label}.", lot.location_name),
        "lot": lot,
    })))
}

/// `POST /admin/add_lot`
#[instrument(skip(session, state, form), fields(route = "AddLot"))]
pub async fn add_lot(
    session: AuthSession,
    State(state): State<AppState>,
    Json(form): Json<LotForm>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    session.require_admin()?;
    let params = form.validate()?;
    let lot = state.db.create_lot(&params).await?;
    info!(lot_id = lot.id, spots = lot.max_spots, "Lot created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Parking lot created successfully.",
            "lot": lot,
        })),
    ))
}

/// `GET /admin/edit_lot/{id}`
pub async fn get_lot(
    session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let lot = state.db.get_lot(id).await?;
    Ok(Json(json!({ "lot": lot })))
}

/// `POST /admin/edit_lot/{id}`: update fields; spots are not created here.
#[instrument(skip(session, state, form), fields(route = "EditLot"))]
pub async fn edit_lot(
    session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(form): Json<LotForm>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let params = form.validate()?;
    let lot = state.db.update_lot(id, &params).await?;
    Ok(Json(json!({
        "message": "Parking lot updated.",
        "lot": lot,
    })))
}

/// `POST /admin/delete_lot/{id}`
#[instrument(skip(session, state), fields(route = "DeleteLot"))]
pub async fn delete_lot(
    session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    state.db.delete_lot(id).await?;
    info!(lot_id = id, "Lot deleted");
    Ok(Json(json!({ "message": "Parking lot deleted." })))
}

/// `POST /admin/add_spots/{id}`: create spots up to the lot's capacity.
#[instrument(skip(session, state), fields(route = "AddSpots"))]
pub async fn add_spots(
    session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let added = state.db.add_missing_spots(id).await?;
    let message = if added == 0 {
        "No missing spots to add. All spots already exist.".to_string()
    } else {
        format!("{added} missing spot(s) added.")
    };
    Ok(Json(json!({ "message": message, "added": added })))
}

// =========================================================================
// Spots
// =========================================================================

/// `GET /admin/spots?lot_id=&status=`
pub async fn spots(
    session: AuthSession,
    State(state): State<AppState>,
    Query(query): Query<SpotQuery>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    spot_listing(&state, &query).await
}

/// `POST /admin/spots`: filters from the JSON body, falling back to the query.
pub async fn filter_spots(
    session: AuthSession,
    State(state): State<AppState>,
    Query(query): Query<SpotQuery>,
    body: Option<Json<SpotQuery>>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let query = body.map_or(query, |Json(filters)| filters);
    spot_listing(&state, &query).await
}

async fn spot_listing(state: &AppState, query: &SpotQuery) -> Result<Json<Value>, ApiError> {
    let filter = query.filter()?;
    let lots = state.db.list_lots().await?;
    let spots = state.db.list_spots(filter).await?;
    Ok(Json(json!({
        "lots": lots,
        "spots": spots,
        "selected_lot_id": filter.lot_id,
        "selected_status": filter.status,
    })))
}

/// `GET /admin/spots/{id}/toggle`
#[instrument(skip(session, state), fields(route = "ToggleSpot"))]
pub async fn toggle_spot(
    session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let spot = state.db.toggle_spot(id).await?;
    info!(spot_id = spot.id, status = %spot.status, "Spot toggled");
    Ok(Json(json!({
        "message": "Spot status updated.",
        "spot": spot,
    })))
}

// =========================================================================
// Users
// =========================================================================

async fn user_listing(state: &AppState, user_id: Option<i64>) -> Result<Json<Value>, ApiError> {
    if let Some(id) = user_id {
        state.db.get_user(id).await?;
    }
    let users = state.db.list_users().await?;
    let reservations = state.db.list_reservations(user_id).await?;
    Ok(Json(json!({
        "users": users,
        "reservations": reservations,
        "selected_user_id": user_id,
    })))
}

/// `GET /admin/users`
pub async fn users(
    session: AuthSession,
    State(state): State<AppState>,
    Query(selection): Query<UserSelection>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    user_listing(&state, selection.user_id).await
}

/// `POST /admin/users`: filter reservations to one user.
pub async fn select_user(
    session: AuthSession,
    State(state): State<AppState>,
    Json(selection): Json<UserSelection>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    user_listing(&state, selection.user_id).await
}

/// `GET /admin/users/{id}/bookings`
pub async fn user_bookings(
    session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let user = state.db.get_user(id).await?;
    let bookings = state.db.list_user_history(id).await?;
    Ok(Json(json!({ "user": user, "bookings": bookings })))
}

/// `POST /admin/users/{id}/delete`
#[instrument(skip(session, state), fields(route = "DeleteUser"))]
pub async fn delete_user(
    session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let released = state.db.delete_user(id).await?;
    state
        .db
        .revoke_account_sessions(&Account::User(id).to_string())
        .await?;
    info!(user_id = id, released = released.len(), "User deleted");
    Ok(Json(json!({
        "message": "User deleted.",
        "released_spots": released.len(),
    })))
}
