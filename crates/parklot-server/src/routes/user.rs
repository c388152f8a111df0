//! User dashboard and history.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use super::session::AuthSession;
use crate::dashboard::{self, UserDashboard};

/// `GET /user/dashboard`
pub async fn dashboard(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<UserDashboard>, ApiError> {
    let user_id = session.require_user()?;
    Ok(Json(
        dashboard::user_dashboard(&state.db, &state.clock, user_id).await?,
    ))
}

/// `GET /user/booking_history`: newest first.
pub async fn booking_history(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let user_id = session.require_user()?;
    let reservations = state.db.list_user_history(user_id).await?;
    Ok(Json(json!({ "reservations": reservations })))
}
