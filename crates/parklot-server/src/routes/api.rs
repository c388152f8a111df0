//! Read-only JSON listings for admins.

use axum::Json;
use axum::extract::{Query, State};
use serde_json::{Value, json};

use super::AppState;
use super::admin::{SpotQuery, UserSelection};
use super::error::ApiError;
use super::session::AuthSession;

/// `GET /api/lots`
pub async fn lots(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let lots = state.db.list_lots().await?;
    Ok(Json(json!({ "lots": lots })))
}

/// `GET /api/spots?lot_id=&status=`
pub async fn spots(
    session: AuthSession,
    State(state): State<AppState>,
    Query(query): Query<SpotQuery>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let spots = state.db.list_spots(query.filter()?).await?;
    Ok(Json(json!({ "spots": spots })))
}

/// `GET /api/reservations?user_id=`
pub async fn reservations(
    session: AuthSession,
    State(state): State<AppState>,
    Query(selection): Query<UserSelection>,
) -> Result<Json<Value>, ApiError> {
    session.require_admin()?;
    let reservations = state.db.list_reservations(selection.user_id).await?;
    Ok(Json(json!({ "reservations": reservations })))
}
