//! HTTP surface of the parking server.
//!
//! Every endpoint speaks JSON. Successful mutations answer with a
//! `message` field alongside the affected rows; failures use [`ApiError`].

pub mod admin;
pub mod api;
pub mod auth;
pub mod booking;
pub mod error;
pub mod session;
pub mod user;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use axum::{Json, response::IntoResponse};
use serde_json::json;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use session::AuthSession;

use crate::auth::JwtManager;
use crate::lifecycle::BookingClock;
use crate::storage::ParkingDatabase;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: ParkingDatabase,
    pub jwt: Arc<JwtManager>,
    pub clock: BookingClock,
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Accounts
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout).post(auth::logout))
        // Admin
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/bookings", get(admin::bookings))
        .route("/admin/sweep", post(admin::sweep))
        .route("/admin/lots", get(admin::list_lots).post(admin::toggle_lot))
        .route("/admin/add_lot", post(admin::add_lot))
        .route(
            "/admin/edit_lot/{id}",
            get(admin::get_lot).post(admin::edit_lot),
        )
        .route("/admin/delete_lot/{id}", post(admin::delete_lot))
        .route("/admin/add_spots/{id}", post(admin::add_spots))
        .route("/admin/spots", get(admin::spots).post(admin::filter_spots))
        .route("/admin/spots/{id}/toggle", get(admin::toggle_spot))
        .route("/admin/users", get(admin::users).post(admin::select_user))
        .route("/admin/users/{id}/bookings", get(admin::user_bookings))
        .route("/admin/users/{id}/delete", post(admin::delete_user))
        // Booking
        .route("/book", get(booking::book_page).post(booking::book))
        .route("/release/{id}", post(booking::release))
        .route("/user/dashboard", get(user::dashboard))
        .route("/user/booking_history", get(user::booking_history))
        // Read-only JSON API
        .route("/api/lots", get(api::lots))
        .route("/api/spots", get(api::spots))
        .route("/api/reservations", get(api::reservations))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
