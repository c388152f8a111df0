//! Request-scoped authentication.
//!
//! Handlers take an `AuthSession` argument; extraction validates the bearer
//! token, checks the server-side session row, and resolves the account.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use parklot_core::db::unix_timestamp;

use super::AppState;
use super::error::ApiError;
use crate::auth::Account;
use crate::storage::DatabaseError;

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub account: Account,
    pub session_id: String,
}

impl AuthSession {
    /// The admin ID, or 403 for a user.
    pub const fn require_admin(&self) -> Result<i64, ApiError> {
        match self.account {
            Account::Admin(id) => Ok(id),
            Account::User(_) => Err(ApiError::Forbidden),
        }
    }

    /// The user ID, or 403 for an admin.
    pub const fn require_user(&self) -> Result<i64, ApiError> {
        match self.account {
            Account::User(id) => Ok(id),
            Account::Admin(_) => Err(ApiError::Forbidden),
        }
    }
}

fn unauthenticated(msg: &str) -> ApiError {
    ApiError::Unauthenticated(msg.to_string())
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| unauthenticated("Login required"))?;

        let claims = state
            .jwt
            .validate(token)
            .map_err(|_| unauthenticated("Invalid session token"))?;
        let account = claims
            .account()
            .map_err(|_| unauthenticated("Invalid session token"))?;

        let session = state
            .db
            .get_active_session(&claims.jti, unix_timestamp())
            .await?
            .ok_or_else(|| unauthenticated("Session has ended, please log in again"))?;
        if session.account != claims.sub {
            return Err(unauthenticated("Invalid session token"));
        }

        let lookup = match account {
            Account::Admin(id) => state.db.get_admin(id).await.map(|_| ()),
            Account::User(id) => state.db.get_user(id).await.map(|_| ()),
        };
        lookup.map_err(|e| match e {
            DatabaseError::NotFound(_) => unauthenticated("Account no longer exists"),
            other => other.into(),
        })?;

        Ok(Self {
            account,
            session_id: claims.jti,
        })
    }
}
