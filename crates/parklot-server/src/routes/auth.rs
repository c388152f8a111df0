//! Registration, login and logout.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use super::error::ApiError;
use super::session::AuthSession;
use super::AppState;
use crate::auth::{Account, hash_password, verify_password};
use crate::storage::DatabaseError;

const MAX_NAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email or full name for users, username for admins.
    #[serde(alias = "login_input", alias = "username")]
    pub login: String,
    pub password: String,
}

/// Lowercased email if it has a local part and a dotted domain.
fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
        return None;
    }
    let (host, tld) = domain.rsplit_once('.')?;
    if host.is_empty() || tld.is_empty() {
        return None;
    }
    Some(email)
}

fn email_taken() -> ApiError {
    ApiError::Validation("Email already registered.".to_string())
}

/// Validate a registration form, returning the cleaned name and email.
fn validate_registration(req: &RegisterRequest) -> Result<(String, String), ApiError> {
    let full_name = req.full_name.trim();
    if full_name.is_empty() || full_name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::Validation(format!(
            "Full name must be between 1 and {MAX_NAME_LEN} characters."
        )));
    }
    let email = normalize_email(&req.email)
        .ok_or_else(|| ApiError::Validation("Invalid email address.".to_string()))?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    if req.password != req.confirm_password {
        return Err(ApiError::Validation("Passwords do not match.".to_string()));
    }
    Ok((full_name.to_string(), email))
}

/// `POST /register`
#[instrument(skip(state, req), fields(route = "Register"))]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (full_name, email) = validate_registration(&req)?;

    if state.db.user_email_exists(&email).await? {
        return Err(email_taken());
    }

    let hash = hash_password(&req.password)?;
    // A concurrent registration can claim the email after the check above.
    let user = state
        .db
        .create_user(&email, &full_name, &hash)
        .await
        .map_err(|e| match e {
            DatabaseError::Conflict(_) => email_taken(),
            other => other.into(),
        })?;
    info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful. Please log in.",
            "user": user,
        })),
    ))
}

/// Resolve login credentials to an account. Users are tried before admins.
async fn authenticate(state: &AppState, login: &str, password: &str) -> Result<Option<Account>, ApiError> {
    if let Some(user) = state.db.find_user_for_login(login).await? {
        if verify_password(password, &user.password_hash)? {
            return Ok(Some(Account::User(user.id)));
        }
    }

    if let Some(admin) = state.db.get_admin_by_username(login.trim()).await? {
        if verify_password(password, &admin.password_hash)? {
            return Ok(Some(Account::Admin(admin.id)));
        }
    }

    Ok(None)
}

/// `POST /login`
#[instrument(skip(state, req), fields(route = "Login"))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let account = authenticate(&state, &req.login, &req.password)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("Invalid username or password".to_string()))?;

    let issued = state
        .jwt
        .issue_session_token(account)
        .map_err(|e| ApiError::Internal(format!("token: {e}")))?;
    state
        .db
        .create_session(&issued.jti, &account.to_string(), issued.expires_at)
        .await?;
    info!(%account, "Login");

    Ok(Json(json!({
        "message": "Login successful",
        "token": issued.token,
        "role": account.role(),
        "account_id": account.id(),
        "expires_at": issued.expires_at,
    })))
}

/// `GET|POST /logout`
#[instrument(skip(session, state), fields(route = "Logout"))]
pub async fn logout(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    state.db.revoke_session(&session.session_id).await?;
    info!(account = %session.account, "Logout");
    Ok(Json(json!({ "message": "You have been logged out." })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            full_name: name.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            normalize_email("  Alice@Example.COM "),
            Some("alice@example.com".to_string())
        );
        assert_eq!(normalize_email("alice"), None);
        assert_eq!(normalize_email("alice@localhost"), None);
        assert_eq!(normalize_email("@example.com"), None);
        assert_eq!(normalize_email("a@b@example.com"), None);
    }

    #[test]
    fn registration_rules() {
        assert!(validate_registration(&form("Alice", "a@example.com", "secret1", "secret1")).is_ok());
        assert!(validate_registration(&form("  ", "a@example.com", "secret1", "secret1")).is_err());
        assert!(validate_registration(&form(&"x".repeat(51), "a@example.com", "secret1", "secret1")).is_err());
        assert!(validate_registration(&form("Alice", "a@example.com", "12345", "12345")).is_err());

        let err = validate_registration(&form("Alice", "a@example.com", "secret1", "secret2"));
        assert!(matches!(err, Err(ApiError::Validation(msg)) if msg == "Passwords do not match."));
    }
}
