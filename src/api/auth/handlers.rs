//! Authentication API endpoint handlers

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::middleware::CurrentUser;
use crate::api::response::{AuthResponse, SessionInfo};
use crate::auth::{self, create_account, NewAccount, PasswordRequirements, USERNAME_REGEX};
use crate::model::Role;
use crate::state::AppState;

/// Registration request body
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 32, message = "Username must be 1-32 characters"))]
    #[validate(regex(
        path = "USERNAME_REGEX",
        message = "Username can only contain letters, numbers, dots, dashes and underscores"
    ))]
    pub username: String,

    pub password: String,

    #[validate(length(max = 64, message = "Name must be at most 64 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Please enter a valid email address"))]
    pub email: Option<String>,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/auth/register
///
/// Create a new player account and log it in
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if !state.config.auth.registration_enabled {
        return Err(ApiError::Forbidden(
            "Registration is currently disabled".to_string(),
        ));
    }

    payload.validate()?;

    let requirements = PasswordRequirements::with_min_length(state.config.auth.min_password_length);
    if let Err(problems) = requirements.validate(&payload.password) {
        let mut errors = HashMap::new();
        errors.insert("password".to_string(), problems.join(", "));
        return Err(ApiError::ValidationError(errors));
    }

    let store = state.store.clone();
    let cost = state.config.auth.bcrypt_cost;
    let account = NewAccount {
        username: payload.username,
        password: payload.password,
        role: Role::Player,
        name: payload.name,
        email: payload.email,
    };
    let user = tokio::task::spawn_blocking(move || create_account(&store, account, cost)).await??;

    let (token, _) = state.tokens.issue(&user)?;
    info!(user_id = user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::registered(
            token,
            user,
            state.tokens.expiry_secs(),
        )),
    ))
}

/// POST /api/auth/login
///
/// Check username and password and hand out an access token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let store = state.store.clone();
    let user = tokio::task::spawn_blocking(move || {
        auth::authenticate(&store, &payload.username, &payload.password)
    })
    .await??;

    let (token, claims) = state.tokens.issue(&user)?;
    info!(user_id = user.id, jti = %claims.jti, "User logged in");

    Ok(Json(AuthResponse::success(
        token,
        user,
        state.tokens.expiry_secs(),
    )))
}

/// POST /api/auth/logout
///
/// Revoke the bearer token the request was made with
pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> StatusCode {
    if let Some(claims) = user.claims() {
        state.tokens.revoke(claims);
        info!(user_id = user.user.id, "User logged out");
    }

    StatusCode::NO_CONTENT
}

/// GET /api/auth/session
///
/// Validate the current credentials and return the user
pub async fn session(user: CurrentUser) -> Json<SessionInfo> {
    let expires_at = user
        .claims()
        .and_then(|claims| chrono::DateTime::from_timestamp(claims.exp, 0))
        .map(|dt| dt.to_rfc3339());

    Json(SessionInfo::valid(user.user, expires_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, email: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: "secret".to_string(),
            name: None,
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn test_register_request_validation() {
        assert!(request("alice", None).validate().is_ok());
        assert!(request("alice", Some("alice@example.com")).validate().is_ok());

        assert!(request("", None).validate().is_err());
        assert!(request("al ice", None).validate().is_err());
        assert!(request(&"a".repeat(33), None).validate().is_err());
        assert!(request("alice", Some("not-an-email")).validate().is_err());
    }

    #[test]
    fn test_validation_errors_name_the_field() {
        let err: ApiError = request("al/ice", None).validate().unwrap_err().into();
        match err {
            ApiError::ValidationError(errors) => assert!(errors.contains_key("username")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
