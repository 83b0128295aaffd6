//! API middleware for authentication and request processing
//!
//! This module provides:
//! - extractors authenticating users by HTTP Basic credentials or a JWT
//!   bearer token
//! - the `WWW-Authenticate` challenge on 401 responses
//! - the spawner run after every request

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
    RequestPartsExt,
};
use axum_extra::{
    headers::{
        authorization::{Basic, Bearer},
        Authorization,
    },
    TypedHeader,
};
use tracing::debug;

use super::error::ApiError;
use crate::auth::{self, Claims};
use crate::model::User;
use crate::spawn;
use crate::state::AppState;

/// How a request was authenticated
#[derive(Debug, Clone)]
pub enum Credentials {
    Basic,
    Token(Claims),
}

/// Authenticated user (required authentication)
///
/// Rejects the request with 401 if no valid credentials are provided.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub credentials: Credentials,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    /// Claims of the bearer token, if the request carried one
    pub fn claims(&self) -> Option<&Claims> {
        match &self.credentials {
            Credentials::Token(claims) => Some(claims),
            Credentials::Basic => None,
        }
    }
}

/// Authenticate from the Authorization header
///
/// Returns `Ok(None)` when the request carries no credentials at all.
async fn authenticate_parts(
    parts: &mut Parts,
    state: &AppState,
) -> Result<Option<CurrentUser>, ApiError> {
    if let Ok(TypedHeader(Authorization(bearer))) =
        parts.extract::<TypedHeader<Authorization<Bearer>>>().await
    {
        let claims = state.tokens.validate(bearer.token())?;
        let user = state
            .store
            .user(claims.user_id()?)
            .ok_or(ApiError::InvalidToken)?;

        return Ok(Some(CurrentUser {
            user,
            credentials: Credentials::Token(claims),
        }));
    }

    if let Ok(TypedHeader(Authorization(basic))) =
        parts.extract::<TypedHeader<Authorization<Basic>>>().await
    {
        // bcrypt verification blocks, run it off the async workers
        let store = state.store.clone();
        let username = basic.username().to_string();
        let password = basic.password().to_string();
        let user = tokio::task::spawn_blocking(move || {
            auth::authenticate(&store, &username, &password)
        })
        .await??;

        return Ok(Some(CurrentUser {
            user,
            credentials: Credentials::Basic,
        }));
    }

    Ok(None)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate_parts(parts, state)
            .await?
            .ok_or(ApiError::Unauthorized)
    }
}

/// Optional authenticated user extractor
///
/// Yields `None` if no credentials are provided, but rejects invalid ones.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<CurrentUser>);

impl OptionalUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref().map(|current| &current.user)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalUser(authenticate_parts(parts, state).await?))
    }
}

/// Admin-only guard
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(ApiError::Forbidden("Administrator role required".to_string()));
        }

        Ok(AdminUser(user))
    }
}

/// Ask clients to authenticate with HTTP Basic on 401 responses
pub async fn auth_challenge(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    if response.status() == StatusCode::UNAUTHORIZED {
        let challenge = format!("Basic realm=\"{}\"", state.config.server_name.replace('"', ""));
        if let Ok(value) = HeaderValue::from_str(&challenge) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
    }

    response
}

/// Run the spawner once the request has been handled
///
/// Only map data already known is used, so the response never waits on
/// Overpass. A run that is already in progress is not waited for.
pub async fn spawn_after_request(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;

    if state.config.spawn.enabled && state.config.spawn.after_request {
        match spawn::run_if_idle(&state) {
            Some(report) if report.created > 0 => {
                debug!(created = report.created, "Spawned objects after request");
            }
            Some(_) => {}
            None => debug!("Spawner busy, skipping run after request"),
        }
    }

    response
}
