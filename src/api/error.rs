//! API error types and response handling
//!
//! Domain errors are mapped onto HTTP status codes here so every endpoint
//! answers failures with the same JSON body.

use std::collections::HashMap;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{AuthError, GameError, ResourceError, StoreError, VeripeditusError};

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Whether the request was successful (always false for errors)
    pub success: bool,
    pub message: String,
    /// Error code for programmatic handling
    pub code: String,
    /// Field-level validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<HashMap<String, String>>,
}

/// API error type
#[derive(Debug)]
pub enum ApiError {
    // Authentication errors
    Unauthorized,
    InvalidCredentials,
    InvalidToken,
    TokenExpired,
    Forbidden(String),

    // Validation errors
    ValidationError(HashMap<String, String>),
    InvalidInput(String),

    // Data errors
    NotFound(String),
    Conflict(String),

    // External service errors
    BadGateway(String),

    // Server errors
    DatabaseError(String),
    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized => write!(f, "Authentication required"),
            ApiError::InvalidCredentials => write!(f, "Invalid username or password"),
            ApiError::InvalidToken => write!(f, "Invalid or malformed token"),
            ApiError::TokenExpired => write!(f, "Token has expired"),
            ApiError::Forbidden(msg) => write!(f, "{}", msg),
            ApiError::ValidationError(_) => write!(f, "Validation failed"),
            ApiError::InvalidInput(msg) => write!(f, "{}", msg),
            ApiError::NotFound(resource) => write!(f, "{} not found", resource),
            ApiError::Conflict(msg) => write!(f, "{}", msg),
            ApiError::BadGateway(msg) => write!(f, "Upstream error: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::TokenExpired => "TOKEN_EXPIRED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();
        let message = self.to_string();

        let errors = match self {
            ApiError::ValidationError(errs) => Some(errs),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            message,
            code,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

// Conversion implementations for domain errors

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::InvalidToken | AuthError::TokenRevoked => ApiError::InvalidToken,
            AuthError::TokenExpired => ApiError::TokenExpired,
            AuthError::InvalidUsername | AuthError::InvalidPassword => {
                ApiError::InvalidInput(err.to_string())
            }
            AuthError::Forbidden => ApiError::Forbidden(err.to_string()),
            AuthError::HashingFailed => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken(_)
            | StoreError::WorldNameTaken(_)
            | StoreError::PlayerNameTaken { .. } => ApiError::Conflict(err.to_string()),
            StoreError::UserNotFound(id) => ApiError::NotFound(format!("User {}", id)),
            StoreError::GameNotFound(id) => ApiError::NotFound(format!("Game {}", id)),
            StoreError::WorldNotFound(id) => ApiError::NotFound(format!("World {}", id)),
            StoreError::ObjectNotFound(id) => ApiError::NotFound(format!("Game object {}", id)),
        }
    }
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        match err {
            // The object exists but does not offer the requested method
            GameError::NotAPlayer(_)
            | GameError::NotAnItem(_)
            | GameError::NotAnNpc(_)
            | GameError::UnknownClass(_)
            | GameError::UnknownGame(_)
            | GameError::NoWorld => ApiError::NotFound(err.to_string()),
            GameError::InvalidLocation { .. } => ApiError::InvalidInput(err.to_string()),
            GameError::WorldDisabled(_)
            | GameError::WrongWorld
            | GameError::NotOnMap
            | GameError::NotCollectible
            | GameError::NotHandoverable
            | GameError::NotPlaceable
            | GameError::NotOwner(_)
            | GameError::OutOfRange { .. }
            | GameError::OwnedMaxReached { .. }
            | GameError::Refused(_) => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<ResourceError> for ApiError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::NoSuchResource {
                package,
                restype,
                basename,
            } => ApiError::NotFound(format!("Resource {}/{}/{}", package, restype, basename)),
            ResourceError::UnknownType(_) | ResourceError::InvalidName(_) => {
                ApiError::InvalidInput(err.to_string())
            }
        }
    }
}

impl From<VeripeditusError> for ApiError {
    fn from(err: VeripeditusError) -> Self {
        match err {
            VeripeditusError::Game(e) => e.into(),
            VeripeditusError::Auth(e) => e.into(),
            VeripeditusError::Store(e) => e.into(),
            VeripeditusError::Resource(e) => e.into(),
            VeripeditusError::Osm(e) => {
                tracing::warn!("OSM error: {}", e);
                ApiError::BadGateway(e.to_string())
            }
            VeripeditusError::Database(e) => e.into(),
            VeripeditusError::Io(e) => {
                tracing::error!("I/O error: {:?}", e);
                ApiError::InternalError(e.to_string())
            }
            VeripeditusError::Config(msg) | VeripeditusError::Internal(msg) => {
                ApiError::InternalError(msg)
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);

        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource".to_string()),
            sqlx::Error::Database(db_err) => {
                // PostgreSQL unique violation
                if db_err.code().as_deref() == Some("23505") {
                    return ApiError::Conflict(db_err.message().to_string());
                }
                ApiError::DatabaseError(db_err.message().to_string())
            }
            _ => ApiError::DatabaseError(err.to_string()),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::warn!("JWT error: {:?}", err);
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::TokenExpired,
            _ => ApiError::InvalidToken,
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        tracing::error!("Bcrypt error: {:?}", err);
        ApiError::InternalError("Password hashing failed".to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors = HashMap::new();

        for (field, field_errors) in err.field_errors() {
            if let Some(first_error) = field_errors.first() {
                let message = first_error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                errors.insert(field.to_string(), message);
            }
        }

        ApiError::ValidationError(errors)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Blocking task failed: {:?}", err);
        ApiError::InternalError("Background task failed".to_string())
    }
}
