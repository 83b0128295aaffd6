//! API response types for consistent JSON responses

use serde::Serialize;

use crate::model::User;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful response with data
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create a successful response without data
    pub fn success_message(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

/// A page of a collection
#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    /// Number of results across all pages
    pub num_results: usize,
    pub objects: Vec<T>,
    /// Current page, starting at 1
    pub page: usize,
    pub total_pages: usize,
}

impl<T: Serialize> ListResponse<T> {
    /// Cut one page out of a complete result list
    ///
    /// `per_page` of `None` returns everything on a single page.
    pub fn paginate(mut items: Vec<T>, page: usize, per_page: Option<usize>) -> Self {
        let num_results = items.len();

        let Some(per_page) = per_page.filter(|&n| n > 0) else {
            return Self {
                num_results,
                objects: items,
                page: 1,
                total_pages: 1,
            };
        };

        let page = page.max(1);
        let total_pages = num_results.div_ceil(per_page);
        // `page` comes straight from the query string
        let start = page.saturating_sub(1).saturating_mul(per_page).min(num_results);
        let end = start.saturating_add(per_page).min(num_results);

        Self {
            num_results,
            objects: items.drain(start..end).collect(),
            page,
            total_pages,
        }
    }
}

/// Authentication response returned after login/register
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    /// JWT access token
    pub token: String,
    pub user: User,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

impl AuthResponse {
    pub fn success(token: String, user: User, expires_in: i64) -> Self {
        Self {
            success: true,
            message: "Authentication successful".to_string(),
            token,
            user,
            expires_in,
        }
    }

    pub fn registered(token: String, user: User, expires_in: i64) -> Self {
        Self {
            success: true,
            message: "Registration successful".to_string(),
            token,
            user,
            expires_in,
        }
    }
}

/// Session validation response
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Token expiration timestamp (RFC 3339), absent for Basic authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl SessionInfo {
    pub fn valid(user: User, expires_at: Option<String>) -> Self {
        Self {
            valid: true,
            user: Some(user),
            expires_at,
        }
    }
}

/// Message spoken by an NPC
#[derive(Debug, Serialize)]
pub struct TalkResponse {
    pub npc_id: i64,
    pub message: String,
}
