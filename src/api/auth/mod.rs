//! Authentication API module
//!
//! This module provides HTTP endpoints for user authentication:
//! - POST /api/auth/register - Create new user account
//! - POST /api/auth/login - Authenticate and get JWT token
//! - POST /api/auth/logout - Revoke the presented token
//! - GET /api/auth/session - Validate current session
//!
//! Every other endpoint also accepts HTTP Basic credentials, so clients
//! may skip the token dance entirely.

pub mod handlers;

pub use handlers::{LoginRequest, RegisterRequest};
