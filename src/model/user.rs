//! User accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ObjectId, UserId};

/// Role of an account on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Regular player
    #[default]
    Player,
    /// Server administrator
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Player => "PLAYER",
            Role::Admin => "ADMIN",
        }
    }

    /// Parse a stored role, unknown values fall back to `Player`
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "ADMIN" => Role::Admin,
            _ => Role::Player,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// A user account.
///
/// This is not a player object; it authenticates requests and links
/// to the player objects the user controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// bcrypt hash, never sent to clients
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub name: String,
    pub email: Option<String>,
    pub current_player_id: Option<ObjectId>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
