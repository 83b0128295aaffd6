//! Installed games

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GameId;

/// Metadata a game module declares about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub license: String,
}

/// A game known to the server.
///
/// Rows are synchronised from the registered game modules at startup;
/// `package` links the row back to its module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub package: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub license: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Game {
    /// Whether this row describes the given package/name/version triple
    pub fn matches(&self, package: &str, info: &GameInfo) -> bool {
        self.package == package && self.name == info.name && self.version == info.version
    }
}
