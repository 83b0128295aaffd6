//! Worlds

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GameId, WorldId};

/// A gaming world with a specific game; groups game objects together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub id: WorldId,
    pub name: String,
    pub enabled: bool,
    pub game_id: GameId,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}
