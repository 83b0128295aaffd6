//! Data model
//!
//! Core entities of the server:
//! - `User` - login account, linked to one active player
//! - `Game` - an installed game module as recorded in the data store
//! - `World` - a named play session of one game
//! - `GameObject` - anything placed on the map (player avatars, items, NPCs)

pub mod game;
pub mod gameobject;
pub mod user;
pub mod world;

pub use game::{Game, GameInfo};
pub use gameobject::{Attributes, BaseKind, GameObject, ItemState, NpcState, ObjectKind, PlayerState};
pub use user::{Role, User};
pub use world::World;

/// Identifier of a user row
pub type UserId = i64;

/// Identifier of a game row
pub type GameId = i64;

/// Identifier of a world row
pub type WorldId = i64;

/// Identifier of a game object row
pub type ObjectId = i64;
