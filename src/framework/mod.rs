//! Game framework
//!
//! Game modules plug into the server through two traits:
//! - [`GameModule`] describes a game package and lists its classes
//! - [`ObjectClass`] attaches behavior to objects carrying a discriminator
//!
//! The default methods of [`ObjectClass`] are the shared base behavior that
//! every player, item and NPC inherits; a game overrides only what it needs.
//! Operations acting on objects live in [`players`], [`items`], [`npcs`]
//! and [`visibility`].

pub mod classes;
pub mod items;
pub mod npcs;
pub mod players;
pub mod registry;
pub mod resources;
pub mod visibility;

use std::sync::Arc;

use crate::model::{Attributes, BaseKind, GameInfo, GameObject};
use crate::spawn::SpawnRule;

pub use classes::{ItemClass, NpcClass, PlayerClass};
pub use registry::GameRegistry;

/// Default collect radius in meters
pub const DEFAULT_COLLECT_RADIUS_M: f64 = 30.0;

/// Default talk radius in meters
pub const DEFAULT_TALK_RADIUS_M: f64 = 20.0;

/// Default avatar of new players
pub const DEFAULT_AVATAR: &str = "default";

/// Server-wide game settings that classes fall back to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameRules {
    pub collect_radius_m: f64,
    pub talk_radius_m: f64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            collect_radius_m: DEFAULT_COLLECT_RADIUS_M,
            talk_radius_m: DEFAULT_TALK_RADIUS_M,
        }
    }
}

/// A pluggable game package
pub trait GameModule: Send + Sync {
    /// Package name, used in discriminators and data paths
    fn package(&self) -> &str;

    /// Game metadata stored in the games table
    fn info(&self) -> GameInfo;

    /// Classes defined by this game
    fn classes(&self) -> Vec<Arc<dyn ObjectClass>>;
}

/// Behavior of one class of game objects
///
/// Hooks that need to know what a player carries get the player's
/// inventory alongside the player object.
pub trait ObjectClass: Send + Sync {
    /// Class name, e.g. `Kangoo`
    fn name(&self) -> &str;

    /// Framework base this class derives from
    fn kind(&self) -> BaseKind;

    fn default_name(&self) -> String {
        self.name().to_string()
    }

    fn default_image(&self) -> String {
        String::new()
    }

    fn default_attributes(&self) -> Attributes {
        Attributes::new()
    }

    fn spawn_rules(&self) -> Vec<SpawnRule> {
        Vec::new()
    }

    fn collectible(&self) -> bool {
        true
    }

    fn handoverable(&self) -> bool {
        true
    }

    fn placeable(&self) -> bool {
        false
    }

    /// Maximum number of objects of this class one player may carry
    fn owned_max(&self) -> Option<usize> {
        None
    }

    fn collect_radius_m(&self, rules: &GameRules) -> f64 {
        rules.collect_radius_m
    }

    fn talk_radius_m(&self, rules: &GameRules) -> f64 {
        rules.talk_radius_m
    }

    /// Game-specific veto on collecting
    fn may_collect(
        &self,
        _item: &GameObject,
        _player: &GameObject,
        _inventory: &[GameObject],
    ) -> bool {
        true
    }

    fn on_collected(&self, _item: &mut GameObject, _player: &GameObject) {}

    fn on_handedover(&self, _item: &mut GameObject, _from: &GameObject, _to: &GameObject) {}

    fn on_placed(&self, _item: &mut GameObject, _player: &GameObject) {}

    /// Game-specific veto on visibility
    fn visible_for(&self, _object: &GameObject, _viewer: &GameObject) -> bool {
        true
    }

    /// Default NPC message
    fn say(&self, _npc: &GameObject) -> String {
        "Hello!".to_string()
    }

    /// Message an NPC answers with when a player talks to it
    fn on_talk(
        &self,
        npc: &GameObject,
        _player: &GameObject,
        _inventory: &[GameObject],
    ) -> String {
        self.say(npc)
    }
}

/// Discriminator of a class, `game_<package>_<Class>` or the bare framework name
pub fn discriminator(package: Option<&str>, class_name: &str) -> String {
    match package {
        Some(package) => format!("game_{}_{}", package, class_name),
        None => class_name.to_string(),
    }
}
