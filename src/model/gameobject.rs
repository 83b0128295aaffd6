//! Game objects
//!
//! Every object on the map is one `GameObject` row. The `type_name`
//! discriminator names the class the object was created from (see
//! [`crate::framework::registry`]), while `kind` holds the state that only
//! makes sense for players, items or NPCs.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ObjectId, UserId, WorldId};
use crate::geo::LatLon;

/// Free-form key/value attributes attached to an object
pub type Attributes = BTreeMap<String, String>;

/// The framework base a class derives from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseKind {
    Player,
    Item,
    Npc,
}

impl BaseKind {
    /// Discriminator used for objects of the bare framework class
    pub fn framework_type(&self) -> &'static str {
        match self {
            BaseKind::Player => "Player",
            BaseKind::Item => "Item",
            BaseKind::Npc => "NPC",
        }
    }

    /// Name of the REST resource listing objects of this kind
    pub fn resource(&self) -> &'static str {
        match self {
            BaseKind::Player => "gameobject_player",
            BaseKind::Item => "gameobject_item",
            BaseKind::Npc => "gameobject_npc",
        }
    }

    pub fn from_resource(resource: &str) -> Option<Self> {
        match resource {
            "gameobject_player" => Some(BaseKind::Player),
            "gameobject_item" => Some(BaseKind::Item),
            "gameobject_npc" => Some(BaseKind::Npc),
            _ => None,
        }
    }
}

impl fmt::Display for BaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.framework_type())
    }
}

/// State of a player avatar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub user_id: UserId,
    pub avatar: String,
}

/// State of an item
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemState {
    /// Player object currently carrying the item
    pub owner_id: Option<ObjectId>,
}

/// State of an NPC
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NpcState {}

/// Kind-specific part of a game object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gameobject_type")]
pub enum ObjectKind {
    #[serde(rename = "gameobject_player")]
    Player(PlayerState),
    #[serde(rename = "gameobject_item")]
    Item(ItemState),
    #[serde(rename = "gameobject_npc")]
    Npc(NpcState),
}

impl ObjectKind {
    pub fn base(&self) -> BaseKind {
        match self {
            ObjectKind::Player(_) => BaseKind::Player,
            ObjectKind::Item(_) => BaseKind::Item,
            ObjectKind::Npc(_) => BaseKind::Npc,
        }
    }
}

/// Any object placed in a world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObject {
    pub id: ObjectId,
    /// Class discriminator, e.g. `game_test_Kangoo`
    #[serde(rename = "type")]
    pub type_name: String,
    pub world_id: WorldId,
    pub name: String,
    pub image: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Whether the object is shown on the map (items in an inventory are not)
    pub isonmap: bool,
    #[serde(default)]
    pub attributes: Attributes,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: ObjectKind,
}

impl GameObject {
    /// Create an unsaved object; the store assigns the id on insert
    pub fn new(
        type_name: impl Into<String>,
        world_id: WorldId,
        position: LatLon,
        kind: ObjectKind,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            type_name: type_name.into(),
            world_id,
            name: String::new(),
            image: String::new(),
            latitude: position.latitude,
            longitude: position.longitude,
            isonmap: true,
            attributes: Attributes::new(),
            created: now,
            updated: now,
            kind,
        }
    }

    pub fn position(&self) -> LatLon {
        LatLon::raw(self.latitude, self.longitude)
    }

    pub fn set_position(&mut self, position: LatLon) {
        self.latitude = position.latitude;
        self.longitude = position.longitude;
    }

    /// Distance to another object in meters
    pub fn distance_to(&self, other: &GameObject) -> f64 {
        self.position().distance_to(&other.position())
    }

    pub fn base_kind(&self) -> BaseKind {
        self.kind.base()
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, ObjectKind::Player(_))
    }

    pub fn is_item(&self) -> bool {
        matches!(self.kind, ObjectKind::Item(_))
    }

    pub fn is_npc(&self) -> bool {
        matches!(self.kind, ObjectKind::Npc(_))
    }

    /// User controlling this object, for players
    pub fn user_id(&self) -> Option<UserId> {
        match &self.kind {
            ObjectKind::Player(state) => Some(state.user_id),
            _ => None,
        }
    }

    /// Player carrying this object, for items
    pub fn owner_id(&self) -> Option<ObjectId> {
        match &self.kind {
            ObjectKind::Item(state) => state.owner_id,
            _ => None,
        }
    }

    pub fn is_owned_by(&self, player_id: ObjectId) -> bool {
        self.owner_id() == Some(player_id)
    }

    pub fn set_owner(&mut self, owner: Option<ObjectId>) {
        if let ObjectKind::Item(state) = &mut self.kind {
            state.owner_id = owner;
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Bump the update timestamp
    pub fn touch(&mut self) {
        self.updated = Utc::now();
    }
}
