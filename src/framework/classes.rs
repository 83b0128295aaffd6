//! Declarative object classes
//!
//! Most game classes only differ from the framework base in a few
//! constants. These builders implement [`ObjectClass`] from plain values so
//! such games need no custom trait implementations.

use crate::model::{Attributes, BaseKind, GameObject};
use crate::spawn::SpawnRule;

use super::{GameRules, ObjectClass};

/// Player class built from constants
#[derive(Debug, Clone)]
pub struct PlayerClass {
    name: String,
    image: String,
    attributes: Attributes,
}

impl PlayerClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: String::new(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl ObjectClass for PlayerClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BaseKind {
        BaseKind::Player
    }

    fn default_image(&self) -> String {
        self.image.clone()
    }

    fn default_attributes(&self) -> Attributes {
        self.attributes.clone()
    }

    // Players are never picked up
    fn collectible(&self) -> bool {
        false
    }

    fn handoverable(&self) -> bool {
        false
    }
}

/// Item class built from constants
#[derive(Debug, Clone)]
pub struct ItemClass {
    name: String,
    default_name: Option<String>,
    image: String,
    attributes: Attributes,
    spawn_rules: Vec<SpawnRule>,
    collectible: bool,
    handoverable: bool,
    placeable: bool,
    owned_max: Option<usize>,
    collect_radius_m: Option<f64>,
}

impl ItemClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_name: None,
            image: String::new(),
            attributes: Attributes::new(),
            spawn_rules: Vec::new(),
            collectible: true,
            handoverable: true,
            placeable: false,
            owned_max: None,
            collect_radius_m: None,
        }
    }

    /// Display name of new objects (defaults to the class name)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = Some(name.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_spawn(mut self, rule: SpawnRule) -> Self {
        self.spawn_rules.push(rule);
        self
    }

    pub fn with_collectible(mut self, collectible: bool) -> Self {
        self.collectible = collectible;
        self
    }

    pub fn with_handoverable(mut self, handoverable: bool) -> Self {
        self.handoverable = handoverable;
        self
    }

    pub fn with_placeable(mut self, placeable: bool) -> Self {
        self.placeable = placeable;
        self
    }

    pub fn with_owned_max(mut self, max: usize) -> Self {
        self.owned_max = Some(max);
        self
    }

    pub fn with_collect_radius(mut self, radius_m: f64) -> Self {
        self.collect_radius_m = Some(radius_m);
        self
    }
}

impl ObjectClass for ItemClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BaseKind {
        BaseKind::Item
    }

    fn default_name(&self) -> String {
        self.default_name.clone().unwrap_or_else(|| self.name.clone())
    }

    fn default_image(&self) -> String {
        self.image.clone()
    }

    fn default_attributes(&self) -> Attributes {
        self.attributes.clone()
    }

    fn spawn_rules(&self) -> Vec<SpawnRule> {
        self.spawn_rules.clone()
    }

    fn collectible(&self) -> bool {
        self.collectible
    }

    fn handoverable(&self) -> bool {
        self.handoverable
    }

    fn placeable(&self) -> bool {
        self.placeable
    }

    fn owned_max(&self) -> Option<usize> {
        self.owned_max
    }

    fn collect_radius_m(&self, rules: &GameRules) -> f64 {
        self.collect_radius_m.unwrap_or(rules.collect_radius_m)
    }
}

/// NPC class built from constants
#[derive(Debug, Clone)]
pub struct NpcClass {
    name: String,
    default_name: Option<String>,
    image: String,
    attributes: Attributes,
    spawn_rules: Vec<SpawnRule>,
    message: Option<String>,
    talk_radius_m: Option<f64>,
}

impl NpcClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_name: None,
            image: String::new(),
            attributes: Attributes::new(),
            spawn_rules: Vec::new(),
            message: None,
            talk_radius_m: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = Some(name.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_spawn(mut self, rule: SpawnRule) -> Self {
        self.spawn_rules.push(rule);
        self
    }

    /// Fixed message the NPC says
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_talk_radius(mut self, radius_m: f64) -> Self {
        self.talk_radius_m = Some(radius_m);
        self
    }
}

impl ObjectClass for NpcClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BaseKind {
        BaseKind::Npc
    }

    fn default_name(&self) -> String {
        self.default_name.clone().unwrap_or_else(|| self.name.clone())
    }

    fn default_image(&self) -> String {
        self.image.clone()
    }

    fn default_attributes(&self) -> Attributes {
        self.attributes.clone()
    }

    fn spawn_rules(&self) -> Vec<SpawnRule> {
        self.spawn_rules.clone()
    }

    fn collectible(&self) -> bool {
        false
    }

    fn handoverable(&self) -> bool {
        false
    }

    fn talk_radius_m(&self, rules: &GameRules) -> f64 {
        self.talk_radius_m.unwrap_or(rules.talk_radius_m)
    }

    fn say(&self, npc: &GameObject) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => format!("Hello, I am {}.", npc.name),
        }
    }
}
