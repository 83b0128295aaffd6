//! Drink demo game
//!
//! Beer spawns at real pubs, bars and beer gardens, water at drinking
//! fountains. A bartender standing on the market square comments on how
//! much the player carries.

use std::sync::Arc;

use crate::framework::{discriminator, GameModule, GameRules, ItemClass, ObjectClass, PlayerClass};
use crate::geo::Polygon;
use crate::model::{BaseKind, GameInfo, GameObject};
use crate::osm::TagQuery;
use crate::spawn::SpawnRule;

pub const PACKAGE: &str = "drink";

/// Radius around players in which drinks appear at map features
const FEATURE_RADIUS_M: f64 = 1000.0;

/// Beers a player may carry at once
const MAX_BEERS: usize = 6;

pub struct DrinkGame;

impl GameModule for DrinkGame {
    fn package(&self) -> &str {
        PACKAGE
    }

    fn info(&self) -> GameInfo {
        GameInfo {
            name: "Drink".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Collect drinks at real pubs and fountains".to_string(),
            author: "Veripeditus Team".to_string(),
            license: "AGPL".to_string(),
        }
    }

    fn classes(&self) -> Vec<Arc<dyn ObjectClass>> {
        vec![
            Arc::new(PlayerClass::new("Player").with_image("avatar_drinker")),
            Arc::new(
                ItemClass::new("Beer")
                    .with_image("beer")
                    .with_owned_max(MAX_BEERS)
                    .with_placeable(true)
                    .with_spawn(SpawnRule::osm(
                        TagQuery::one_of("amenity", &["pub", "bar", "biergarten"]),
                        FEATURE_RADIUS_M,
                        1,
                    )),
            ),
            Arc::new(
                ItemClass::new("Water")
                    .with_image("water")
                    .with_handoverable(false)
                    .with_spawn(SpawnRule::osm(
                        TagQuery::equals("amenity", "drinking_water"),
                        FEATURE_RADIUS_M,
                        1,
                    )),
            ),
            Arc::new(Bartender),
        ]
    }
}

/// NPC greeting players according to their beer count
pub struct Bartender;

impl Bartender {
    /// Market square in Bonn
    fn bar_area() -> Polygon {
        Polygon::from_pairs(&[
            (50.73545, 7.10005),
            (50.73545, 7.10175),
            (50.73460, 7.10175),
            (50.73460, 7.10005),
        ])
    }
}

impl ObjectClass for Bartender {
    fn name(&self) -> &str {
        "Bartender"
    }

    fn kind(&self) -> BaseKind {
        BaseKind::Npc
    }

    fn default_name(&self) -> String {
        "Moe".to_string()
    }

    fn default_image(&self) -> String {
        "bartender".to_string()
    }

    fn spawn_rules(&self) -> Vec<SpawnRule> {
        vec![SpawnRule::polygon(Self::bar_area(), 1)]
    }

    fn collectible(&self) -> bool {
        false
    }

    fn handoverable(&self) -> bool {
        false
    }

    fn talk_radius_m(&self, rules: &GameRules) -> f64 {
        rules.talk_radius_m * 2.0
    }

    fn say(&self, _npc: &GameObject) -> String {
        "What can I get you?".to_string()
    }

    fn on_talk(&self, npc: &GameObject, player: &GameObject, inventory: &[GameObject]) -> String {
        let beer = discriminator(Some(PACKAGE), "Beer");
        let beers = inventory.iter().filter(|item| item.type_name == beer).count();

        match beers {
            0 => self.say(npc),
            1 | 2 => format!("Enjoy your beer, {}!", player.name),
            n if n < MAX_BEERS => {
                format!("{} beers? Save some for the others, {}.", n, player.name)
            }
            _ => format!("I think you have had enough, {}.", player.name),
        }
    }
}
