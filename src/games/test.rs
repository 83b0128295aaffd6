//! Veripeditus test game
//!
//! A deliberately small game: players and a kangaroo that lives at (0, 0).

use std::sync::Arc;

use crate::framework::{GameModule, ItemClass, ObjectClass, PlayerClass};
use crate::geo::LatLon;
use crate::model::GameInfo;
use crate::spawn::SpawnRule;

pub const PACKAGE: &str = "test";

pub struct TestGame;

impl GameModule for TestGame {
    fn package(&self) -> &str {
        PACKAGE
    }

    fn info(&self) -> GameInfo {
        GameInfo {
            name: "Veripeditus Test Game".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "A useless test game bundled with the server framework".to_string(),
            author: "Veripeditus Team".to_string(),
            license: "AGPL".to_string(),
        }
    }

    fn classes(&self) -> Vec<Arc<dyn ObjectClass>> {
        vec![
            Arc::new(PlayerClass::new("Player")),
            Arc::new(
                ItemClass::new("Kangoo")
                    .with_name("Kangoo")
                    .with_image("avatar_kangaroo")
                    .with_owned_max(3)
                    .with_spawn(SpawnRule::point(LatLon::raw(0.0, 0.0), 1)),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BaseKind;

    #[test]
    fn test_kangoo_class() {
        let classes = TestGame.classes();
        let kangoo = classes.iter().find(|c| c.name() == "Kangoo").unwrap();
        assert_eq!(kangoo.kind(), BaseKind::Item);
        assert_eq!(kangoo.owned_max(), Some(3));
        assert_eq!(kangoo.default_name(), "Kangoo");
        assert_eq!(kangoo.default_image(), "avatar_kangaroo");
        assert_eq!(kangoo.spawn_rules().len(), 1);
        assert_eq!(TestGame.info().name, "Veripeditus Test Game");
    }
}
