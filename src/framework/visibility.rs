//! Per-player visibility
//!
//! Decides which objects a player gets to see in listings:
//! - objects off the map (carried in an inventory) are hidden
//! - items of a class the viewer already carries `owned_max` of are hidden
//! - the class `visible_for` hook may hide anything else
//! - a player always sees their own avatar

use crate::model::GameObject;
use crate::store::GameStore;

use super::GameRegistry;

/// Check whether `viewer` may see `object`
///
/// `inventory` holds the items the viewer carries.
pub fn is_visible_for(
    registry: &GameRegistry,
    object: &GameObject,
    viewer: &GameObject,
    inventory: &[GameObject],
) -> bool {
    if object.id == viewer.id {
        return true;
    }
    if !object.isonmap {
        return false;
    }

    let class = registry.class_of(object);

    if object.is_item() {
        if let Some(max) = class.owned_max() {
            let owned = inventory
                .iter()
                .filter(|item| item.type_name == object.type_name)
                .count();
            if owned >= max {
                return false;
            }
        }
    }

    class.visible_for(object, viewer)
}

/// Filter a listing down to what a viewer may see
///
/// Anonymous requests only see objects on the map.
pub fn filter_visible(
    store: &GameStore,
    registry: &GameRegistry,
    viewer: Option<&GameObject>,
    objects: Vec<GameObject>,
) -> Vec<GameObject> {
    match viewer {
        Some(viewer) => {
            let inventory = store.inventory(viewer.id);
            objects
                .into_iter()
                .filter(|obj| is_visible_for(registry, obj, viewer, &inventory))
                .collect()
        }
        None => objects.into_iter().filter(|obj| obj.isonmap).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::{GameModule, ItemClass, ObjectClass};
    use crate::geo::LatLon;
    use crate::model::{BaseKind, GameInfo, ItemState, ObjectKind, PlayerState};
    use std::sync::Arc;

    struct Secretive;

    impl ObjectClass for Secretive {
        fn name(&self) -> &str {
            "Secret"
        }

        fn kind(&self) -> BaseKind {
            BaseKind::Item
        }

        // Only players named "agent" see secrets
        fn visible_for(&self, _object: &GameObject, viewer: &GameObject) -> bool {
            viewer.name == "agent"
        }
    }

    struct Game;

    impl GameModule for Game {
        fn package(&self) -> &str {
            "vis"
        }

        fn info(&self) -> GameInfo {
            GameInfo {
                name: "Visibility".to_string(),
                version: "1".to_string(),
                description: String::new(),
                author: String::new(),
                license: String::new(),
            }
        }

        fn classes(&self) -> Vec<Arc<dyn ObjectClass>> {
            vec![
                Arc::new(ItemClass::new("Gem").with_owned_max(1)),
                Arc::new(Secretive),
            ]
        }
    }

    fn registry() -> GameRegistry {
        let mut registry = GameRegistry::new();
        registry.register(Arc::new(Game));
        registry
    }

    fn object(id: i64, type_name: &str, kind: ObjectKind) -> GameObject {
        let mut obj = GameObject::new(type_name, 1, LatLon::default(), kind);
        obj.id = id;
        obj
    }

    fn player(id: i64, name: &str) -> GameObject {
        let mut obj = object(
            id,
            "Player",
            ObjectKind::Player(PlayerState {
                user_id: id,
                avatar: "default".to_string(),
            }),
        );
        obj.name = name.to_string();
        obj
    }

    fn item(id: i64, type_name: &str) -> GameObject {
        object(id, type_name, ObjectKind::Item(ItemState::default()))
    }

    #[test]
    fn test_off_map_hidden_but_self_visible() {
        let registry = registry();
        let mut me = player(1, "me");
        me.isonmap = false;
        assert!(is_visible_for(&registry, &me, &me, &[]));

        let mut carried = item(2, "game_vis_Gem");
        carried.isonmap = false;
        assert!(!is_visible_for(&registry, &carried, &me, &[]));
    }

    #[test]
    fn test_owned_max_hides_more() {
        let registry = registry();
        let me = player(1, "me");
        let gem = item(2, "game_vis_Gem");
        assert!(is_visible_for(&registry, &gem, &me, &[]));

        let mut mine = item(3, "game_vis_Gem");
        mine.set_owner(Some(me.id));
        mine.isonmap = false;
        assert!(!is_visible_for(&registry, &gem, &me, &[mine]));
    }

    #[test]
    fn test_class_hook_veto() {
        let registry = registry();
        let secret = item(2, "game_vis_Secret");
        assert!(!is_visible_for(&registry, &secret, &player(1, "me"), &[]));
        assert!(is_visible_for(&registry, &secret, &player(3, "agent"), &[]));
    }
}
