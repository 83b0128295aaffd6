//! NPC operations

use tracing::debug;

use crate::error::{GameError, Result, StoreError};
use crate::model::ObjectId;
use crate::store::GameStore;

use super::{GameRegistry, GameRules};

/// Talk to an NPC and return what it says
pub fn talk(
    store: &GameStore,
    registry: &GameRegistry,
    rules: &GameRules,
    npc_id: ObjectId,
    player_id: ObjectId,
) -> Result<String> {
    let npc = store
        .object(npc_id)
        .ok_or(StoreError::ObjectNotFound(npc_id))?;
    if !npc.is_npc() {
        return Err(GameError::NotAnNpc(npc_id).into());
    }

    let player = store
        .object(player_id)
        .ok_or(StoreError::ObjectNotFound(player_id))?;
    if !player.is_player() {
        return Err(GameError::NotAPlayer(player_id).into());
    }

    if npc.world_id != player.world_id {
        return Err(GameError::WrongWorld.into());
    }
    if !npc.isonmap {
        return Err(GameError::NotOnMap.into());
    }

    let class = registry.class_of(&npc);
    let distance = npc.distance_to(&player);
    let max = class.talk_radius_m(rules);
    if distance > max {
        return Err(GameError::OutOfRange { distance, max }.into());
    }

    let inventory = store.inventory(player.id);
    let message = class.on_talk(&npc, &player, &inventory);

    debug!(npc_id = npc.id, player_id = player.id, "NPC talked");
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VeripeditusError;
    use crate::geo::LatLon;
    use crate::model::{GameInfo, GameObject, NpcState, ObjectKind, PlayerState};

    fn setup() -> (GameStore, GameRegistry, i64) {
        let store = GameStore::new();
        let info = GameInfo {
            name: "Test".to_string(),
            version: "1".to_string(),
            description: String::new(),
            author: String::new(),
            license: String::new(),
        };
        let game = store.upsert_game("test", &info);
        let world = store.create_world("W", game.id).unwrap();
        (store, GameRegistry::new(), world.id)
    }

    fn spawn(store: &GameStore, world_id: i64, kind: ObjectKind, at: LatLon) -> GameObject {
        let type_name = kind.base().framework_type();
        let mut obj = GameObject::new(type_name, world_id, at, kind);
        obj.name = "Bob".to_string();
        store.insert_object(obj).unwrap()
    }

    #[test]
    fn test_talk_in_range() {
        let (store, registry, world_id) = setup();
        let here = LatLon::raw(50.0, 7.0);
        let npc = spawn(&store, world_id, ObjectKind::Npc(NpcState::default()), here);
        let player = spawn(
            &store,
            world_id,
            ObjectKind::Player(PlayerState {
                user_id: 1,
                avatar: "default".to_string(),
            }),
            here,
        );

        let message = talk(&store, &registry, &GameRules::default(), npc.id, player.id).unwrap();
        assert_eq!(message, "Hello, I am Bob.");

        // Talking to a player is not possible
        let err = talk(&store, &registry, &GameRules::default(), player.id, player.id).unwrap_err();
        assert!(matches!(err, VeripeditusError::Game(GameError::NotAnNpc(_))));
    }

    #[test]
    fn test_talk_out_of_range() {
        let (store, registry, world_id) = setup();
        let npc = spawn(
            &store,
            world_id,
            ObjectKind::Npc(NpcState::default()),
            LatLon::raw(50.0, 7.0),
        );
        let player = spawn(
            &store,
            world_id,
            ObjectKind::Player(PlayerState {
                user_id: 1,
                avatar: "default".to_string(),
            }),
            LatLon::raw(50.01, 7.0),
        );

        let err = talk(&store, &registry, &GameRules::default(), npc.id, player.id).unwrap_err();
        assert!(matches!(
            err,
            VeripeditusError::Game(GameError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_talk_across_worlds() {
        let (store, registry, world_id) = setup();
        let game_id = store.world(world_id).unwrap().game_id;
        let elsewhere = store.create_world("Elsewhere", game_id).unwrap();
        let here = LatLon::raw(50.0, 7.0);

        let npc = spawn(&store, world_id, ObjectKind::Npc(NpcState::default()), here);
        let player = spawn(
            &store,
            elsewhere.id,
            ObjectKind::Player(PlayerState {
                user_id: 1,
                avatar: "default".to_string(),
            }),
            here,
        );

        let err = talk(&store, &registry, &GameRules::default(), npc.id, player.id).unwrap_err();
        assert!(matches!(err, VeripeditusError::Game(GameError::WrongWorld)));
    }
}
