//! Player operations
//!
//! Joining worlds, finding the player a user currently controls, and
//! moving players around.

use tracing::info;

use crate::error::{GameError, Result, StoreError};
use crate::geo::LatLon;
use crate::model::{GameObject, ObjectId, ObjectKind, PlayerState, User, UserId, WorldId};
use crate::store::GameStore;

use super::{GameRegistry, DEFAULT_AVATAR};

/// Make a user join a world and return the player they control there.
///
/// An existing player of the user in that world is reused; otherwise a new
/// one is created from the world's game player class, named after the user.
/// Either way it becomes the user's current player.
pub fn join_world(
    store: &GameStore,
    registry: &GameRegistry,
    user: &User,
    world_id: WorldId,
) -> Result<GameObject> {
    let world = store
        .world(world_id)
        .ok_or(StoreError::WorldNotFound(world_id))?;
    if !world.enabled {
        return Err(GameError::WorldDisabled(world.id).into());
    }

    let player = match store.player_in_world(user.id, world.id) {
        Some(player) => player,
        None => {
            let game = store
                .game(world.game_id)
                .ok_or(StoreError::GameNotFound(world.game_id))?;
            let registered = registry.player_class(&game.package);

            let mut object = GameObject::new(
                registered.type_name,
                world.id,
                LatLon::default(),
                ObjectKind::Player(PlayerState {
                    user_id: user.id,
                    avatar: DEFAULT_AVATAR.to_string(),
                }),
            );
            object.name = user.username.clone();
            object.image = registered.class.default_image();
            object.attributes = registered.class.default_attributes();

            let player = store.insert_object(object)?;
            info!(
                user_id = user.id,
                world_id = world.id,
                player_id = player.id,
                "Player created"
            );
            player
        }
    };

    store.update_user(user.id, |u| u.current_player_id = Some(player.id))?;
    Ok(player)
}

/// The player a user currently controls.
///
/// Falls back to the user's first player, then to joining the first enabled
/// world.
pub fn own_player(
    store: &GameStore,
    registry: &GameRegistry,
    user_id: UserId,
) -> Result<GameObject> {
    let user = store.user(user_id).ok_or(StoreError::UserNotFound(user_id))?;

    if let Some(player) = user
        .current_player_id
        .and_then(|id| store.object(id))
        .filter(|obj| obj.user_id() == Some(user.id))
    {
        return Ok(player);
    }

    if let Some(player) = store.players_of_user(user.id).into_iter().next() {
        store.update_user(user.id, |u| u.current_player_id = Some(player.id))?;
        return Ok(player);
    }

    let world = store
        .worlds()
        .into_iter()
        .find(|w| w.enabled)
        .ok_or(GameError::NoWorld)?;
    join_world(store, registry, &user, world.id)
}

/// Move a player to a new validated position
pub fn move_to(
    store: &GameStore,
    player_id: ObjectId,
    latitude: f64,
    longitude: f64,
) -> Result<GameObject> {
    let position = LatLon::new(latitude, longitude)?;
    ensure_player(store, player_id)?;

    Ok(store.update_object(player_id, |obj| obj.set_position(position))?)
}

/// Change the avatar image of a player
pub fn set_avatar(store: &GameStore, player_id: ObjectId, avatar: &str) -> Result<GameObject> {
    ensure_player(store, player_id)?;

    Ok(store.update_object(player_id, |obj| {
        if let ObjectKind::Player(state) = &mut obj.kind {
            state.avatar = avatar.to_string();
        }
    })?)
}

fn ensure_player(store: &GameStore, player_id: ObjectId) -> Result<GameObject> {
    let object = store
        .object(player_id)
        .ok_or(StoreError::ObjectNotFound(player_id))?;
    if !object.is_player() {
        return Err(GameError::NotAPlayer(player_id).into());
    }
    Ok(object)
}
