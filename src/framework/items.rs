//! Item operations
//!
//! Collecting items from the map, handing them to other players and placing
//! them back. Each operation checks and mutates the object table under one
//! write lock so two players cannot collect the same item.

use tracing::info;

use crate::error::{GameError, Result, StoreError};
use crate::model::{GameObject, ObjectId};
use crate::store::{count_owned_in, GameStore, ObjectTable};

use super::{GameRegistry, GameRules};

fn get<'a>(table: &'a ObjectTable, id: ObjectId) -> Result<&'a GameObject> {
    Ok(table.get(&id).ok_or(StoreError::ObjectNotFound(id))?)
}

fn get_player(table: &ObjectTable, id: ObjectId) -> Result<GameObject> {
    let object = get(table, id)?;
    if !object.is_player() {
        return Err(GameError::NotAPlayer(id).into());
    }
    Ok(object.clone())
}

fn get_item(table: &ObjectTable, id: ObjectId) -> Result<GameObject> {
    let object = get(table, id)?;
    if !object.is_item() {
        return Err(GameError::NotAnItem(id).into());
    }
    Ok(object.clone())
}

fn inventory_of(table: &ObjectTable, player_id: ObjectId) -> Vec<GameObject> {
    table
        .values()
        .filter(|obj| obj.is_owned_by(player_id))
        .cloned()
        .collect()
}

/// Check the per-player limit for the item's class
fn check_owned_max(
    table: &ObjectTable,
    owned_max: Option<usize>,
    player_id: ObjectId,
    type_name: &str,
) -> Result<()> {
    if let Some(max) = owned_max {
        if count_owned_in(table, player_id, type_name) >= max {
            return Err(GameError::OwnedMaxReached { max }.into());
        }
    }
    Ok(())
}

/// Let a player pick up an item from the map
pub fn collect(
    store: &GameStore,
    registry: &GameRegistry,
    rules: &GameRules,
    item_id: ObjectId,
    player_id: ObjectId,
) -> Result<GameObject> {
    store.with_objects_mut(|table| -> Result<GameObject> {
        let player = get_player(table, player_id)?;
        let item = get_item(table, item_id)?;

        if item.world_id != player.world_id {
            return Err(GameError::WrongWorld.into());
        }
        if !item.isonmap {
            return Err(GameError::NotOnMap.into());
        }

        let class = registry.class_of(&item);
        if !class.collectible() {
            return Err(GameError::NotCollectible.into());
        }

        let distance = item.distance_to(&player);
        let max = class.collect_radius_m(rules);
        if distance > max {
            return Err(GameError::OutOfRange { distance, max }.into());
        }

        check_owned_max(table, class.owned_max(), player.id, &item.type_name)?;

        let inventory = inventory_of(table, player.id);
        if !class.may_collect(&item, &player, &inventory) {
            let reason = format!("{} cannot be collected now", item.name);
            return Err(GameError::Refused(reason).into());
        }

        let entry = table
            .get_mut(&item_id)
            .ok_or(StoreError::ObjectNotFound(item_id))?;
        entry.set_owner(Some(player.id));
        entry.isonmap = false;
        class.on_collected(entry, &player);
        entry.touch();

        info!(
            item_id = entry.id,
            player_id = player.id,
            type_name = %entry.type_name,
            "Item collected"
        );
        Ok(entry.clone())
    })
}

/// Pass an item from one player's inventory to another player
pub fn handover(
    store: &GameStore,
    registry: &GameRegistry,
    item_id: ObjectId,
    from_id: ObjectId,
    to_id: ObjectId,
) -> Result<GameObject> {
    store.with_objects_mut(|table| -> Result<GameObject> {
        let item = get_item(table, item_id)?;
        let from = get_player(table, from_id)?;
        let to = get_player(table, to_id)?;

        if from.id == to.id {
            let reason = "cannot hand an item over to yourself".to_string();
            return Err(GameError::Refused(reason).into());
        }
        if to.world_id != from.world_id {
            return Err(GameError::WrongWorld.into());
        }

        let class = registry.class_of(&item);
        if !class.handoverable() {
            return Err(GameError::NotHandoverable.into());
        }
        if !item.is_owned_by(from.id) {
            return Err(GameError::NotOwner(from.id).into());
        }

        check_owned_max(table, class.owned_max(), to.id, &item.type_name)?;

        let entry = table
            .get_mut(&item_id)
            .ok_or(StoreError::ObjectNotFound(item_id))?;
        entry.set_owner(Some(to.id));
        class.on_handedover(entry, &from, &to);
        entry.touch();

        info!(
            item_id = entry.id,
            from = from.id,
            to = to.id,
            "Item handed over"
        );
        Ok(entry.clone())
    })
}

/// Put an item from the player's inventory back on the map at the player's position
pub fn place(
    store: &GameStore,
    registry: &GameRegistry,
    item_id: ObjectId,
    player_id: ObjectId,
) -> Result<GameObject> {
    store.with_objects_mut(|table| -> Result<GameObject> {
        let item = get_item(table, item_id)?;
        let player = get_player(table, player_id)?;

        let class = registry.class_of(&item);
        if !class.placeable() {
            return Err(GameError::NotPlaceable.into());
        }
        if !item.is_owned_by(player.id) {
            return Err(GameError::NotOwner(player.id).into());
        }

        let entry = table
            .get_mut(&item_id)
            .ok_or(StoreError::ObjectNotFound(item_id))?;
        entry.set_owner(None);
        entry.set_position(player.position());
        entry.world_id = player.world_id;
        entry.isonmap = true;
        class.on_placed(entry, &player);
        entry.touch();

        info!(
            item_id = entry.id,
            player_id = player.id,
            position = %entry.position(),
            "Item placed"
        );
        Ok(entry.clone())
    })
}
