//! Game object endpoints
//!
//! Listings only contain what the requesting player may see. Objects also
//! expose API methods (`collect`, `talk`, ...) under
//! `/api/gameobject/:id/:method`.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use tracing::{debug, info};

use super::error::ApiError;
use super::listing::{self, ListParams};
use super::middleware::{CurrentUser, OptionalUser};
use super::response::{ListResponse, TalkResponse};
use crate::error::{GameError, StoreError};
use crate::framework::resources::{guess_mime_type, ResourceType};
use crate::framework::{items, npcs, players, visibility};
use crate::geo::LatLon;
use crate::model::{BaseKind, GameObject, ObjectId, User};
use crate::state::AppState;

/// Changes a client may make to an object
#[derive(Debug, Default, Deserialize)]
pub struct ObjectUpdate {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub avatar: Option<String>,
}

/// Player the user is currently playing, without joining any world
fn viewing_player(state: &AppState, user: &User) -> Option<GameObject> {
    user.current_player_id
        .and_then(|id| state.store.object(id))
        .filter(|obj| obj.user_id() == Some(user.id))
        .or_else(|| state.store.players_of_user(user.id).into_iter().next())
}

/// Player acting in an API method call; joins a world if needed
fn acting_player(state: &AppState, user: Option<&CurrentUser>) -> Result<GameObject, ApiError> {
    let user = user.ok_or(ApiError::Unauthorized)?;
    Ok(players::own_player(
        &state.store,
        &state.registry,
        user.user.id,
    )?)
}

fn load_object(state: &AppState, id: ObjectId) -> Result<GameObject, ApiError> {
    Ok(state
        .store
        .object(id)
        .ok_or(StoreError::ObjectNotFound(id))?)
}

fn list_visible(
    state: &AppState,
    user: &OptionalUser,
    params: &ListParams,
    kind: Option<BaseKind>,
) -> Result<Response, ApiError> {
    let objects = state
        .store
        .objects(|obj| kind.map_or(true, |kind| obj.base_kind() == kind));
    let viewer = user.user().and_then(|u| viewing_player(state, u));
    let visible = visibility::filter_visible(&state.store, &state.registry, viewer.as_ref(), objects);

    listing::respond(visible, params, None)
}

/// GET /api/gameobject
pub async fn list(
    State(state): State<AppState>,
    user: OptionalUser,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    list_visible(&state, &user, &params, None)
}

/// GET /api/gameobject_player, /api/gameobject_item, /api/gameobject_npc
pub async fn list_kind(
    State(state): State<AppState>,
    user: OptionalUser,
    Query(params): Query<ListParams>,
    kind: BaseKind,
) -> Result<Response, ApiError> {
    list_visible(&state, &user, &params, Some(kind))
}

/// GET /api/gameobject/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<ObjectId>,
) -> Result<Json<GameObject>, ApiError> {
    Ok(Json(load_object(&state, id)?))
}

/// GET /api/gameobject_<kind>/:id
pub async fn get_kind(
    State(state): State<AppState>,
    Path(id): Path<ObjectId>,
    kind: BaseKind,
) -> Result<Json<GameObject>, ApiError> {
    let object = load_object(&state, id)?;
    if object.base_kind() != kind {
        return Err(ApiError::NotFound(format!("{} {}", kind, id)));
    }
    Ok(Json(object))
}

/// GET /api/gameobject_player/self
pub async fn own_player(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Redirect, ApiError> {
    let player = acting_player(&state, Some(&user))?;
    Ok(Redirect::to(&format!("/api/gameobject_player/{}", player.id)))
}

/// PATCH /api/gameobject/:id
///
/// Players may move their own avatar and change its image; admins may move
/// any object.
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<ObjectId>,
    Json(update): Json<ObjectUpdate>,
) -> Result<Json<GameObject>, ApiError> {
    let object = load_object(&state, id)?;
    let own = object.user_id() == Some(user.user.id);

    if !own && !user.is_admin() {
        return Err(ApiError::Forbidden(
            "Only your own player can be changed".to_string(),
        ));
    }

    let mut object = object;
    match (update.latitude, update.longitude) {
        (Some(latitude), Some(longitude)) => {
            object = if object.is_player() {
                players::move_to(&state.store, id, latitude, longitude)?
            } else {
                let position = LatLon::new(latitude, longitude)?;
                state.store.update_object(id, |obj| obj.set_position(position))?
            };
            debug!(object_id = id, latitude, longitude, "Object moved");
        }
        (None, None) => {}
        _ => {
            return Err(ApiError::InvalidInput(
                "latitude and longitude must be given together".to_string(),
            ))
        }
    }

    if let Some(avatar) = update.avatar.as_deref() {
        object = players::set_avatar(&state.store, id, avatar)?;
    }

    Ok(Json(object))
}

/// GET|POST /api/gameobject/:id/:method
pub async fn call(
    State(state): State<AppState>,
    user: OptionalUser,
    Path((id, method)): Path<(ObjectId, String)>,
) -> Result<Response, ApiError> {
    dispatch(&state, user.0.as_ref(), id, &method, None).await
}

/// GET|POST /api/gameobject/:id/:method/:arg
pub async fn call_with_arg(
    State(state): State<AppState>,
    user: OptionalUser,
    Path((id, method, arg)): Path<(ObjectId, String, String)>,
) -> Result<Response, ApiError> {
    dispatch(&state, user.0.as_ref(), id, &method, Some(&arg)).await
}

async fn dispatch(
    state: &AppState,
    user: Option<&CurrentUser>,
    id: ObjectId,
    method: &str,
    arg: Option<&str>,
) -> Result<Response, ApiError> {
    let object = load_object(state, id)?;

    match method {
        "collect" => {
            let player = acting_player(state, user)?;
            let item = items::collect(&state.store, &state.registry, &state.rules, id, player.id)?;
            info!(item_id = id, player_id = player.id, "Item collected");
            Ok(Json(item).into_response())
        }
        "handover" => {
            let to = arg
                .ok_or_else(|| ApiError::InvalidInput("handover needs a target player".to_string()))?
                .parse::<ObjectId>()
                .map_err(|_| ApiError::InvalidInput("Invalid target player id".to_string()))?;
            let player = acting_player(state, user)?;
            let item = items::handover(&state.store, &state.registry, id, player.id, to)?;
            info!(item_id = id, from = player.id, to, "Item handed over");
            Ok(Json(item).into_response())
        }
        "place" => {
            let player = acting_player(state, user)?;
            let item = items::place(&state.store, &state.registry, id, player.id)?;
            info!(item_id = id, player_id = player.id, "Item placed");
            Ok(Json(item).into_response())
        }
        "talk" => {
            let player = acting_player(state, user)?;
            let message = npcs::talk(&state.store, &state.registry, &state.rules, id, player.id)?;
            Ok(Json(TalkResponse {
                npc_id: id,
                message,
            })
            .into_response())
        }
        "image" => image(state, &object).await,
        "inventory" => {
            if !object.is_player() {
                return Err(GameError::NotAPlayer(id).into());
            }
            let inventory = state.store.inventory(id);
            Ok(Json(ListResponse::paginate(inventory, 1, None)).into_response())
        }
        other => Err(ApiError::NotFound(format!("Method {}", other))),
    }
}

/// Serve the image file of an object
///
/// Images live in the data directory of the class's game, falling back to
/// the game of the object's world for framework classes.
async fn image(state: &AppState, object: &GameObject) -> Result<Response, ApiError> {
    if object.image.is_empty() {
        return Err(ApiError::NotFound(format!("Image of game object {}", object.id)));
    }

    let package = match state.registry.package_of(&object.type_name) {
        Some(package) => package.to_string(),
        None => state
            .store
            .world(object.world_id)
            .and_then(|world| state.store.game(world.game_id))
            .map(|game| game.package)
            .ok_or(StoreError::WorldNotFound(object.world_id))?,
    };

    let data = state
        .resources
        .load(&package, ResourceType::Image, &object.image)
        .await?;
    let mime = guess_mime_type(&data);

    Ok(([(header::CONTENT_TYPE, mime)], data).into_response())
}
