//! World endpoints

use axum::{
    extract::{Path, Query, State},
    response::{Redirect, Response},
    Json,
};
use serde::Serialize;

use super::error::ApiError;
use super::listing::{self, ListParams, DEFAULT_PER_PAGE};
use super::middleware::CurrentUser;
use crate::error::StoreError;
use crate::framework::players;
use crate::model::{Game, World, WorldId};
use crate::state::AppState;

/// A world with its game embedded
#[derive(Debug, Serialize)]
pub struct WorldView {
    #[serde(flatten)]
    pub world: World,
    pub game: Option<Game>,
}

impl WorldView {
    fn build(state: &AppState, world: World) -> Self {
        let game = state.store.game(world.game_id);
        Self { world, game }
    }
}

/// GET /api/world
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    let worlds: Vec<WorldView> = state
        .store
        .worlds()
        .into_iter()
        .map(|world| WorldView::build(&state, world))
        .collect();

    listing::respond(worlds, &params, Some(DEFAULT_PER_PAGE))
}

/// GET /api/world/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<WorldId>,
) -> Result<Json<WorldView>, ApiError> {
    let world = state.store.world(id).ok_or(StoreError::WorldNotFound(id))?;
    Ok(Json(WorldView::build(&state, world)))
}

/// GET|POST /api/world/:id/player_join
///
/// Join the world, creating a player on first entry, and make it the
/// user's current player.
pub async fn player_join(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<WorldId>,
) -> Result<Redirect, ApiError> {
    let player = players::join_world(&state.store, &state.registry, &user.user, id)?;
    Ok(Redirect::to(&format!("/api/gameobject_player/{}", player.id)))
}
