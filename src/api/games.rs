//! Game endpoints

use axum::{
    extract::{Path, Query, State},
    response::{Redirect, Response},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::error::ApiError;
use super::listing::{self, ListParams, DEFAULT_PER_PAGE};
use super::middleware::CurrentUser;
use crate::error::StoreError;
use crate::model::{Game, GameId};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WorldCreateParams {
    pub name: Option<String>,
}

/// GET /api/game
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    listing::respond(state.store.games(), &params, Some(DEFAULT_PER_PAGE))
}

/// GET /api/game/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> Result<Json<Game>, ApiError> {
    let game = state.store.game(id).ok_or(StoreError::GameNotFound(id))?;
    Ok(Json(game))
}

/// GET|POST /api/game/:id/world_create
///
/// Create a world playing this game; the name defaults to the game's name.
pub async fn world_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<GameId>,
    Query(params): Query<WorldCreateParams>,
) -> Result<Redirect, ApiError> {
    let game = state.store.game(id).ok_or(StoreError::GameNotFound(id))?;

    let name = params
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| game.name.clone());

    let world = state.store.create_world(&name, game.id)?;
    info!(
        world_id = world.id,
        game = %game.package,
        user_id = user.user.id,
        "World created"
    );

    Ok(Redirect::to(&format!("/api/world/{}", world.id)))
}
