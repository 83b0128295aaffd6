//! User endpoints
//!
//! Users are listed together with a summary of the players they control.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::Serialize;

use super::error::ApiError;
use super::listing::{self, ListParams, DEFAULT_PER_PAGE};
use crate::error::StoreError;
use crate::model::{GameObject, ObjectId, ObjectKind, User, UserId, WorldId};
use crate::state::AppState;

/// Player of a user as shown in user listings
#[derive(Debug, Serialize)]
pub struct PlayerSummary {
    pub id: ObjectId,
    pub name: String,
    pub world_id: WorldId,
    pub latitude: f64,
    pub longitude: f64,
    pub avatar: String,
}

impl PlayerSummary {
    fn from_object(object: &GameObject) -> Option<Self> {
        let ObjectKind::Player(state) = &object.kind else {
            return None;
        };
        Some(Self {
            id: object.id,
            name: object.name.clone(),
            world_id: object.world_id,
            latitude: object.latitude,
            longitude: object.longitude,
            avatar: state.avatar.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub players: Vec<PlayerSummary>,
}

impl UserView {
    fn build(state: &AppState, user: User) -> Self {
        let players = state
            .store
            .players_of_user(user.id)
            .iter()
            .filter_map(PlayerSummary::from_object)
            .collect();
        Self { user, players }
    }
}

/// GET /api/user
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    let users: Vec<UserView> = state
        .store
        .users()
        .into_iter()
        .map(|user| UserView::build(&state, user))
        .collect();

    listing::respond(users, &params, Some(DEFAULT_PER_PAGE))
}

/// GET /api/user/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<UserView>, ApiError> {
    let user = state.store.user(id).ok_or(StoreError::UserNotFound(id))?;
    Ok(Json(UserView::build(&state, user)))
}
