//! REST API of the game server
//!
//! This module provides HTTP endpoints for:
//! - authentication (login, register, logout, session)
//! - users, games and worlds
//! - game objects, their visibility-filtered listings and API methods
//!
//! Every request may authenticate with HTTP Basic or a bearer token. After
//! each request the spawner runs when enabled.

pub mod auth;
pub mod error;
pub mod filter;
pub mod gameobjects;
pub mod games;
pub mod listing;
pub mod middleware;
pub mod response;
pub mod users;
pub mod worlds;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderName, StatusCode},
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;

use self::error::ApiError;
use self::listing::ListParams;
use self::middleware::{AdminUser, OptionalUser};
use self::response::ApiResponse;
use crate::model::{BaseKind, ObjectId};
use crate::spawn::{self, SpawnReport};
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create the application router with all endpoints and layers
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::handlers::register))
        .route("/login", post(auth::handlers::login))
        .route("/logout", post(auth::handlers::logout))
        .route("/session", get(auth::handlers::session));

    let admin_routes = Router::new()
        .route("/save", post(admin_save))
        .route("/spawn", post(admin_spawn));

    let mut api_routes = Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .route("/user", get(users::list))
        .route("/user/:id", get(users::get))
        .route("/game", get(games::list))
        .route("/game/:id", get(games::get))
        .route(
            "/game/:id/world_create",
            get(games::world_create).post(games::world_create),
        )
        .route("/world", get(worlds::list))
        .route("/world/:id", get(worlds::get))
        .route(
            "/world/:id/player_join",
            get(worlds::player_join).post(worlds::player_join),
        )
        .route("/gameobject", get(gameobjects::list))
        .route(
            "/gameobject/:id",
            get(gameobjects::get).patch(gameobjects::update),
        )
        .route(
            "/gameobject/:id/:method",
            get(gameobjects::call).post(gameobjects::call),
        )
        .route(
            "/gameobject/:id/:method/:arg",
            get(gameobjects::call_with_arg).post(gameobjects::call_with_arg),
        )
        .route("/gameobject_player/self", get(gameobjects::own_player));

    for kind in [BaseKind::Player, BaseKind::Item, BaseKind::Npc] {
        api_routes = api_routes
            .route(
                &format!("/{}", kind.resource()),
                get(
                    move |state: State<AppState>,
                          user: OptionalUser,
                          params: Query<ListParams>| {
                        gameobjects::list_kind(state, user, params, kind)
                    },
                ),
            )
            .route(
                &format!("/{}/:id", kind.resource()),
                get(move |state: State<AppState>, id: Path<ObjectId>| {
                    gameobjects::get_kind(state, id, kind)
                }),
            );
    }

    let mut router = Router::new()
        .nest("/api", api_routes)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::spawn_after_request,
        ))
        .layer(from_fn_with_state(state.clone(), middleware::auth_challenge));

    if let Some(webapp) = &state.config.webapp_path {
        let index = webapp.join("index.html");
        router = router.fallback_service(ServeDir::new(webapp).fallback(ServeFile::new(index)));
        info!(path = %webapp.display(), "Serving web client");
    }

    if state.config.gzip {
        router = router.layer(CompressionLayer::new());
    }

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    users: usize,
    worlds: usize,
    objects: usize,
    persistence: bool,
}

/// GET /api/health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        users: state.store.user_count(),
        worlds: state.store.worlds().len(),
        objects: state.store.object_count(),
        persistence: state.has_persistence(),
    })
}

/// POST /api/admin/save
async fn admin_save(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    if !state.has_persistence() {
        return Err(ApiError::InvalidInput(
            "No database configured".to_string(),
        ));
    }

    state.save().await?;
    info!(user_id = admin.user.id, "Game state saved on request");
    Ok(Json(ApiResponse::<()>::success_message("Game state saved")))
}

/// POST /api/admin/spawn
///
/// Run the spawner now, waiting for a running spawn to finish
async fn admin_spawn(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> (StatusCode, Json<SpawnReport>) {
    let report = spawn::run(&state).await;
    (StatusCode::OK, Json(report))
}
