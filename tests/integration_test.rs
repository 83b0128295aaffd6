//! Integration tests for the REST API
//!
//! These tests drive the complete router, including authentication, the
//! spawner run after each request and visibility filtering:
//! - account registration, login, logout and Basic authentication
//! - world creation and joining
//! - collecting items and moving players
//! - listings, search queries and error responses
//! - admin endpoints, object images and the Overpass fetch running detached

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use axum_extra::headers::{Authorization, HeaderMapExt};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

use veripeditus_server::api::create_router;
use veripeditus_server::config::ServerConfig;
use veripeditus_server::control::{add_default_data, sync_games};
use veripeditus_server::games::builtin_registry;
use veripeditus_server::state::AppState;

enum Auth<'a> {
    None,
    Basic(&'a str, &'a str),
    Bearer(&'a str),
}

fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.bcrypt_cost = 4;
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config
}

fn test_state() -> AppState {
    state_with(test_config())
}

fn state_with(config: ServerConfig) -> AppState {
    let state = AppState::new(config, builtin_registry()).unwrap();
    sync_games(&state.store, &state.registry);
    add_default_data(&state.store, &state.registry, &state.config.auth).unwrap();
    state
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    auth: Auth<'_>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let mut request = builder
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();

    match auth {
        Auth::None => {}
        Auth::Basic(username, password) => request
            .headers_mut()
            .typed_insert(Authorization::basic(username, password)),
        Auth::Bearer(token) => request
            .headers_mut()
            .typed_insert(Authorization::bearer(token).unwrap()),
    }

    router.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

/// Trailing id of a redirect target
fn location_id(response: &Response) -> i64 {
    location(response).rsplit('/').next().unwrap().parse().unwrap()
}

fn encode_query(value: &Value) -> String {
    value
        .to_string()
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

/// Register alice, create a test game world and join it
///
/// Returns alice's token, the world id and alice's player id.
async fn alice_in_test_world(state: &AppState, router: &Router) -> (String, i64, i64) {
    let response = send(
        router,
        Method::POST,
        "/api/auth/register",
        Auth::None,
        Some(json!({"username": "alice", "password": "wonderland"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let token = json_body(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let game = state.store.game_by_package("test").unwrap();
    let response = send(
        router,
        Method::POST,
        &format!("/api/game/{}/world_create?name=Outback", game.id),
        Auth::Basic("admin", "admin"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let world_id = location_id(&response);

    let response = send(
        router,
        Method::GET,
        &format!("/api/world/{}/player_join", world_id),
        Auth::Bearer(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let player_id = location_id(&response);

    (token, world_id, player_id)
}

#[tokio::test]
async fn test_health_check() {
    let router = create_router(test_state());

    let response = send(&router, Method::GET, "/api/health", Auth::None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["users"], 1);
    assert_eq!(body["persistence"], false);
}

#[tokio::test]
async fn test_unauthorized_requests_get_a_challenge() {
    let router = create_router(test_state());

    let response = send(&router, Method::GET, "/api/auth/session", Auth::None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Basic realm=\"Veripeditus\""
    );

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let response = send(
        &router,
        Method::GET,
        "/api/auth/session",
        Auth::Basic("admin", "wrong"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_logout_and_session() {
    let router = create_router(test_state());

    let response = send(
        &router,
        Method::POST,
        "/api/auth/login",
        Auth::None,
        Some(json!({"username": "admin", "password": "nope"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &router,
        Method::POST,
        "/api/auth/login",
        Auth::None,
        Some(json!({"username": "admin", "password": "admin"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["role"], "ADMIN");
    assert!(body["user"].get("password_hash").is_none());
    let token = body["token"].as_str().unwrap().to_string();

    let response = send(&router, Method::GET, "/api/auth/session", Auth::Bearer(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["valid"], true);
    assert!(body["expires_at"].is_string());

    let response = send(&router, Method::POST, "/api/auth/logout", Auth::Bearer(&token), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&router, Method::GET, "/api/auth/session", Auth::Bearer(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_rules() {
    let router = create_router(test_state());

    let response = send(
        &router,
        Method::POST,
        "/api/auth/register",
        Auth::None,
        Some(json!({"username": "no spaces", "password": "secret"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["errors"]["username"].is_string());

    let response = send(
        &router,
        Method::POST,
        "/api/auth/register",
        Auth::None,
        Some(json!({"username": "bob", "password": "abc"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &router,
        Method::POST,
        "/api/auth/register",
        Auth::None,
        Some(json!({"username": "admin", "password": "secret"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_collect_kangoo_and_respawn() {
    let state = test_state();
    let router = create_router(state.clone());
    let (token, world_id, player_id) = alice_in_test_world(&state, &router).await;

    let response = send(
        &router,
        Method::GET,
        "/api/gameobject_item",
        Auth::Bearer(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let kangoos: Vec<&Value> = body["objects"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|obj| obj["type"] == "game_test_Kangoo" && obj["world_id"] == world_id)
        .collect();
    assert_eq!(kangoos.len(), 1);
    assert_eq!(kangoos[0]["gameobject_type"], "gameobject_item");
    assert_eq!(kangoos[0]["name"], "Kangoo");
    let kangoo_id = kangoos[0]["id"].as_i64().unwrap();

    let response = send(
        &router,
        Method::POST,
        &format!("/api/gameobject/{}/collect", kangoo_id),
        Auth::Bearer(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let item = json_body(response).await;
    assert_eq!(item["isonmap"], false);
    assert_eq!(item["owner_id"], player_id);

    let response = send(
        &router,
        Method::GET,
        &format!("/api/gameobject/{}/inventory", player_id),
        Auth::None,
        None,
    )
    .await;
    let inventory = json_body(response).await;
    assert_eq!(inventory["num_results"], 1);
    assert_eq!(inventory["objects"][0]["id"], kangoo_id);

    // The spawner refilled the point after the collect request
    let on_map = state.store.objects(|obj| {
        obj.world_id == world_id && obj.type_name == "game_test_Kangoo" && obj.isonmap
    });
    assert_eq!(on_map.len(), 1);
    assert_ne!(on_map[0].id, kangoo_id);
}

#[tokio::test]
async fn test_methods_need_login() {
    let state = test_state();
    let router = create_router(state.clone());
    let (_, world_id, _) = alice_in_test_world(&state, &router).await;

    let kangoo = state
        .store
        .objects(|obj| obj.world_id == world_id && obj.type_name == "game_test_Kangoo")
        .remove(0);

    let response = send(
        &router,
        Method::GET,
        &format!("/api/gameobject/{}/collect", kangoo.id),
        Auth::None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &router,
        Method::GET,
        &format!("/api/gameobject/{}/juggle", kangoo.id),
        Auth::None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &router,
        Method::GET,
        "/api/gameobject/999999/collect",
        Auth::Basic("admin", "admin"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_own_player_and_moving() {
    let state = test_state();
    let router = create_router(state.clone());
    let (token, world_id, player_id) = alice_in_test_world(&state, &router).await;

    let response = send(
        &router,
        Method::GET,
        "/api/gameobject_player/self",
        Auth::Bearer(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        format!("/api/gameobject_player/{}", player_id)
    );

    let response = send(
        &router,
        Method::PATCH,
        &format!("/api/gameobject/{}", player_id),
        Auth::Bearer(&token),
        Some(json!({"latitude": 50.73, "longitude": 7.1, "avatar": "unicorn"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let player = json_body(response).await;
    assert_eq!(player["latitude"], 50.73);
    assert_eq!(player["longitude"], 7.1);
    assert_eq!(player["avatar"], "unicorn");

    let response = send(
        &router,
        Method::PATCH,
        &format!("/api/gameobject/{}", player_id),
        Auth::Bearer(&token),
        Some(json!({"latitude": 91.0, "longitude": 0.0})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let kangoo = state
        .store
        .objects(|obj| obj.world_id == world_id && obj.type_name == "game_test_Kangoo")
        .remove(0);
    let response = send(
        &router,
        Method::PATCH,
        &format!("/api/gameobject/{}", kangoo.id),
        Auth::Bearer(&token),
        Some(json!({"latitude": 1.0, "longitude": 1.0})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &router,
        Method::PATCH,
        &format!("/api/gameobject/{}", kangoo.id),
        Auth::Basic("admin", "admin"),
        Some(json!({"latitude": 1.0, "longitude": 1.0})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Far away from the kangoo now
    let response = send(
        &router,
        Method::POST,
        &format!("/api/gameobject/{}/collect", kangoo.id),
        Auth::Bearer(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_listings_and_search() {
    let state = test_state();
    let router = create_router(state.clone());
    let (_, world_id, player_id) = alice_in_test_world(&state, &router).await;

    let response = send(&router, Method::GET, "/api/world", Auth::None, None).await;
    let body = json_body(response).await;
    assert_eq!(body["num_results"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["total_pages"], 1);

    let response = send(
        &router,
        Method::GET,
        &format!("/api/world/{}", world_id),
        Auth::None,
        None,
    )
    .await;
    let world = json_body(response).await;
    assert_eq!(world["name"], "Outback");
    assert_eq!(world["game"]["package"], "test");

    let response = send(
        &router,
        Method::GET,
        "/api/game?results_per_page=1&page=2",
        Auth::None,
        None,
    )
    .await;
    let body = json_body(response).await;
    assert_eq!(body["num_results"], 2);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["objects"].as_array().unwrap().len(), 1);

    let alice = state.store.user_by_username("alice").unwrap();
    let response = send(
        &router,
        Method::GET,
        &format!("/api/user/{}", alice.id),
        Auth::None,
        None,
    )
    .await;
    let user = json_body(response).await;
    assert_eq!(user["players"][0]["id"], player_id);

    let q = json!({"filters": [
        {"name": "world_id", "op": "eq", "val": world_id},
        {"name": "type", "op": "like", "val": "game_test_%"}
    ], "order_by": [{"field": "id", "direction": "desc"}]});
    let response = send(
        &router,
        Method::GET,
        &format!("/api/gameobject?q={}", encode_query(&q)),
        Auth::None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let types: Vec<&str> = body["objects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|obj| obj["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["game_test_Player", "game_test_Kangoo"]);

    let response = send(
        &router,
        Method::GET,
        "/api/gameobject?q=notjson",
        Auth::None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&router, Method::GET, "/api/gameobject_npc/999999", Auth::None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &router,
        Method::GET,
        &format!("/api/gameobject_item/{}", player_id),
        Auth::None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_huge_page_number() {
    let router = create_router(test_state());

    let response = send(
        &router,
        Method::GET,
        "/api/user?page=18446744073709551615",
        Auth::None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["num_results"], 1);
    assert!(body["objects"].as_array().unwrap().is_empty());

    let response = send(
        &router,
        Method::GET,
        "/api/gameobject?page=18446744073709551615&results_per_page=9223372036854775807",
        Auth::None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_handover_through_api() {
    let state = test_state();
    let router = create_router(state.clone());
    let (alice_token, world_id, alice_player) = alice_in_test_world(&state, &router).await;

    let response = send(
        &router,
        Method::POST,
        "/api/auth/register",
        Auth::None,
        Some(json!({"username": "bob", "password": "builder"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = send(
        &router,
        Method::POST,
        &format!("/api/world/{}/player_join", world_id),
        Auth::Basic("bob", "builder"),
        None,
    )
    .await;
    let bob_player = location_id(&response);

    let kangoo = state
        .store
        .objects(|obj| obj.world_id == world_id && obj.type_name == "game_test_Kangoo")
        .remove(0);
    let response = send(
        &router,
        Method::POST,
        &format!("/api/gameobject/{}/collect", kangoo.id),
        Auth::Bearer(&alice_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &router,
        Method::POST,
        &format!("/api/gameobject/{}/handover/kangaroo", kangoo.id),
        Auth::Bearer(&alice_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &router,
        Method::POST,
        &format!("/api/gameobject/{}/handover/{}", kangoo.id, bob_player),
        Auth::Bearer(&alice_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let item = json_body(response).await;
    assert_eq!(item["owner_id"], bob_player);

    // Alice no longer owns it
    let response = send(
        &router,
        Method::POST,
        &format!("/api/gameobject/{}/handover/{}", kangoo.id, alice_player),
        Auth::Bearer(&alice_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(state.store.object(kangoo.id).unwrap().is_owned_by(bob_player));
}

#[tokio::test]
async fn test_admin_endpoints() {
    let state = test_state();
    let router = create_router(state.clone());
    let (token, world_id, _) = alice_in_test_world(&state, &router).await;

    let response = send(&router, Method::POST, "/api/admin/spawn", Auth::None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&router, Method::POST, "/api/admin/spawn", Auth::Bearer(&token), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Take the kangoo off the map behind the spawner's back
    let kangoo = state
        .store
        .objects(|obj| obj.world_id == world_id && obj.type_name == "game_test_Kangoo")
        .remove(0);
    state
        .store
        .update_object(kangoo.id, |obj| obj.isonmap = false)
        .unwrap();

    let response = send(
        &router,
        Method::POST,
        "/api/admin/spawn",
        Auth::Basic("admin", "admin"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = json_body(response).await;
    assert_eq!(report["worlds"], 2);
    assert_eq!(report["created"], 1);
    assert_eq!(report["osm_fetches"], 0);

    let response = send(
        &router,
        Method::POST,
        "/api/admin/save",
        Auth::Basic("admin", "admin"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&router, Method::POST, "/api/admin/save", Auth::Bearer(&token), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_object_image() {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nkangaroo";

    let data = tempfile::tempdir().unwrap();
    let image_dir = data.path().join("games").join("test").join("image");
    std::fs::create_dir_all(&image_dir).unwrap();

    let mut config = test_config();
    config.data_path = data.path().to_path_buf();
    let state = state_with(config);
    let router = create_router(state.clone());
    let (_, world_id, player_id) = alice_in_test_world(&state, &router).await;

    let kangoo = state
        .store
        .objects(|obj| obj.world_id == world_id && obj.type_name == "game_test_Kangoo")
        .remove(0);
    let uri = format!("/api/gameobject/{}/image", kangoo.id);

    let response = send(&router, Method::GET, &uri, Auth::None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    std::fs::write(image_dir.join("avatar_kangaroo.png"), PNG).unwrap();
    let response = send(&router, Method::GET, &uri, Auth::None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], PNG);

    // Players have no image of their own
    let response = send(
        &router,
        Method::GET,
        &format!("/api/gameobject/{}/image", player_id),
        Auth::None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stalled_overpass_does_not_hold_responses() {
    // Accepts connections and never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/api/interpreter", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let mut config = test_config();
    config.osm.enabled = true;
    config.osm.endpoint = endpoint;
    config.osm.timeout_secs = 30;
    let state = state_with(config);
    let router = create_router(state.clone());

    let game = state.store.game_by_package("drink").unwrap();
    let response = send(
        &router,
        Method::POST,
        &format!("/api/game/{}/world_create?name=Pubs", game.id),
        Auth::Basic("admin", "admin"),
        None,
    )
    .await;
    let world_id = location_id(&response);
    let response = send(
        &router,
        Method::POST,
        &format!("/api/world/{}/player_join", world_id),
        Auth::Basic("admin", "admin"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    for _ in 0..3 {
        let response = tokio::time::timeout(
            Duration::from_secs(5),
            send(&router, Method::GET, "/api/health", Auth::None, None),
        )
        .await
        .expect("response waited for Overpass");
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(state.osm.node_count(), 0);
}

