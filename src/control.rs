//! Server bootstrap tasks
//!
//! Run once at startup after the stored state has been loaded:
//! - record every installed game module in the games table
//! - create the admin account and a default world on a fresh server
//! - create accounts listed in an accounts file

use std::path::Path;

use tracing::{info, warn};

use crate::auth::{create_account, NewAccount};
use crate::config::AuthConfig;
use crate::error::{Result, StoreError};
use crate::framework::GameRegistry;
use crate::model::{Game, Role};
use crate::store::GameStore;

/// Name of the world created on a fresh server
pub const DEFAULT_WORLD_NAME: &str = "Default World";

/// Game of the default world when it is installed
pub const DEFAULT_WORLD_GAME: &str = crate::games::test::PACKAGE;

/// Upsert every registered game module into the games table
pub fn sync_games(store: &GameStore, registry: &GameRegistry) -> Vec<Game> {
    let games: Vec<Game> = registry
        .games()
        .map(|module| store.upsert_game(module.package(), &module.info()))
        .collect();

    info!(count = games.len(), "Game modules synchronized");
    games
}

/// Populate an empty server with an admin account and a default world
///
/// The default world plays the test game, or the first installed game
/// by package name when the test game is missing. Does nothing once any
/// user exists.
pub fn add_default_data(
    store: &GameStore,
    registry: &GameRegistry,
    auth: &AuthConfig,
) -> Result<()> {
    if store.user_count() > 0 {
        return Ok(());
    }

    let admin = create_account(
        store,
        NewAccount {
            username: auth.admin_username.clone(),
            password: auth.admin_password.clone(),
            role: Role::Admin,
            name: Some("The Boss".to_string()),
            email: Some("theboss@example.com".to_string()),
        },
        auth.bcrypt_cost,
    )?;
    info!(username = %admin.username, "Created default admin account");

    let default_game = store.game_by_package(DEFAULT_WORLD_GAME).or_else(|| {
        registry
            .game_names()
            .into_iter()
            .find_map(|package| store.game_by_package(&package))
    });

    match default_game {
        Some(game) => match store.create_world(DEFAULT_WORLD_NAME, game.id) {
            Ok(world) => {
                info!(world_id = world.id, game = %game.package, "Created default world");
            }
            Err(StoreError::WorldNameTaken(_)) => {}
            Err(e) => return Err(e.into()),
        },
        None => warn!("No game installed, not creating a default world"),
    }

    Ok(())
}

/// Create missing accounts from a file of `username password` lines
///
/// Blank lines and lines starting with `#` are ignored; malformed lines are
/// skipped with a warning. Returns the number of accounts created.
pub async fn load_accounts_file(store: &GameStore, path: &Path, bcrypt_cost: u32) -> Result<usize> {
    let content = tokio::fs::read_to_string(path).await?;
    let mut created = 0;

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (Some(username), Some(password), None) = (fields.next(), fields.next(), fields.next())
        else {
            warn!(line = lineno + 1, path = %path.display(), "Malformed account line");
            continue;
        };

        if store.user_by_username(username).is_some() {
            continue;
        }

        match create_account(store, NewAccount::player(username, password), bcrypt_cost) {
            Ok(_) => created += 1,
            Err(e) => warn!(line = lineno + 1, username = %username, "Skipping account: {}", e),
        }
    }

    info!(created = created, path = %path.display(), "Accounts file loaded");
    Ok(created)
}
