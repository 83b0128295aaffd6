//! In-memory data store
//!
//! Authoritative runtime tables for users, games, worlds and game objects.
//! Declarative constraints (unique usernames, unique game triples, unique
//! world names, unique player names per world) are enforced on insert.
//! The optional PostgreSQL layer in [`crate::persistence`] snapshots these
//! tables; it is never queried on the request path.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::model::{
    Game, GameId, GameInfo, GameObject, ObjectId, ObjectKind, Role, User, UserId, World, WorldId,
};

/// Object table as seen by [`GameStore::with_objects_mut`]
pub type ObjectTable = BTreeMap<ObjectId, GameObject>;

/// Data for a user that is about to be created
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
    pub email: Option<String>,
}

/// Complete copy of all tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub users: Vec<User>,
    pub games: Vec<Game>,
    pub worlds: Vec<World>,
    pub objects: Vec<GameObject>,
}

/// Count the items of a type carried by a player
pub fn count_owned_in(table: &ObjectTable, player_id: ObjectId, type_name: &str) -> usize {
    table
        .values()
        .filter(|obj| obj.is_owned_by(player_id) && obj.type_name == type_name)
        .count()
}

/// All tables of the server
pub struct GameStore {
    users: RwLock<BTreeMap<UserId, User>>,
    games: RwLock<BTreeMap<GameId, Game>>,
    worlds: RwLock<BTreeMap<WorldId, World>>,
    objects: RwLock<ObjectTable>,
    next_user_id: AtomicI64,
    next_game_id: AtomicI64,
    next_world_id: AtomicI64,
    next_object_id: AtomicI64,
}

impl Default for GameStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            games: RwLock::new(BTreeMap::new()),
            worlds: RwLock::new(BTreeMap::new()),
            objects: RwLock::new(BTreeMap::new()),
            next_user_id: AtomicI64::new(1),
            next_game_id: AtomicI64::new(1),
            next_world_id: AtomicI64::new(1),
            next_object_id: AtomicI64::new(1),
        }
    }

    // ---------------------------------------------------------------- users

    /// Create a user; usernames are unique
    pub fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write();

        if users.values().any(|u| u.username == new.username) {
            return Err(StoreError::UsernameTaken(new.username));
        }

        let now = Utc::now();
        let user = User {
            id: self.next_user_id.fetch_add(1, Ordering::SeqCst),
            username: new.username,
            password_hash: new.password_hash,
            role: new.role,
            name: new.name,
            email: new.email,
            current_player_id: None,
            created: now,
            updated: now,
        };
        users.insert(user.id, user.clone());

        debug!(user_id = user.id, username = %user.username, "User created");
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        self.users.read().get(&id).cloned()
    }

    pub fn user_by_username(&self, username: &str) -> Option<User> {
        self.users
            .read()
            .values()
            .find(|u| u.username == username)
            .cloned()
    }

    pub fn users(&self) -> Vec<User> {
        self.users.read().values().cloned().collect()
    }

    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }

    /// Apply a change to a user and return the updated row
    pub fn update_user<F>(&self, id: UserId, f: F) -> Result<User, StoreError>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.write();
        let user = users.get_mut(&id).ok_or(StoreError::UserNotFound(id))?;
        f(user);
        user.updated = Utc::now();
        Ok(user.clone())
    }

    // ---------------------------------------------------------------- games

    /// Insert or refresh a game keyed by its package/name/version triple
    pub fn upsert_game(&self, package: &str, info: &GameInfo) -> Game {
        let mut games = self.games.write();
        let now = Utc::now();

        if let Some(game) = games.values_mut().find(|g| g.matches(package, info)) {
            game.description = info.description.clone();
            game.author = info.author.clone();
            game.license = info.license.clone();
            game.updated = now;
            return game.clone();
        }

        let game = Game {
            id: self.next_game_id.fetch_add(1, Ordering::SeqCst),
            package: package.to_string(),
            name: info.name.clone(),
            version: info.version.clone(),
            description: info.description.clone(),
            author: info.author.clone(),
            license: info.license.clone(),
            created: now,
            updated: now,
        };
        games.insert(game.id, game.clone());

        info!(game_id = game.id, package = %package, version = %game.version, "Game registered");
        game
    }

    pub fn game(&self, id: GameId) -> Option<Game> {
        self.games.read().get(&id).cloned()
    }

    pub fn game_by_package(&self, package: &str) -> Option<Game> {
        self.games
            .read()
            .values()
            .find(|g| g.package == package)
            .cloned()
    }

    pub fn games(&self) -> Vec<Game> {
        self.games.read().values().cloned().collect()
    }

    // --------------------------------------------------------------- worlds

    /// Create a world for a game; world names are unique
    pub fn create_world(&self, name: &str, game_id: GameId) -> Result<World, StoreError> {
        if !self.games.read().contains_key(&game_id) {
            return Err(StoreError::GameNotFound(game_id));
        }

        let mut worlds = self.worlds.write();
        if worlds.values().any(|w| w.name == name) {
            return Err(StoreError::WorldNameTaken(name.to_string()));
        }

        let now = Utc::now();
        let world = World {
            id: self.next_world_id.fetch_add(1, Ordering::SeqCst),
            name: name.to_string(),
            enabled: true,
            game_id,
            created: now,
            updated: now,
        };
        worlds.insert(world.id, world.clone());

        info!(world_id = world.id, name = %name, game_id = game_id, "World created");
        Ok(world)
    }

    pub fn world(&self, id: WorldId) -> Option<World> {
        self.worlds.read().get(&id).cloned()
    }

    pub fn worlds(&self) -> Vec<World> {
        self.worlds.read().values().cloned().collect()
    }

    /// World with the lowest id
    pub fn first_world(&self) -> Option<World> {
        self.worlds.read().values().next().cloned()
    }

    pub fn update_world<F>(&self, id: WorldId, f: F) -> Result<World, StoreError>
    where
        F: FnOnce(&mut World),
    {
        let mut worlds = self.worlds.write();
        let world = worlds.get_mut(&id).ok_or(StoreError::WorldNotFound(id))?;
        f(world);
        world.updated = Utc::now();
        Ok(world.clone())
    }

    // -------------------------------------------------------------- objects

    /// Insert a new object and assign its id
    pub fn insert_object(&self, mut object: GameObject) -> Result<GameObject, StoreError> {
        if !self.worlds.read().contains_key(&object.world_id) {
            return Err(StoreError::WorldNotFound(object.world_id));
        }

        let mut objects = self.objects.write();

        if let ObjectKind::Player(_) = object.kind {
            let taken = objects.values().any(|o| {
                o.is_player() && o.world_id == object.world_id && o.name == object.name
            });
            if taken {
                return Err(StoreError::PlayerNameTaken {
                    name: object.name,
                    world_id: object.world_id,
                });
            }
        }

        object.id = self.next_object_id.fetch_add(1, Ordering::SeqCst);
        objects.insert(object.id, object.clone());

        debug!(
            object_id = object.id,
            type_name = %object.type_name,
            world_id = object.world_id,
            position = %object.position(),
            "Game object created"
        );
        Ok(object)
    }

    pub fn object(&self, id: ObjectId) -> Option<GameObject> {
        self.objects.read().get(&id).cloned()
    }

    /// All objects matching a predicate, ordered by id
    pub fn objects<P>(&self, predicate: P) -> Vec<GameObject>
    where
        P: Fn(&GameObject) -> bool,
    {
        self.objects
            .read()
            .values()
            .filter(|o| predicate(o))
            .cloned()
            .collect()
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// Apply a change to one object and return the updated row
    pub fn update_object<F>(&self, id: ObjectId, f: F) -> Result<GameObject, StoreError>
    where
        F: FnOnce(&mut GameObject),
    {
        let mut objects = self.objects.write();
        let object = objects.get_mut(&id).ok_or(StoreError::ObjectNotFound(id))?;
        f(object);
        object.touch();
        Ok(object.clone())
    }

    pub fn remove_object(&self, id: ObjectId) -> Option<GameObject> {
        self.objects.write().remove(&id)
    }

    /// Run a closure with exclusive access to the whole object table.
    ///
    /// Used for operations that must check and change several objects
    /// atomically (collecting, handing over).
    pub fn with_objects_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ObjectTable) -> R,
    {
        let mut objects = self.objects.write();
        f(&mut objects)
    }

    /// Player objects controlled by a user
    pub fn players_of_user(&self, user_id: UserId) -> Vec<GameObject> {
        self.objects(|o| o.user_id() == Some(user_id))
    }

    /// The player a user controls in a specific world
    pub fn player_in_world(&self, user_id: UserId, world_id: WorldId) -> Option<GameObject> {
        self.objects
            .read()
            .values()
            .find(|o| o.user_id() == Some(user_id) && o.world_id == world_id)
            .cloned()
    }

    /// Items carried by a player
    pub fn inventory(&self, player_id: ObjectId) -> Vec<GameObject> {
        self.objects(|o| o.is_owned_by(player_id))
    }

    pub fn count_owned(&self, player_id: ObjectId, type_name: &str) -> usize {
        count_owned_in(&self.objects.read(), player_id, type_name)
    }

    // ------------------------------------------------------------ snapshots

    /// Copy all tables
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            users: self.users(),
            games: self.games(),
            worlds: self.worlds(),
            objects: self.objects.read().values().cloned().collect(),
        }
    }

    /// Replace all tables with a snapshot and move id counters past it
    pub fn restore(&self, snapshot: StoreSnapshot) {
        fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
            ids.max().unwrap_or(0) + 1
        }

        self.next_user_id
            .store(next_id(snapshot.users.iter().map(|u| u.id)), Ordering::SeqCst);
        self.next_game_id
            .store(next_id(snapshot.games.iter().map(|g| g.id)), Ordering::SeqCst);
        self.next_world_id
            .store(next_id(snapshot.worlds.iter().map(|w| w.id)), Ordering::SeqCst);
        self.next_object_id
            .store(next_id(snapshot.objects.iter().map(|o| o.id)), Ordering::SeqCst);

        let counts = (
            snapshot.users.len(),
            snapshot.games.len(),
            snapshot.worlds.len(),
            snapshot.objects.len(),
        );

        *self.users.write() = snapshot.users.into_iter().map(|u| (u.id, u)).collect();
        *self.games.write() = snapshot.games.into_iter().map(|g| (g.id, g)).collect();
        *self.worlds.write() = snapshot.worlds.into_iter().map(|w| (w.id, w)).collect();
        *self.objects.write() = snapshot.objects.into_iter().map(|o| (o.id, o)).collect();

        info!(
            users = counts.0,
            games = counts.1,
            worlds = counts.2,
            objects = counts.3,
            "Store restored from snapshot"
        );
    }
}
