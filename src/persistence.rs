//! PostgreSQL persistence
//!
//! The in-memory [`GameStore`](crate::store::GameStore) is authoritative at
//! runtime. This module creates the schema, loads a full snapshot at startup
//! and writes the snapshot back on autosave and shutdown.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::{debug, error, info, warn};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::model::{
    Attributes, Game, GameObject, ItemState, NpcState, ObjectKind, PlayerState, Role, User, World,
};
use crate::store::StoreSnapshot;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGINT PRIMARY KEY,
        username VARCHAR(32) NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role VARCHAR(16) NOT NULL DEFAULT 'PLAYER',
        name TEXT NOT NULL DEFAULT '',
        email TEXT,
        current_player_id BIGINT,
        created TIMESTAMPTZ NOT NULL,
        updated TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS games (
        id BIGINT PRIMARY KEY,
        package TEXT NOT NULL,
        name TEXT NOT NULL,
        version TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        author TEXT NOT NULL DEFAULT '',
        license TEXT NOT NULL DEFAULT '',
        created TIMESTAMPTZ NOT NULL,
        updated TIMESTAMPTZ NOT NULL,
        UNIQUE (package, name, version)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS worlds (
        id BIGINT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        enabled BOOLEAN NOT NULL DEFAULT TRUE,
        game_id BIGINT NOT NULL REFERENCES games (id),
        created TIMESTAMPTZ NOT NULL,
        updated TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS gameobjects (
        id BIGINT PRIMARY KEY,
        type TEXT NOT NULL,
        gameobject_type VARCHAR(32) NOT NULL,
        world_id BIGINT NOT NULL REFERENCES worlds (id),
        name TEXT NOT NULL DEFAULT '',
        image TEXT NOT NULL DEFAULT '',
        latitude DOUBLE PRECISION NOT NULL DEFAULT 0.0,
        longitude DOUBLE PRECISION NOT NULL DEFAULT 0.0,
        isonmap BOOLEAN NOT NULL DEFAULT TRUE,
        attributes JSONB NOT NULL DEFAULT '{}',
        user_id BIGINT,
        avatar TEXT,
        owner_id BIGINT,
        created TIMESTAMPTZ NOT NULL,
        updated TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS gameobjects_world_idx ON gameobjects (world_id)",
];

/// Database row for a user
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    role: String,
    name: String,
    email: Option<String>,
    current_player_id: Option<i64>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role: Role::parse(&row.role),
            name: row.name,
            email: row.email,
            current_player_id: row.current_player_id,
            created: row.created,
            updated: row.updated,
        }
    }
}

/// Database row for a game
#[derive(Debug, FromRow)]
struct GameRow {
    id: i64,
    package: String,
    name: String,
    version: String,
    description: String,
    author: String,
    license: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl From<GameRow> for Game {
    fn from(row: GameRow) -> Self {
        Game {
            id: row.id,
            package: row.package,
            name: row.name,
            version: row.version,
            description: row.description,
            author: row.author,
            license: row.license,
            created: row.created,
            updated: row.updated,
        }
    }
}

/// Database row for a world
#[derive(Debug, FromRow)]
struct WorldRow {
    id: i64,
    name: String,
    enabled: bool,
    game_id: i64,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl From<WorldRow> for World {
    fn from(row: WorldRow) -> Self {
        World {
            id: row.id,
            name: row.name,
            enabled: row.enabled,
            game_id: row.game_id,
            created: row.created,
            updated: row.updated,
        }
    }
}

/// Database row for a game object
#[derive(Debug, FromRow)]
struct ObjectRow {
    id: i64,
    #[sqlx(rename = "type")]
    type_name: String,
    gameobject_type: String,
    world_id: i64,
    name: String,
    image: String,
    latitude: f64,
    longitude: f64,
    isonmap: bool,
    attributes: Json<Attributes>,
    user_id: Option<i64>,
    avatar: Option<String>,
    owner_id: Option<i64>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl ObjectRow {
    fn from_object(obj: &GameObject) -> Self {
        let (user_id, avatar, owner_id) = match &obj.kind {
            ObjectKind::Player(state) => (Some(state.user_id), Some(state.avatar.clone()), None),
            ObjectKind::Item(state) => (None, None, state.owner_id),
            ObjectKind::Npc(_) => (None, None, None),
        };

        Self {
            id: obj.id,
            type_name: obj.type_name.clone(),
            gameobject_type: obj.kind.base().resource().to_string(),
            world_id: obj.world_id,
            name: obj.name.clone(),
            image: obj.image.clone(),
            latitude: obj.latitude,
            longitude: obj.longitude,
            isonmap: obj.isonmap,
            attributes: Json(obj.attributes.clone()),
            user_id,
            avatar,
            owner_id,
            created: obj.created,
            updated: obj.updated,
        }
    }

    /// Rebuild the object; rows of unknown kind are skipped
    fn into_object(self) -> Option<GameObject> {
        let kind = match self.gameobject_type.as_str() {
            "gameobject_player" => ObjectKind::Player(PlayerState {
                user_id: self.user_id?,
                avatar: self
                    .avatar
                    .unwrap_or_else(|| crate::framework::DEFAULT_AVATAR.to_string()),
            }),
            "gameobject_item" => ObjectKind::Item(ItemState {
                owner_id: self.owner_id,
            }),
            "gameobject_npc" => ObjectKind::Npc(NpcState::default()),
            _ => return None,
        };

        Some(GameObject {
            id: self.id,
            type_name: self.type_name,
            world_id: self.world_id,
            name: self.name,
            image: self.image,
            latitude: self.latitude,
            longitude: self.longitude,
            isonmap: self.isonmap,
            attributes: self.attributes.0,
            created: self.created,
            updated: self.updated,
            kind,
        })
    }
}

/// Snapshot persistence service
#[derive(Clone)]
pub struct StorePersistence {
    pool: PgPool,
}

impl StorePersistence {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                e
            })?;

        info!("Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create all tables that do not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Database schema ensured");
        Ok(())
    }

    /// Check database connectivity
    pub async fn check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Load all tables
    pub async fn load(&self) -> Result<StoreSnapshot> {
        let users: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, password_hash, role, name, email,
                   current_player_id, created, updated
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let games: Vec<GameRow> = sqlx::query_as(
            r#"
            SELECT id, package, name, version, description, author, license, created, updated
            FROM games
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let worlds: Vec<WorldRow> = sqlx::query_as(
            "SELECT id, name, enabled, game_id, created, updated FROM worlds ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let objects: Vec<ObjectRow> = sqlx::query_as(
            r#"
            SELECT id, type, gameobject_type, world_id, name, image, latitude, longitude,
                   isonmap, attributes, user_id, avatar, owner_id, created, updated
            FROM gameobjects
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let object_rows = objects.len();
        let objects: Vec<GameObject> = objects
            .into_iter()
            .filter_map(ObjectRow::into_object)
            .collect();
        if objects.len() != object_rows {
            warn!(
                skipped = object_rows - objects.len(),
                "Skipped game object rows of unknown kind"
            );
        }

        let snapshot = StoreSnapshot {
            users: users.into_iter().map(User::from).collect(),
            games: games.into_iter().map(Game::from).collect(),
            worlds: worlds.into_iter().map(World::from).collect(),
            objects,
        };

        info!(
            users = snapshot.users.len(),
            games = snapshot.games.len(),
            worlds = snapshot.worlds.len(),
            objects = snapshot.objects.len(),
            "Loaded game state from database"
        );
        Ok(snapshot)
    }

    /// Replace the stored state with a snapshot in one transaction
    pub async fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for table in ["gameobjects", "worlds", "games", "users"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }

        for user in &snapshot.users {
            sqlx::query(
                r#"
                INSERT INTO users (id, username, password_hash, role, name, email,
                                   current_player_id, created, updated)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.current_player_id)
            .bind(user.created)
            .bind(user.updated)
            .execute(&mut *tx)
            .await?;
        }

        for game in &snapshot.games {
            sqlx::query(
                r#"
                INSERT INTO games (id, package, name, version, description, author, license,
                                   created, updated)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(game.id)
            .bind(&game.package)
            .bind(&game.name)
            .bind(&game.version)
            .bind(&game.description)
            .bind(&game.author)
            .bind(&game.license)
            .bind(game.created)
            .bind(game.updated)
            .execute(&mut *tx)
            .await?;
        }

        for world in &snapshot.worlds {
            sqlx::query(
                r#"
                INSERT INTO worlds (id, name, enabled, game_id, created, updated)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(world.id)
            .bind(&world.name)
            .bind(world.enabled)
            .bind(world.game_id)
            .bind(world.created)
            .bind(world.updated)
            .execute(&mut *tx)
            .await?;
        }

        for obj in &snapshot.objects {
            let row = ObjectRow::from_object(obj);
            sqlx::query(
                r#"
                INSERT INTO gameobjects (id, type, gameobject_type, world_id, name, image,
                                         latitude, longitude, isonmap, attributes, user_id,
                                         avatar, owner_id, created, updated)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                "#,
            )
            .bind(row.id)
            .bind(&row.type_name)
            .bind(&row.gameobject_type)
            .bind(row.world_id)
            .bind(&row.name)
            .bind(&row.image)
            .bind(row.latitude)
            .bind(row.longitude)
            .bind(row.isonmap)
            .bind(&row.attributes)
            .bind(row.user_id)
            .bind(&row.avatar)
            .bind(row.owner_id)
            .bind(row.created)
            .bind(row.updated)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            users = snapshot.users.len(),
            objects = snapshot.objects.len(),
            "Saved game state to database"
        );
        Ok(())
    }
}
