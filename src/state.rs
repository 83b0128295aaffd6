//! Application state module
//!
//! Contains the shared state handed to every request handler and background task.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::info;

use crate::auth::TokenService;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::framework::resources::ResourceLoader;
use crate::framework::{GameRegistry, GameRules};
use crate::osm::overpass::OverpassClient;
use crate::osm::OsmStore;
use crate::persistence::StorePersistence;
use crate::store::GameStore;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Users, games, worlds and game objects
    pub store: Arc<GameStore>,
    /// Installed game modules and their classes
    pub registry: Arc<GameRegistry>,
    /// Map features known to the server
    pub osm: Arc<OsmStore>,
    /// Overpass client (None when fetching is disabled)
    pub overpass: Option<OverpassClient>,
    /// Access token service
    pub tokens: TokenService,
    /// Game data files
    pub resources: ResourceLoader,
    /// Interaction radii
    pub rules: GameRules,
    /// Database persistence (None if not configured)
    pub persistence: Option<StorePersistence>,
    /// Serializes spawner runs
    pub spawn_lock: Arc<Mutex<()>>,
    /// Serializes Overpass fetches
    pub osm_fetch_lock: Arc<Mutex<()>>,
    /// Shutdown signal sender
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Create a new application state without database persistence
    pub fn new(config: ServerConfig, registry: GameRegistry) -> Result<Self> {
        let overpass = if config.osm.enabled {
            let client = OverpassClient::new(config.osm.endpoint.clone(), config.osm.timeout_secs)?;
            info!(endpoint = %client.endpoint(), "Overpass fetching enabled");
            Some(client)
        } else {
            None
        };

        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_expiry_secs);
        let resources = ResourceLoader::new(config.data_path.clone());
        let rules = config.game.rules();
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(GameStore::new()),
            registry: Arc::new(registry),
            osm: Arc::new(OsmStore::new()),
            overpass,
            tokens,
            resources,
            rules,
            persistence: None,
            spawn_lock: Arc::new(Mutex::new(())),
            osm_fetch_lock: Arc::new(Mutex::new(())),
            shutdown_tx,
        })
    }

    /// Create a new application state with database persistence
    pub fn with_persistence(
        config: ServerConfig,
        registry: GameRegistry,
        persistence: StorePersistence,
    ) -> Result<Self> {
        let mut state = Self::new(config, registry)?;
        state.persistence = Some(persistence);
        info!("Game state persistence enabled");
        Ok(state)
    }

    /// Check if persistence is enabled
    pub fn has_persistence(&self) -> bool {
        self.persistence.is_some()
    }

    /// Load the stored game state into the store
    pub async fn load(&self) -> Result<()> {
        if let Some(persistence) = &self.persistence {
            let snapshot = persistence.load().await?;
            self.store.restore(snapshot);
        }
        Ok(())
    }

    /// Write the game state to the database
    pub async fn save(&self) -> Result<()> {
        if let Some(persistence) = &self.persistence {
            persistence.save(&self.store.snapshot()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::builtin_registry;

    #[test]
    fn test_new_state() {
        let state = AppState::new(ServerConfig::default(), builtin_registry()).unwrap();
        assert!(!state.has_persistence());
        assert!(state.overpass.is_none());
        assert_eq!(state.store.user_count(), 0);
        assert_eq!(state.rules.collect_radius_m, state.config.game.collect_radius_m);
    }

    #[test]
    fn test_overpass_client_when_enabled() {
        let mut config = ServerConfig::default();
        config.osm.enabled = true;
        config.osm.endpoint = "http://localhost:9/api/interpreter".to_string();

        let state = AppState::new(config, builtin_registry()).unwrap();
        assert_eq!(
            state.overpass.as_ref().map(|c| c.endpoint()),
            Some("http://localhost:9/api/interpreter")
        );
    }

    #[tokio::test]
    async fn test_load_and_save_without_database() {
        let state = AppState::new(ServerConfig::default(), builtin_registry()).unwrap();
        assert!(state.load().await.is_ok());
        assert!(state.save().await.is_ok());
    }
}
