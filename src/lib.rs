//! Veripeditus Game Server Library
//!
//! A server for location-based games: players walk around the real world,
//! collect items and talk to NPCs placed on the map by game modules.
//!
//! ## Modules
//!
//! - `api` - REST API (axum router, extractors, handlers)
//! - `auth` - Accounts, password hashing and access tokens
//! - `config` - Server configuration management
//! - `control` - Bootstrap tasks run at startup
//! - `error` - Error types and result definitions
//! - `framework` - Game module traits and object operations
//! - `games` - Bundled game modules
//! - `geo` - Coordinates, distances and areas
//! - `model` - Users, games, worlds and game objects
//! - `osm` - OpenStreetMap features and the Overpass client
//! - `persistence` - PostgreSQL snapshots of the store
//! - `spawn` - Placing game objects according to spawn rules
//! - `state` - Shared application state
//! - `store` - In-memory tables

pub mod api;
pub mod auth;
pub mod config;
pub mod control;
pub mod error;
pub mod framework;
pub mod games;
pub mod geo;
pub mod model;
pub mod osm;
pub mod persistence;
pub mod spawn;
pub mod state;
pub mod store;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{Result, VeripeditusError};
pub use state::AppState;

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
