//! Error handling module
//!
//! Defines custom error types for the Veripeditus server.

use std::io;

use thiserror::Error;

use crate::model::ObjectId;

/// Main error type for the Veripeditus server
#[derive(Error, Debug)]
pub enum VeripeditusError {
    /// Game logic errors
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Data store errors (uniqueness, missing rows)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Map data errors
    #[error("OSM error: {0}")]
    Osm(#[from] OsmError),

    /// Game data resource errors
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Authentication-specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid username format")]
    InvalidUsername,

    #[error("Invalid password format")]
    InvalidPassword,

    #[error("Password hashing failed")]
    HashingFailed,

    #[error("Invalid or malformed token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Permission denied")]
    Forbidden,
}

/// Data store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("World name already taken: {0}")]
    WorldNameTaken(String),

    #[error("Player name {name} already taken in world {world_id}")]
    PlayerNameTaken { name: String, world_id: i64 },

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Game not found: {0}")]
    GameNotFound(i64),

    #[error("World not found: {0}")]
    WorldNotFound(i64),

    #[error("Game object not found: {0}")]
    ObjectNotFound(ObjectId),
}

/// Game logic errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    #[error("Object {0} is not a player")]
    NotAPlayer(ObjectId),

    #[error("Object {0} is not an item")]
    NotAnItem(ObjectId),

    #[error("Object {0} is not an NPC")]
    NotAnNpc(ObjectId),

    #[error("Unknown game object class: {0}")]
    UnknownClass(String),

    #[error("Unknown game: {0}")]
    UnknownGame(String),

    #[error("World {0} is disabled")]
    WorldDisabled(i64),

    #[error("No world available to join")]
    NoWorld,

    #[error("Objects are in different worlds")]
    WrongWorld,

    #[error("Item is not on the map")]
    NotOnMap,

    #[error("Item cannot be collected")]
    NotCollectible,

    #[error("Item cannot be handed over")]
    NotHandoverable,

    #[error("Item cannot be placed")]
    NotPlaceable,

    #[error("Item is not owned by player {0}")]
    NotOwner(ObjectId),

    #[error("Out of range: {distance:.1} m away, maximum is {max:.1} m")]
    OutOfRange { distance: f64, max: f64 },

    #[error("Player already owns the maximum of {max} items of this kind")]
    OwnedMaxReached { max: usize },

    #[error("Action refused: {0}")]
    Refused(String),

    #[error("Invalid location: ({latitude}, {longitude})")]
    InvalidLocation { latitude: f64, longitude: f64 },
}

/// Map data errors
#[derive(Error, Debug)]
pub enum OsmError {
    #[error("Invalid tag query: {0}")]
    InvalidTagQuery(String),

    #[error("Overpass request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Overpass returned status {0}")]
    Status(u16),

    #[error("Malformed Overpass response: {0}")]
    MalformedResponse(String),
}

/// Game data resource errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("No resource found for game {package}, type {restype}, called {basename}")]
    NoSuchResource {
        package: String,
        restype: String,
        basename: String,
    },

    #[error("Unknown resource type: {0}")]
    UnknownType(String),

    #[error("Invalid resource name: {0}")]
    InvalidName(String),
}

/// Result type alias for Veripeditus operations
pub type Result<T> = std::result::Result<T, VeripeditusError>;
