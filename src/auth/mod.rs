//! Authentication and account management
//!
//! Users log in with their username and password (HTTP Basic or the login
//! endpoint, which hands out a JWT). Passwords are stored as bcrypt hashes.

pub mod password;
pub mod token;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::error::{AuthError, Result};
use crate::model::{Role, User};
use crate::store::{GameStore, NewUser};

pub use password::{hash_password, verify_password, PasswordRequirements};
pub use token::{Claims, TokenService};

/// Longest accepted username
pub const USERNAME_MAX_LENGTH: usize = 32;

pub static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid username regex"));

/// Account to be created
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl NewAccount {
    pub fn player(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            role: Role::Player,
            name: None,
            email: None,
        }
    }
}

/// Check a username for length and allowed characters
pub fn validate_username(username: &str) -> std::result::Result<(), AuthError> {
    if username.is_empty()
        || username.chars().count() > USERNAME_MAX_LENGTH
        || !USERNAME_REGEX.is_match(username)
    {
        return Err(AuthError::InvalidUsername);
    }
    Ok(())
}

/// Create an account with a hashed password
///
/// The display name defaults to the username.
pub fn create_account(store: &GameStore, account: NewAccount, bcrypt_cost: u32) -> Result<User> {
    validate_username(&account.username)?;
    if account.password.is_empty() {
        return Err(AuthError::InvalidPassword.into());
    }

    let password_hash = hash_password(&account.password, bcrypt_cost)?;
    let name = account
        .name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| account.username.clone());

    let user = store.create_user(NewUser {
        username: account.username,
        password_hash,
        role: account.role,
        name,
        email: account.email,
    })?;

    info!(
        user_id = user.id,
        username = %user.username,
        role = user.role.as_str(),
        "Account created"
    );
    Ok(user)
}

/// Check a username and password against the store
pub fn authenticate(
    store: &GameStore,
    username: &str,
    password: &str,
) -> std::result::Result<User, AuthError> {
    let user = store
        .user_by_username(username)
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash)? {
        warn!(username = %username, "Failed login attempt");
        return Err(AuthError::InvalidCredentials);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, VeripeditusError};

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("bob_the.builder-2").is_ok());
        assert!(validate_username(&"a".repeat(USERNAME_MAX_LENGTH)).is_ok());

        assert_eq!(validate_username(""), Err(AuthError::InvalidUsername));
        assert_eq!(validate_username("with space"), Err(AuthError::InvalidUsername));
        assert_eq!(
            validate_username(&"a".repeat(USERNAME_MAX_LENGTH + 1)),
            Err(AuthError::InvalidUsername)
        );
    }

    #[test]
    fn test_create_and_authenticate() {
        let store = GameStore::new();
        let user = create_account(&store, NewAccount::player("alice", "wonderland"), 4).unwrap();
        assert_eq!(user.name, "alice");
        assert_eq!(user.role, Role::Player);
        assert_ne!(user.password_hash, "wonderland");

        let authed = authenticate(&store, "alice", "wonderland").unwrap();
        assert_eq!(authed.id, user.id);

        assert_eq!(
            authenticate(&store, "alice", "rabbit").unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            authenticate(&store, "nobody", "wonderland").unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn test_duplicate_account() {
        let store = GameStore::new();
        create_account(&store, NewAccount::player("alice", "one"), 4).unwrap();

        let err = create_account(&store, NewAccount::player("alice", "two"), 4).unwrap_err();
        assert!(matches!(
            err,
            VeripeditusError::Store(StoreError::UsernameTaken(_))
        ));
    }

    #[test]
    fn test_invalid_account() {
        let store = GameStore::new();

        let err = create_account(&store, NewAccount::player("", "pass"), 4).unwrap_err();
        assert!(matches!(err, VeripeditusError::Auth(AuthError::InvalidUsername)));

        let err = create_account(&store, NewAccount::player("bob", ""), 4).unwrap_err();
        assert!(matches!(err, VeripeditusError::Auth(AuthError::InvalidPassword)));
    }
}
