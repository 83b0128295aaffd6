//! JWT access tokens
//!
//! Tokens are HS256-signed and carry the user id, username and role.
//! Logging out revokes a token by its `jti` until it would have expired
//! anyway.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthError;
use crate::model::{Role, User, UserId};

/// Clock skew tolerated when checking expiry
const LEEWAY_SECS: u64 = 60;

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub username: String,
    pub role: Role,
    /// Issued at timestamp (Unix)
    pub iat: i64,
    /// Expiration timestamp (Unix)
    pub exp: i64,
    /// Token id, used for revocation
    pub jti: String,
}

impl Claims {
    pub fn new(user: &User, expires_in_seconds: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            iat: now,
            exp: now + expires_in_seconds,
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Sign claims into a token
pub fn generate_token(encoding_key: &EncodingKey, claims: &Claims) -> Result<String, AuthError> {
    encode(&Header::default(), claims, encoding_key).map_err(|e| {
        tracing::error!("Failed to generate token: {}", e);
        AuthError::InvalidToken
    })
}

/// Validate a token signature and expiry and extract its claims
pub fn validate_token(decoding_key: &DecodingKey, token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = LEEWAY_SECS;

    let token_data = decode::<Claims>(token, decoding_key, &validation).map_err(|e| {
        debug!("Rejected token: {:?}", e);
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    })?;

    Ok(token_data.claims)
}

/// Issues, validates and revokes access tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_secs: i64,
    /// Revoked token ids with their expiry
    revoked: Arc<DashMap<String, i64>>,
}

impl TokenService {
    pub fn new(secret: &str, expiry_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_secs,
            revoked: Arc::new(DashMap::new()),
        }
    }

    /// Token lifetime in seconds
    pub fn expiry_secs(&self) -> i64 {
        self.expiry_secs
    }

    /// Issue a new access token for a user
    pub fn issue(&self, user: &User) -> Result<(String, Claims), AuthError> {
        let claims = Claims::new(user, self.expiry_secs);
        let token = generate_token(&self.encoding_key, &claims)?;
        Ok((token, claims))
    }

    /// Validate a token, rejecting revoked ones
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = validate_token(&self.decoding_key, token)?;

        if self.revoked.contains_key(&claims.jti) {
            return Err(AuthError::TokenRevoked);
        }

        Ok(claims)
    }

    /// Revoke a token until it expires
    pub fn revoke(&self, claims: &Claims) {
        self.revoked.insert(claims.jti.clone(), claims.exp);
        self.purge_expired();
        debug!(jti = %claims.jti, username = %claims.username, "Token revoked");
    }

    /// Forget revocations of tokens that have expired by now
    pub fn purge_expired(&self) {
        let cutoff = Utc::now().timestamp() - LEEWAY_SECS as i64;
        self.revoked.retain(|_, exp| *exp >= cutoff);
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 7,
            username: "testuser".to_string(),
            password_hash: String::new(),
            role: Role::Admin,
            name: "Test".to_string(),
            email: None,
            current_player_id: None,
            created: now,
            updated: now,
        }
    }

    fn service() -> TokenService {
        TokenService::new("test-secret-key-for-jwt-testing", 3600)
    }

    #[test]
    fn test_issue_and_validate_token() {
        let tokens = service();
        let (token, issued) = tokens.issue(&user()).unwrap();
        assert!(!token.is_empty());

        let claims = tokens.validate(&token).unwrap();
        assert_eq!(claims, issued);
        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.username, "testuser");
        assert_eq!(claims.role, Role::Admin);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_expired_token() {
        let tokens = TokenService::new("test-secret-key-for-jwt-testing", -3600);
        let (token, _) = tokens.issue(&user()).unwrap();

        assert_eq!(tokens.validate(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_invalid_signature() {
        let (token, _) = service().issue(&user()).unwrap();

        let other = TokenService::new("another-secret-key-entirely", 3600);
        assert_eq!(other.validate(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_malformed_token() {
        let tokens = service();
        assert!(tokens.validate("not.a.valid.token").is_err());
        assert!(tokens.validate("").is_err());
        assert!(tokens.validate("garbage").is_err());
    }

    #[test]
    fn test_revoked_token() {
        let tokens = service();
        let (token, claims) = tokens.issue(&user()).unwrap();
        let (other, _) = tokens.issue(&user()).unwrap();

        tokens.revoke(&claims);
        assert_eq!(tokens.validate(&token), Err(AuthError::TokenRevoked));
        assert!(tokens.validate(&other).is_ok());
        assert_eq!(tokens.revoked_count(), 1);
    }

    #[test]
    fn test_expired_revocations_are_purged() {
        let tokens = service();
        let (_, mut claims) = tokens.issue(&user()).unwrap();
        claims.exp = Utc::now().timestamp() - 1000;

        tokens.revoke(&claims);
        assert_eq!(tokens.revoked_count(), 0);
    }
}
