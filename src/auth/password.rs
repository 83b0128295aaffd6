//! Password hashing and verification
//!
//! Passwords are stored as bcrypt hashes.

use bcrypt::{hash, verify};

use crate::error::AuthError;

/// Hash a password using bcrypt
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    hash(password, cost).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        AuthError::HashingFailed
    })
}

/// Verify a password against a bcrypt hash
///
/// A stored value that is not a bcrypt hash never matches.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    match verify(password, hash) {
        Ok(matches) => Ok(matches),
        Err(bcrypt::BcryptError::InvalidHash(_)) | Err(bcrypt::BcryptError::InvalidPrefix(_)) => {
            tracing::warn!("Stored password hash is not a bcrypt hash");
            Ok(false)
        }
        Err(e) => {
            tracing::error!("Failed to verify password: {}", e);
            Err(AuthError::HashingFailed)
        }
    }
}

/// Password length requirements
#[derive(Debug, Clone)]
pub struct PasswordRequirements {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length (bcrypt ignores everything past 72 bytes)
    pub max_length: usize,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: 4,
            max_length: 72,
        }
    }
}

impl PasswordRequirements {
    pub fn with_min_length(min_length: usize) -> Self {
        Self {
            min_length,
            ..Default::default()
        }
    }

    /// Validate a password against these requirements
    pub fn validate(&self, password: &str) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if password.len() < self.min_length {
            errors.push(format!(
                "Password must be at least {} characters",
                self.min_length
            ));
        }

        if password.len() > self.max_length {
            errors.push(format!(
                "Password must be at most {} characters",
                self.max_length
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let password = "test_password_123";
        let hashed = hash_password(password, 4).unwrap(); // Use low cost for tests

        assert!(verify_password(password, &hashed).unwrap());
        assert!(!verify_password("wrong_password", &hashed).unwrap());
    }

    #[test]
    fn test_hash_produces_different_results() {
        let password = "same_password";
        let hash1 = hash_password(password, 4).unwrap();
        let hash2 = hash_password(password, 4).unwrap();

        // Different salts
        assert_ne!(hash1, hash2);

        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }

    #[test]
    fn test_garbage_hash_never_matches() {
        assert!(!verify_password("admin", "admin").unwrap());
    }

    #[test]
    fn test_password_requirements_default() {
        let req = PasswordRequirements::default();

        assert!(req.validate("admin").is_ok());
        assert!(req.validate("abc").is_err());
        assert!(req.validate("").is_err());
        assert!(req.validate(&"a".repeat(73)).is_err());
    }

    #[test]
    fn test_password_requirements_min_length() {
        let req = PasswordRequirements::with_min_length(8);

        let errors = req.validate("secret").unwrap_err();
        assert_eq!(errors, vec!["Password must be at least 8 characters"]);
        assert!(req.validate("password with spaces").is_ok());
    }
}
