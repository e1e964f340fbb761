//! Share link passwords, stored as Argon2id PHC strings.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use huddle_core::error::AppError;

/// Hashes share link passwords and checks download attempts against them.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    argon: Argon2<'static>,
}

impl PasswordHasher {
    /// Argon2id with the crate's default cost parameters.
    pub fn new() -> Self {
        Self {
            argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default()),
        }
    }

    /// Hash a new share password. Empty passwords are rejected.
    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        if password.is_empty() {
            return Err(AppError::validation("Share password must not be empty"));
        }
        let salt = SaltString::generate(&mut OsRng);
        password_hash::PasswordHasher::hash_password(&self.argon, password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::internal(format!("Cannot hash share password: {e}")))
    }

    /// Whether a download attempt may proceed.
    ///
    /// A link without a stored hash accepts anything. A protected link
    /// needs a candidate that verifies; a missing candidate never does.
    /// Only a corrupt stored hash is an error.
    pub fn admits(&self, stored: Option<&str>, candidate: Option<&str>) -> Result<bool, AppError> {
        let Some(stored) = stored else {
            return Ok(true);
        };
        let Some(candidate) = candidate else {
            return Ok(false);
        };
        let parsed = PasswordHash::new(stored)
            .map_err(|e| AppError::internal(format!("Stored share password hash is corrupt: {e}")))?;
        match self.argon.verify_password(candidate.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::internal(format!(
                "Share password verification failed: {e}"
            ))),
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}
