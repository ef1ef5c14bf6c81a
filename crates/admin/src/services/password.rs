//! Password hashing.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::config::HashingConfig;
use crate::error::ServiceError;
use crate::models::HashedPassword;

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::PasswordHash` if hashing fails.
    fn hash(&self, plaintext: &str) -> Result<HashedPassword, ServiceError>;

    /// Check a plaintext password against a stored hash.
    ///
    /// A malformed stored hash verifies as `false`.
    fn verify(&self, plaintext: &str, hash: &HashedPassword) -> bool;
}

/// Argon2id hasher producing PHC strings with a random salt.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Build a hasher with explicit cost parameters.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidArgument` if the parameters are out of
    /// the ranges Argon2 accepts.
    pub fn with_config(config: &HashingConfig) -> Result<Self, ServiceError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| ServiceError::InvalidArgument(format!("argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<HashedPassword, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| HashedPassword::from_digest(hash.to_string()))
            .map_err(|_| ServiceError::PasswordHash)
    }

    fn verify(&self, plaintext: &str, hash: &HashedPassword) -> bool {
        let Ok(parsed) = PasswordHash::new(hash.as_str()) else {
            return false;
        };

        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
