use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

use crate::config::AuthConfig;
use crate::errors::{ApplicationError, DomainError};

/// Argon2id hashing with the configured cost. Verification reads the cost
/// back from the stored PHC string, so hashes made under older settings keep
/// working after the settings change.
#[derive(Clone, Debug)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, DomainError> {
        let params = Params::new(memory_kib, iterations, 1, None).map_err(|error| {
            DomainError::Validation(format!("password hashing parameters are invalid: {error}"))
        })?;
        Ok(Self { params })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, DomainError> {
        Self::new(config.password_memory_kib, config.password_iterations)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// CPU bound; async callers run it on a blocking thread.
    pub fn hash(&self, password: &str) -> Result<String, ApplicationError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|error| ApplicationError::Internal(format!("password hashing failed: {error}")))
    }

    /// A malformed stored hash verifies as `false`.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        PasswordHash::new(stored_hash)
            .map(|parsed| self.argon2().verify_password(password.as_bytes(), &parsed).is_ok())
            .unwrap_or(false)
    }
}
