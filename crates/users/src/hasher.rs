use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

use crate::ports::Hasher;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("invalid Argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("password hashing error: {0}")]
    Hash(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("password does not match")]
    Mismatch,
}

/// Argon2id hasher producing PHC strings.
///
/// Verification reads the parameters embedded in the stored hash, so hashes
/// made with older settings keep verifying after a cost change.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Argon2id with the crate's recommended defaults.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Argon2id with explicit memory (KiB), iteration and parallelism costs.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, HashError> {
        let params =
            Params::new(m_cost, t_cost, p_cost, None).map_err(|e| HashError::InvalidParams(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError::Hash(e.to_string()))
    }

    fn compare(&self, plain: &str, hashed: &str) -> Result<(), HashError> {
        let parsed = PasswordHash::new(hashed).map_err(|e| HashError::MalformedHash(e.to_string()))?;
        self.argon2
            .verify_password(plain.as_bytes(), &parsed)
            .map_err(|_| HashError::Mismatch)
    }
}
