//! Password hashing
//!
//! Credentials are stored as PHC strings (`$argon2id$v=19$...`), so the
//! parameters travel with each hash and can change without a migration.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::Rng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to generate salt: {0}")]
    Salt(String),

    #[error("Failed to hash password: {0}")]
    Hash(String),
}

fn salt() -> Result<SaltString, HashError> {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    SaltString::encode_b64(&bytes).map_err(|e| HashError::Salt(e.to_string()))
}

/// Hash a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> Result<String, HashError> {
    Argon2::default()
        .hash_password(password.as_bytes(), &salt()?)
        .map(|h| h.to_string())
        .map_err(|e| HashError::Hash(e.to_string()))
}

/// Check a password against a stored PHC string.
///
/// A malformed hash verifies as false rather than erroring.
pub fn verify_password(password: &str, credential_hash: &str) -> bool {
    PasswordHash::new(credential_hash)
        .map(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Whether `value` parses as a PHC password hash
pub fn is_password_hash(value: &str) -> bool {
    PasswordHash::new(value).is_ok()
}
