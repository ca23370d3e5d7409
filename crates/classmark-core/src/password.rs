//! Password hashing and verification using bcrypt.

use std::sync::OnceLock;

use bcrypt::{DEFAULT_COST, hash, verify};

use crate::errors::AppError;

static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// A bcrypt hash nobody knows the password of. Verifying against it costs the
/// same as a real verification, so unknown accounts answer as slowly as known ones.
pub fn dummy_password_hash() -> &'static str {
    DUMMY_HASH.get_or_init(|| hash("classmark-timing-equalizer", DEFAULT_COST).unwrap_or_default())
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::internal_error(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::internal_error(format!("Failed to verify password: {}", e)))
}
