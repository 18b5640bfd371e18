//! Password hashing with argon2.
//!
//! Hashes are stored in PHC string format, so the salt and parameters travel
//! with the hash and verification needs nothing else.
//!
//! argon2 is CPU-bound on purpose. Async callers use [`hash_password_async`]
//! and [`verify_password_async`], which run on tokio's blocking pool.

use crate::error::{AuthError, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hash a plaintext password with a fresh random salt.
///
/// # Errors
///
/// Returns [`AuthError::PasswordHash`] if argon2 rejects the input.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Check a plaintext password against a stored PHC hash.
///
/// # Errors
///
/// Returns [`AuthError::PasswordHash`] if the stored hash is malformed.
/// A wrong password is `Ok(false)`, not an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::PasswordHash(e.to_string())),
    }
}

/// [`hash_password`] on the blocking pool.
///
/// # Errors
///
/// Returns [`AuthError::PasswordHash`] if argon2 rejects the input, or
/// [`AuthError::InternalError`] if the blocking task is lost.
pub async fn hash_password_async(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::InternalError(format!("password hashing task failed: {e}")))?
}

/// [`verify_password`] on the blocking pool.
///
/// # Errors
///
/// Returns [`AuthError::PasswordHash`] if the stored hash is malformed, or
/// [`AuthError::InternalError`] if the blocking task is lost.
pub async fn verify_password_async(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::InternalError(format!("password check task failed: {e}")))?
}
