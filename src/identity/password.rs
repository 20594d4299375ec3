use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::IdentityError;

pub fn hash(plain: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hashed = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            IdentityError::Internal(anyhow::anyhow!(e.to_string()))
        })?
        .to_string();
    Ok(hashed)
}

/// Hash on the blocking pool; argon2 is CPU-bound.
pub async fn hash_async(plain: String) -> Result<String, IdentityError> {
    tokio::task::spawn_blocking(move || hash(&plain))
        .await
        .map_err(|e| IdentityError::Internal(anyhow::anyhow!("join error: {e}")))?
}

/// True iff `plain` matches the salt and params embedded in `hashed`.
/// A mismatch is `Ok(false)`; only a malformed `hashed` input is an error.
pub fn verify(plain: &str, hashed: &str) -> Result<bool, IdentityError> {
    let parsed = PasswordHash::new(hashed).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        IdentityError::InvalidHashFormat
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
