//! Password hashing with bcrypt, off the async runtime.

use crate::error::AppError;

pub use bcrypt::DEFAULT_COST;

pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hash task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("failed to hash password: {}", e)))
}

/// `Ok(false)` for a wrong password; a malformed stored hash also counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("verify task failed: {}", e)))?;
    match outcome {
        Ok(ok) => Ok(ok),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is not a bcrypt hash");
            Ok(false)
        }
    }
}
