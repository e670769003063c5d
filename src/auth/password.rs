use bcrypt::{hash, verify, DEFAULT_COST};
use crate::errors::{AppError, Result};

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str) -> Result<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        verify(password, hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to verify password: {}", e)))
    }

    /// bcrypt is CPU bound, so hashing runs on the blocking pool.
    pub async fn hash_password_async(password: String) -> Result<String> {
        tokio::task::spawn_blocking(move || Self::hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
    }

    pub async fn verify_password_async(password: String, hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || Self::verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
    }

    pub fn validate_password_strength(password: &str) -> Result<()> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }

        if password.trim().is_empty() {
            return Err(AppError::Validation("Password cannot be blank".to_string()));
        }

        Ok(())
    }
}
