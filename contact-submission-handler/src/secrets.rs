use crate::error::EnvironmentError;
use async_trait::async_trait;

#[async_trait]
pub trait SecretRepository: Send + Sync {
    async fn open() -> Self
    where
        Self: Sized;

    async fn get_secret(&self, name: &'static str) -> Result<String, EnvironmentError>;
}

/// Reads secrets from the process environment, after loading a `.env` file if one is present.
pub struct EnvironmentSecretRepository;

#[async_trait]
impl SecretRepository for EnvironmentSecretRepository {
    async fn open() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::info!("Loaded environment from {}", path.display());
        }
        Self
    }

    async fn get_secret(&self, name: &'static str) -> Result<String, EnvironmentError> {
        std::env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(EnvironmentError::MissingSecret(name))
    }
}
