//! Application-wide error types.

use campaign_flow::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<GatewayError> for StorageError {
    fn from(err: GatewayError) -> Self {
        StorageError::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
