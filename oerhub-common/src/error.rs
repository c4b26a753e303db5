//! Common error types for OERHub services

use thiserror::Error;

/// Common result type for OERHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across OERHub services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record failed structural validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// External service returned an error or was unreachable
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Message (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
