//! Common error types for the ESRS service

use thiserror::Error;

/// Common result type for persistence and configuration operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found (or owned by another tenant)
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation conflicts with the current state of a resource
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Calculation rejected its inputs
    #[error("Calculation error: {0}")]
    Calculation(#[from] esrs_calc::CalcError),

    #[error("Internal error: {0}")]
    Internal(String),
}
