//! Error types for the scrapper.

use thiserror::Error;

/// Common error type for the scrapper.
#[derive(Error, Debug)]
pub enum ScrapperError {
    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error (client construction, not per-request failures).
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for ScrapperError {
    fn from(e: sqlx::Error) -> Self {
        ScrapperError::Database(e.to_string())
    }
}

/// Result type alias for scrapper operations.
pub type Result<T> = std::result::Result<T, ScrapperError>;

/// Failure of a single link during an update cycle.
///
/// These never abort a cycle; the updater decides per variant whether the
/// link's timestamps are committed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// Kind-specific state required by the detector is absent.
    #[error("auxiliary state missing for link {0}")]
    AuxiliaryStateMissing(i64),

    /// The external source could not be reached, timed out or answered with an error.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// The resource was deleted or moved upstream.
    #[error("resource not found upstream: {0}")]
    NotFound(String),

    /// The notification was not confirmed delivered.
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Result type alias for detector and notifier calls.
pub type UpdateResult<T> = std::result::Result<T, UpdateError>;
