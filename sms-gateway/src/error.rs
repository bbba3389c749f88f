//! Error types for sms-gateway.

use sms_types::ValidationError;
use std::path::PathBuf;

/// Main error type for gateway startup and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Router client could not be built.
    #[error("router client error: {0}")]
    Gateway(#[from] sms_client::GatewayError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// State store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Legacy counter file could not be imported.
    #[error("legacy counter file {path}: {reason}")]
    Legacy {
        /// Path to the legacy file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A stored value is out of range.
    #[error("corrupt ledger: {0}")]
    Corrupt(String),
}

/// A send was rejected before any recipient was tried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// Text exceeds the character limit.
    #[error("message text too long: {len} characters (limit: {limit})")]
    TooLong {
        /// Number of characters in the text.
        len: usize,
        /// Maximum allowed characters.
        limit: usize,
    },

    /// No recipient given.
    #[error("no recipient number given")]
    NoRecipient,

    /// Text is empty.
    #[error("message text is empty")]
    EmptyText,
}

impl From<ValidationError> for SendError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::TooLong { len, limit } => Self::TooLong { len, limit },
            ValidationError::NoRecipient => Self::NoRecipient,
            ValidationError::EmptyText => Self::EmptyText,
        }
    }
}

/// Broker publish errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// No broker connection; the publish was dropped.
    #[error("not connected to broker")]
    NotConnected,

    /// The broker client rejected the request.
    #[error("broker client error: {0}")]
    Client(String),

    /// The request did not complete in time.
    #[error("publish timed out")]
    Timeout,

    /// Payload could not be encoded.
    #[error("payload serialization failed: {0}")]
    Serialize(String),
}

impl From<serde_json::Error> for PublishError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e.to_string())
    }
}

/// Result type alias for gateway startup.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for publish operations.
pub type PublishResult<T> = std::result::Result<T, PublishError>;
