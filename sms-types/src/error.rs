//! Error types for request validation.

use thiserror::Error;

/// A send request was rejected before reaching the modem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Text exceeds the single-request character limit.
    #[error("message text too long: {len} characters (limit: {limit})")]
    TooLong {
        /// Number of characters in the text.
        len: usize,
        /// Maximum allowed characters.
        limit: usize,
    },

    /// No recipient number left after splitting and trimming.
    #[error("no recipient number given")]
    NoRecipient,

    /// Text is empty.
    #[error("message text is empty")]
    EmptyText,
}
