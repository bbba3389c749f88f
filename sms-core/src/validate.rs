//! Send request validation.

use crate::encoding::detect_encoding;
use sms_types::{split_recipients, Encoding, SendRequest, ValidationError, MAX_TEXT_CHARS};

/// A send request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSend {
    /// Individual recipient numbers, in request order.
    pub recipients: Vec<String>,
    /// Message text.
    pub text: String,
    /// Resolved send mode.
    pub encoding: Encoding,
}

/// Validate and normalize a send request.
///
/// Recipients are re-split on commas so a single entry holding a list is
/// expanded. An explicit encoding is kept as given; detection only runs when
/// the caller left it out.
pub fn validate(request: SendRequest) -> Result<ValidatedSend, ValidationError> {
    let recipients: Vec<String> = request
        .recipients
        .iter()
        .flat_map(|r| split_recipients(r))
        .collect();
    if recipients.is_empty() {
        return Err(ValidationError::NoRecipient);
    }

    let len = request.text.chars().count();
    if len == 0 {
        return Err(ValidationError::EmptyText);
    }
    if len > MAX_TEXT_CHARS {
        return Err(ValidationError::TooLong {
            len,
            limit: MAX_TEXT_CHARS,
        });
    }

    let encoding = request
        .encoding
        .unwrap_or_else(|| detect_encoding(&request.text));

    Ok(ValidatedSend {
        recipients,
        text: request.text,
        encoding,
    })
}
