//! Outbound send requests and their results.

use crate::counters::Counters;
use serde::{Deserialize, Serialize};

/// Maximum characters accepted in a single send request.
pub const MAX_TEXT_CHARS: usize = 255;

/// Modem send mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// GSM 03.38 default 7-bit alphabet.
    Gsm7,
    /// UCS-2 / unicode mode.
    Unicode,
}

/// A request to send one text to one or more numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    /// Recipient numbers, in order.
    pub recipients: Vec<String>,
    /// Message text.
    pub text: String,
    /// Explicit send mode; detected from the text when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
}

impl SendRequest {
    /// Build a request from a comma-separated number list.
    pub fn new(numbers: &str, text: impl Into<String>) -> Self {
        Self {
            recipients: split_recipients(numbers),
            text: text.into(),
            encoding: None,
        }
    }

    /// Force a send mode.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }
}

/// Split a comma-separated number list, trimming blanks.
pub fn split_recipients(numbers: &str) -> Vec<String> {
    numbers
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

/// Outcome of the send to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientOutcome {
    /// Recipient number.
    pub number: String,
    /// Whether the modem accepted the message.
    pub ok: bool,
    /// Failure description when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecipientOutcome {
    /// Successful send.
    pub fn sent(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            ok: true,
            error: None,
        }
    }

    /// Failed send.
    pub fn failed(number: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// Aggregated per-recipient result of a send request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResult {
    /// One entry per recipient, in request order.
    pub outcomes: Vec<RecipientOutcome>,
    /// Mode the text was sent in.
    pub encoding: Encoding,
    /// Ledger after this request, including charges not yet persisted.
    pub counters: Counters,
    /// Set when a delivered message could not be charged to the stored
    /// ledger. The charge is held in memory and retried on the next send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_error: Option<String>,
}

impl SendResult {
    /// Number of recipients that received the message.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.ok).count()
    }

    /// Number of recipients that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Some recipients failed while others succeeded.
    pub fn is_partial(&self) -> bool {
        self.succeeded() > 0 && self.failed() > 0
    }

    /// Every recipient succeeded.
    pub fn all_sent(&self) -> bool {
        self.failed() == 0
    }

    /// Short status label: `success`, `partial` or `error`.
    pub fn status_label(&self) -> &'static str {
        if self.all_sent() {
            "success"
        } else if self.is_partial() {
            "partial"
        } else {
            "error"
        }
    }
}
