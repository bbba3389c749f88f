//! JSON bodies of event topics.

use crate::error::SendError;
use serde::Serialize;
use sms_types::{Counters, Message, SendResult};

/// Local wall-clock time as shown in event payloads.
pub fn local_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Body of the `send_status` topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendStatus {
    /// `ready`, `success`, `partial`, `error` or `missing_fields`.
    pub status: &'static str,
    /// Recipients as requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    /// Message text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Recipients that received the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent: Option<usize>,
    /// Recipients that failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    /// Human readable note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the status was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl SendStatus {
    fn bare(status: &'static str) -> Self {
        Self {
            status,
            number: None,
            text: None,
            sent: None,
            failed: None,
            message: None,
            error: None,
            timestamp: None,
        }
    }

    /// Initial state published on connect.
    pub fn ready() -> Self {
        Self::bare("ready")
    }

    /// Outcome of a send that reached the modem.
    pub fn from_result(number: &str, text: &str, result: &SendResult) -> Self {
        let error = result
            .outcomes
            .iter()
            .filter_map(|o| o.error.as_ref().map(|e| format!("{}: {}", o.number, e)))
            .collect::<Vec<_>>();

        Self {
            number: Some(number.to_string()),
            text: Some(text.to_string()),
            sent: Some(result.succeeded()),
            failed: Some(result.failed()),
            error: (!error.is_empty()).then(|| error.join("; ")),
            message: result
                .ledger_error
                .as_ref()
                .map(|e| format!("Ledger not updated: {e}")),
            timestamp: Some(local_timestamp()),
            ..Self::bare(result.status_label())
        }
    }

    /// A send rejected before reaching the modem.
    pub fn rejected(number: &str, text: &str, error: &SendError) -> Self {
        Self {
            number: Some(number.to_string()),
            text: Some(text.to_string()),
            error: Some(error.to_string()),
            timestamp: Some(local_timestamp()),
            ..Self::bare("error")
        }
    }

    /// Send button pressed with an empty input.
    pub fn missing_fields() -> Self {
        Self {
            message: Some("Please fill in phone number and message text first".to_string()),
            timestamp: Some(local_timestamp()),
            ..Self::bare("missing_fields")
        }
    }

    /// An inbound command could not be processed.
    pub fn command_failed(topic: &str, reason: &str) -> Self {
        Self {
            message: Some(format!("Command processing failed: {reason}")),
            error: Some(format!("{topic}: {reason}")),
            timestamp: Some(local_timestamp()),
            ..Self::bare("error")
        }
    }
}

/// Body of the `delete_sms_status` topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteStatus {
    /// `idle`, `success` or `error`.
    pub status: &'static str,
    /// Messages removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<usize>,
    /// Human readable note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the status was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl DeleteStatus {
    /// Initial state published on connect.
    pub fn idle() -> Self {
        Self {
            status: "idle",
            deleted_count: None,
            message: None,
            error: None,
            timestamp: None,
        }
    }

    /// Bulk delete finished.
    pub fn deleted(count: usize) -> Self {
        Self {
            status: "success",
            deleted_count: Some(count),
            message: Some(format!("Deleted {count} SMS messages")),
            error: None,
            timestamp: Some(local_timestamp()),
        }
    }

    /// Bulk delete failed.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: "error",
            deleted_count: None,
            message: None,
            error: Some(error.into()),
            timestamp: Some(local_timestamp()),
        }
    }
}

/// Body of the `sms_counter/state` topic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CounterState {
    /// Messages sent.
    pub count: u64,
    /// Accumulated cost.
    pub cost: f64,
}

impl From<Counters> for CounterState {
    fn from(counters: Counters) -> Self {
        Self {
            count: counters.sent_count,
            cost: counters.total_cost.as_decimal(),
        }
    }
}

/// Body of the `sms/state` topic: the message plus when it was announced.
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedSms<'a> {
    /// The message as listed.
    #[serde(flatten)]
    pub message: &'a Message,
    /// When the gateway announced it.
    pub timestamp: String,
}

impl<'a> ReceivedSms<'a> {
    /// Stamp a message with the current time.
    pub fn now(message: &'a Message) -> Self {
        Self {
            message,
            timestamp: local_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sms_types::{Cost, Encoding, MessageId, RecipientOutcome, SmsState};

    #[test]
    fn partial_send_status_lists_failures() {
        let result = SendResult {
            outcomes: vec![
                RecipientOutcome::sent("+1"),
                RecipientOutcome::failed("+2", "connection failed"),
            ],
            encoding: Encoding::Gsm7,
            counters: Counters::default(),
            ledger_error: None,
        };

        let status = SendStatus::from_result("+1,+2", "hi", &result);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "partial");
        assert_eq!(json["sent"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["error"], "+2: connection failed");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn ready_status_is_minimal() {
        let json = serde_json::to_string(&SendStatus::ready()).unwrap();
        assert_eq!(json, r#"{"status":"ready"}"#);
        let json = serde_json::to_string(&DeleteStatus::idle()).unwrap();
        assert_eq!(json, r#"{"status":"idle"}"#);
    }

    #[test]
    fn delete_status_reports_count() {
        let json = serde_json::to_value(DeleteStatus::deleted(3)).unwrap();
        assert_eq!(json["deleted_count"], 3);
        assert_eq!(json["message"], "Deleted 3 SMS messages");
    }

    #[test]
    fn counter_state_uses_short_names() {
        let state = CounterState::from(Counters {
            sent_count: 4,
            total_cost: Cost::from_decimal(0.2),
        });
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["count"], 4);
        assert!((json["cost"].as_f64().unwrap() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn received_sms_flattens_message() {
        let message = Message {
            id: MessageId::new("nv-1"),
            sender: "+420123456789".into(),
            timestamp: "2025-01-19 14:30:00".into(),
            text: "Hello".into(),
            state: SmsState::Unread,
        };
        let json = serde_json::to_value(ReceivedSms::now(&message)).unwrap();
        assert_eq!(json["Text"], "Hello");
        assert_eq!(json["Date"], "2025-01-19 14:30:00");
        assert_eq!(json["State"], "UnRead");
        assert!(json["timestamp"].is_string());
    }
}
