//! SMS messages as listed by the modem.

use crate::ids::{Fingerprint, MessageId};
use serde::{Deserialize, Serialize};

/// Read state of a stored SMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmsState {
    /// Already read on the device.
    Read,
    /// Not yet read.
    #[serde(rename = "UnRead")]
    Unread,
}

impl SmsState {
    /// Map the modem's boolean read flag.
    pub fn from_read_flag(read: bool) -> Self {
        if read {
            Self::Read
        } else {
            Self::Unread
        }
    }
}

/// An SMS stored on the modem.
///
/// Serialized with the field names the REST and MQTT surfaces expose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Modem-assigned slot identifier.
    #[serde(rename = "Id")]
    pub id: MessageId,
    /// Sender phone number.
    #[serde(rename = "Number")]
    pub sender: String,
    /// Arrival time as reported by the device.
    #[serde(rename = "Date")]
    pub timestamp: String,
    /// Message body.
    #[serde(rename = "Text")]
    pub text: String,
    /// Read flag.
    #[serde(rename = "State")]
    pub state: SmsState,
}

impl Message {
    /// Dedup fingerprint of this message.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::derive(&self.id, &self.timestamp)
    }

    /// Whether the device reports the message as read.
    pub fn is_read(&self) -> bool {
        self.state == SmsState::Read
    }
}
