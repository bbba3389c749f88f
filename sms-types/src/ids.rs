//! Identity and dedup types for SMS messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier the modem assigns to a stored SMS (e.g. `nv-2`).
///
/// Not stable across modem power cycles: a slot id may be reused for a
/// different message after a reboot.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Create a MessageId from the modem's string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

/// Dedup key for a listed message: identifier plus coarse timestamp.
///
/// SHA-256 over `id | minute-precision timestamp`, hex encoded. Reusing a slot
/// id for a different message yields a different fingerprint because the
/// arrival time differs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Length of the coarse timestamp prefix (`YYYY-MM-DD HH:MM`).
    pub const COARSE_LEN: usize = 16;

    /// Derive the fingerprint of a message.
    pub fn derive(id: &MessageId, timestamp: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"smsgw-fingerprint-v1");
        hasher.update(id.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(coarse_timestamp(timestamp).as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap an already-derived fingerprint (as loaded from storage).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Get the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.0[..self.0.len().min(12)])
    }
}

/// Truncate a device timestamp to minute precision.
fn coarse_timestamp(timestamp: &str) -> &str {
    let trimmed = timestamp.trim();
    match trimmed.char_indices().nth(Fingerprint::COARSE_LEN) {
        Some((idx, _)) => &trimmed[..idx],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_deterministic() {
        let id = MessageId::new("nv-2");
        let a = Fingerprint::derive(&id, "2025-01-19 14:30:00");
        let b = Fingerprint::derive(&id, "2025-01-19 14:30:00");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn fingerprint_ignores_seconds() {
        let id = MessageId::new("nv-2");
        let a = Fingerprint::derive(&id, "2025-01-19 14:30:00");
        let b = Fingerprint::derive(&id, "2025-01-19 14:30:59");
        assert_eq!(a, b);
    }

    #[test]
    fn reused_slot_with_new_time_differs() {
        let id = MessageId::new("nv-2");
        let before_reboot = Fingerprint::derive(&id, "2025-01-19 14:30:00");
        let after_reboot = Fingerprint::derive(&id, "2025-01-20 09:12:00");
        assert_ne!(before_reboot, after_reboot);
    }

    #[test]
    fn different_ids_differ() {
        let a = Fingerprint::derive(&MessageId::new("nv-1"), "2025-01-19 14:30:00");
        let b = Fingerprint::derive(&MessageId::new("nv-2"), "2025-01-19 14:30:00");
        assert_ne!(a, b);
    }

    #[test]
    fn short_timestamp_is_used_whole() {
        assert_eq!(coarse_timestamp("  12:00 "), "12:00");
        assert_eq!(coarse_timestamp(""), "");
    }

    #[test]
    fn message_id_serializes_as_string() {
        let json = serde_json::to_string(&MessageId::new("nv-34")).unwrap();
        assert_eq!(json, "\"nv-34\"");
    }
}
