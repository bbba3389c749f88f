//! Sent-message ledger.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Mul};

/// A non-negative monetary amount with exact arithmetic.
///
/// Stored as integer micro-units (1e-6 of the currency unit), so that
/// N sends at cost C always total exactly N × C.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cost(u64);

impl Cost {
    /// Micro-units per currency unit.
    pub const SCALE: u64 = 1_000_000;

    /// Zero cost.
    pub const ZERO: Cost = Cost(0);

    /// Create from micro-units.
    pub fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Convert a configured decimal amount. Negative and non-finite values
    /// clamp to zero.
    pub fn from_decimal(amount: f64) -> Self {
        if !amount.is_finite() || amount <= 0.0 {
            return Self::ZERO;
        }
        Self((amount * Self::SCALE as f64).round() as u64)
    }

    /// Micro-units.
    pub fn micros(&self) -> u64 {
        self.0
    }

    /// Approximate decimal value for display.
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// Whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost(self.0.saturating_add(rhs.0))
    }
}

impl Mul<u64> for Cost {
    type Output = Cost;

    fn mul(self, rhs: u64) -> Cost {
        Cost(self.0.saturating_mul(rhs))
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:06}",
            self.0 / Self::SCALE,
            self.0 % Self::SCALE
        )
    }
}

impl fmt::Debug for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cost({self})")
    }
}

impl Serialize for Cost {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Cost {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Cost::from_decimal)
    }
}

/// Sent count and accumulated cost. Always reset together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Successfully sent messages.
    pub sent_count: u64,
    /// Accumulated cost of those messages.
    pub total_cost: Cost,
}

impl Counters {
    /// Counters after one more successful send.
    pub fn incremented(self, cost: Cost) -> Self {
        Self {
            sent_count: self.sent_count.saturating_add(1),
            total_cost: self.total_cost + cost,
        }
    }
}
