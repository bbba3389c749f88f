//! State store for sms-gateway.
//!
//! Owns the processed-message set and the sent-count / cost ledger. Every
//! mutation is atomic and durable once it returns.

mod sqlite;
#[cfg(test)]
pub(crate) mod faulty;

pub use sqlite::SqliteStore;

use crate::error::StoreError;
use async_trait::async_trait;
use sms_types::{Cost, Counters, Fingerprint};

/// Trait for state store backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Record a fingerprint as announced.
    ///
    /// Returns `true` if it was not seen before. Check and insert happen in
    /// one statement, so concurrent callers never both get `true`.
    async fn record_processed(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError>;

    /// Whether a fingerprint has been recorded.
    async fn is_processed(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError>;

    /// Number of recorded fingerprints.
    async fn processed_count(&self) -> Result<u64, StoreError>;

    /// Forget every recorded fingerprint, returning how many were removed.
    async fn clear_processed(&self) -> Result<u64, StoreError>;

    /// Add one sent message costing `cost`, returning the updated ledger.
    async fn increment_counters(&self, cost: Cost) -> Result<Counters, StoreError>;

    /// Current ledger.
    async fn counters(&self) -> Result<Counters, StoreError>;

    /// Zero the count and the cost together.
    async fn reset_counters(&self) -> Result<(), StoreError>;

    /// Make sure everything written so far is on disk.
    async fn flush(&self) -> Result<(), StoreError>;
}
