//! Store wrapper with switchable write failures, for tests.

use super::{SqliteStore, StateStore};
use crate::error::StoreError;
use async_trait::async_trait;
use sms_types::{Cost, Counters, Fingerprint};
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory [`SqliteStore`] whose writes can be made to fail.
pub(crate) struct FaultyStore {
    inner: SqliteStore,
    fail_record: AtomicBool,
    fail_increment: AtomicBool,
    fail_reset: AtomicBool,
}

impl FaultyStore {
    pub(crate) async fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory().await.unwrap(),
            fail_record: AtomicBool::new(false),
            fail_increment: AtomicBool::new(false),
            fail_reset: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_record(&self, fail: bool) {
        self.fail_record.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_increment(&self, fail: bool) {
        self.fail_increment.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_reset(&self, fail: bool) {
        self.fail_reset.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("disk I/O error".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for FaultyStore {
    async fn record_processed(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        Self::check(&self.fail_record)?;
        self.inner.record_processed(fingerprint).await
    }

    async fn is_processed(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        self.inner.is_processed(fingerprint).await
    }

    async fn processed_count(&self) -> Result<u64, StoreError> {
        self.inner.processed_count().await
    }

    async fn clear_processed(&self) -> Result<u64, StoreError> {
        self.inner.clear_processed().await
    }

    async fn increment_counters(&self, cost: Cost) -> Result<Counters, StoreError> {
        Self::check(&self.fail_increment)?;
        self.inner.increment_counters(cost).await
    }

    async fn counters(&self) -> Result<Counters, StoreError> {
        self.inner.counters().await
    }

    async fn reset_counters(&self) -> Result<(), StoreError> {
        Self::check(&self.fail_reset)?;
        self.inner.reset_counters().await
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.inner.flush().await
    }
}
