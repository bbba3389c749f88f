//! In-memory broker link for tests.

use super::BrokerLink;
use crate::error::{PublishError, PublishResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One recorded publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Topic.
    pub topic: String,
    /// Raw payload.
    pub payload: Vec<u8>,
    /// Retain flag.
    pub retain: bool,
}

/// Broker link that records everything instead of talking to a broker.
///
/// Starts connected. While disconnected, publishes fail with
/// [`PublishError::NotConnected`] and are not recorded.
#[derive(Debug)]
pub struct MemoryLink {
    connected: AtomicBool,
    inner: Mutex<MemoryLinkInner>,
}

#[derive(Debug, Default)]
struct MemoryLinkInner {
    published: Vec<Published>,
    subscriptions: Vec<String>,
}

impl MemoryLink {
    /// A connected link with nothing recorded.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            inner: Mutex::new(MemoryLinkInner::default()),
        }
    }

    fn inner(&self) -> MutexGuard<'_, MemoryLinkInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate the broker going away or coming back.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Every recorded publish, oldest first.
    pub fn published(&self) -> Vec<Published> {
        self.inner().published.clone()
    }

    /// Recorded publishes to `topic`.
    pub fn published_to(&self, topic: &str) -> Vec<Published> {
        self.inner()
            .published
            .iter()
            .filter(|p| p.topic == topic)
            .cloned()
            .collect()
    }

    /// Latest payload on `topic` as text.
    pub fn last_text(&self, topic: &str) -> Option<String> {
        self.published_to(topic)
            .pop()
            .map(|p| String::from_utf8_lossy(&p.payload).into_owned())
    }

    /// Latest payload on `topic` parsed as JSON.
    pub fn last_json(&self, topic: &str) -> Option<serde_json::Value> {
        self.published_to(topic)
            .pop()
            .and_then(|p| serde_json::from_slice(&p.payload).ok())
    }

    /// Subscribed topics, in order.
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner().subscriptions.clone()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        let mut inner = self.inner();
        inner.published.clear();
        inner.subscriptions.clear();
    }
}

impl Default for MemoryLink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerLink for MemoryLink {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> PublishResult<()> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }
        self.inner().published.push(Published {
            topic: topic.to_string(),
            payload,
            retain,
        });
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> PublishResult<()> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }
        self.inner().subscriptions.push(topic.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
