//! Mock gateway for testing.
//!
//! Holds an in-memory modem inbox and status, records sends and deletes, and
//! can be told to fail specific calls.

use super::RemoteGateway;
use crate::error::GatewayError;
use async_trait::async_trait;
use sms_types::{Encoding, Message, MessageId, ModemInfo, NetworkInfo, SignalInfo, SimInfo};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A message handed to the modem for sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSms {
    /// Recipient number.
    pub number: String,
    /// Message text.
    pub text: String,
    /// Send mode requested.
    pub encoding: Encoding,
}

/// Mock gateway for testing.
///
/// Clones share state, so a test can keep a handle while the gateway under
/// test owns another.
#[derive(Debug, Default, Clone)]
pub struct MockGateway {
    inner: Arc<Mutex<MockGatewayInner>>,
    calls: Arc<CallTracker>,
}

#[derive(Debug, Default)]
struct MockGatewayInner {
    inbox: Vec<Message>,
    signal: SignalInfo,
    network: NetworkInfo,
    modem: ModemInfo,
    sim: SimInfo,
    sent: Vec<SentSms>,
    deleted: Vec<MessageId>,
    list_calls: usize,
    latency: Option<Duration>,
    fail_next_list: Option<GatewayError>,
    fail_next_delete: Option<GatewayError>,
    fail_next_status: Option<GatewayError>,
    failing_numbers: HashSet<String>,
}

#[derive(Debug, Default)]
struct CallTracker {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a CallTracker);

impl<'a> InFlight<'a> {
    fn enter(tracker: &'a CallTracker) -> Self {
        let now = tracker.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        tracker.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(tracker)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockGateway {
    /// Create an empty, online mock modem.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockGatewayInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a message into the modem inbox.
    pub fn deliver(&self, message: Message) {
        self.inner().inbox.push(message);
    }

    /// Messages currently in the inbox.
    pub fn inbox(&self) -> Vec<Message> {
        self.inner().inbox.clone()
    }

    /// Set the signal reported by `signal()`.
    pub fn set_signal(&self, signal: SignalInfo) {
        self.inner().signal = signal;
    }

    /// Set the network reported by `network()`.
    pub fn set_network(&self, network: NetworkInfo) {
        self.inner().network = network;
    }

    /// Set the modem details reported by `modem_info()`.
    pub fn set_modem(&self, modem: ModemInfo) {
        self.inner().modem = modem;
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.inner().latency = Some(latency);
    }

    /// Every send handed to the modem.
    pub fn sent(&self) -> Vec<SentSms> {
        self.inner().sent.clone()
    }

    /// Every id deleted.
    pub fn deleted(&self) -> Vec<MessageId> {
        self.inner().deleted.clone()
    }

    /// Number of `list_messages()` calls.
    pub fn list_calls(&self) -> usize {
        self.inner().list_calls
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_concurrent_calls(&self) -> usize {
        self.calls.max_in_flight.load(Ordering::SeqCst)
    }

    /// Cause the next `list_messages()` to fail.
    pub fn fail_next_list(&self, error: GatewayError) {
        self.inner().fail_next_list = Some(error);
    }

    /// Cause the next `delete_message()` to fail.
    pub fn fail_next_delete(&self, error: GatewayError) {
        self.inner().fail_next_delete = Some(error);
    }

    /// Cause the next status call (`signal()`) to fail.
    pub fn fail_next_status(&self, error: GatewayError) {
        self.inner().fail_next_status = Some(error);
    }

    /// Make every send to `number` fail with a connection error.
    pub fn fail_sends_to(&self, number: &str) {
        self.inner().failing_numbers.insert(number.to_string());
    }

    async fn simulate_latency(&self) {
        let latency = self.inner().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl RemoteGateway for MockGateway {
    async fn list_messages(&self) -> Result<Vec<Message>, GatewayError> {
        let _guard = InFlight::enter(&self.calls);
        self.simulate_latency().await;

        let mut inner = self.inner();
        inner.list_calls += 1;
        if let Some(error) = inner.fail_next_list.take() {
            return Err(error);
        }
        Ok(inner.inbox.clone())
    }

    async fn delete_message(&self, id: &MessageId) -> Result<(), GatewayError> {
        let _guard = InFlight::enter(&self.calls);
        self.simulate_latency().await;

        let mut inner = self.inner();
        if let Some(error) = inner.fail_next_delete.take() {
            return Err(error);
        }
        let before = inner.inbox.len();
        inner.inbox.retain(|m| &m.id != id);
        if inner.inbox.len() == before {
            return Err(GatewayError::Api {
                status: 404,
                message: format!("no message {id}"),
            });
        }
        inner.deleted.push(id.clone());
        Ok(())
    }

    async fn delete_all(&self) -> Result<usize, GatewayError> {
        let _guard = InFlight::enter(&self.calls);
        self.simulate_latency().await;

        let mut inner = self.inner();
        if let Some(error) = inner.fail_next_delete.take() {
            return Err(error);
        }
        let removed: Vec<MessageId> = inner.inbox.drain(..).map(|m| m.id).collect();
        let count = removed.len();
        inner.deleted.extend(removed);
        Ok(count)
    }

    async fn send_message(
        &self,
        number: &str,
        text: &str,
        encoding: Encoding,
    ) -> Result<(), GatewayError> {
        let _guard = InFlight::enter(&self.calls);
        self.simulate_latency().await;

        let mut inner = self.inner();
        if inner.failing_numbers.contains(number) {
            return Err(GatewayError::Connection(format!("send to {number} failed")));
        }
        inner.sent.push(SentSms {
            number: number.to_string(),
            text: text.to_string(),
            encoding,
        });
        Ok(())
    }

    async fn signal(&self) -> Result<SignalInfo, GatewayError> {
        let _guard = InFlight::enter(&self.calls);
        self.simulate_latency().await;

        let mut inner = self.inner();
        if let Some(error) = inner.fail_next_status.take() {
            return Err(error);
        }
        Ok(inner.signal.clone())
    }

    async fn network(&self) -> Result<NetworkInfo, GatewayError> {
        let _guard = InFlight::enter(&self.calls);
        Ok(self.inner().network.clone())
    }

    async fn modem_info(&self) -> Result<ModemInfo, GatewayError> {
        let _guard = InFlight::enter(&self.calls);
        Ok(self.inner().modem.clone())
    }

    async fn sim_info(&self) -> Result<SimInfo, GatewayError> {
        let _guard = InFlight::enter(&self.calls);
        Ok(self.inner().sim.clone())
    }

    async fn check_connection(&self) -> Result<(), GatewayError> {
        let _guard = InFlight::enter(&self.calls);
        let mut inner = self.inner();
        match inner.fail_next_status.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
