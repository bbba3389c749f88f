//! Shared router session.
//!
//! The router keeps a single authenticated session, so every remote call
//! from the sync engine, the send coordinator and the REST handlers goes
//! through one [`RemoteSession`]. The lock is held for exactly one call and
//! each call is bounded by the configured timeout.

use sms_client::{GatewayError, RemoteGateway};
use sms_core::{ConnectivityReport, DeviceConnectivity};
use sms_types::{Encoding, Message, MessageId, ModemInfo, NetworkInfo, SignalInfo, SimInfo};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex as AsyncMutex;

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Serialized, time-bounded access to the router.
pub struct RemoteSession {
    gateway: Arc<dyn RemoteGateway>,
    lock: AsyncMutex<()>,
    connectivity: Mutex<DeviceConnectivity>,
    timeout: Duration,
}

impl RemoteSession {
    /// Wrap a gateway; each call may take at most `timeout`.
    pub fn new(gateway: Arc<dyn RemoteGateway>, timeout: Duration) -> Self {
        Self {
            gateway,
            lock: AsyncMutex::new(()),
            connectivity: Mutex::new(DeviceConnectivity::new()),
            timeout,
        }
    }

    async fn guarded<T, F>(&self, op: &'static str, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        let _held = self.lock.lock().await;

        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        };

        let mut connectivity = self
            .connectivity
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match &result {
            Ok(_) => connectivity.record_success(unix_now()),
            // The router answered; only transport failures count against it
            Err(e) if !e.is_unreachable() => connectivity.record_success(unix_now()),
            Err(e) => {
                tracing::debug!(op, error = %e, "router call failed");
                connectivity.record_failure(e.to_string());
            }
        }

        result
    }

    /// List every SMS stored on the modem.
    pub async fn list_messages(&self) -> Result<Vec<Message>, GatewayError> {
        self.guarded("list_messages", self.gateway.list_messages())
            .await
    }

    /// Delete one stored SMS.
    pub async fn delete_message(&self, id: &MessageId) -> Result<(), GatewayError> {
        self.guarded("delete_message", self.gateway.delete_message(id))
            .await
    }

    /// Delete every stored SMS.
    pub async fn delete_all(&self) -> Result<usize, GatewayError> {
        self.guarded("delete_all", self.gateway.delete_all()).await
    }

    /// Send one SMS to one number.
    pub async fn send_message(
        &self,
        number: &str,
        text: &str,
        encoding: Encoding,
    ) -> Result<(), GatewayError> {
        self.guarded(
            "send_message",
            self.gateway.send_message(number, text, encoding),
        )
        .await
    }

    /// Current signal quality.
    pub async fn signal(&self) -> Result<SignalInfo, GatewayError> {
        self.guarded("signal", self.gateway.signal()).await
    }

    /// Current network registration.
    pub async fn network(&self) -> Result<NetworkInfo, GatewayError> {
        self.guarded("network", self.gateway.network()).await
    }

    /// Modem hardware details.
    pub async fn modem_info(&self) -> Result<ModemInfo, GatewayError> {
        self.guarded("modem_info", self.gateway.modem_info()).await
    }

    /// SIM details.
    pub async fn sim_info(&self) -> Result<SimInfo, GatewayError> {
        self.guarded("sim_info", self.gateway.sim_info()).await
    }

    /// Check that the modem interface responds.
    pub async fn check_connection(&self) -> Result<(), GatewayError> {
        self.guarded("check_connection", self.gateway.check_connection())
            .await
    }

    /// Connectivity judged from recent call outcomes.
    pub fn connectivity(&self) -> ConnectivityReport {
        self.connectivity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .report(unix_now())
    }
}
