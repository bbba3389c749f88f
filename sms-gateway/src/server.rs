//! Main SmsGateway coordination.
//!
//! SmsGateway owns the shared router session, the store, the publisher and
//! the two components built on them: the sync engine and the send
//! coordinator.

use crate::config::Config;
use crate::engine::{PassReport, SyncEngine};
use crate::publisher::Notifier;
use crate::sender::SendCoordinator;
use crate::session::RemoteSession;
use crate::storage::StateStore;
use sms_client::RemoteGateway;
use sms_types::ModemStatus;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Operational metrics for monitoring gateway activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    /// Passes that ran to completion.
    pub passes_total: AtomicU64,
    /// Passes aborted because listing failed.
    pub passes_aborted_total: AtomicU64,
    /// Ticks skipped because a pass was still running.
    pub passes_skipped_total: AtomicU64,
    /// Messages recorded for the first time.
    pub messages_new_total: AtomicU64,
    /// Messages auto-deleted from the modem.
    pub messages_deleted_total: AtomicU64,
    /// Broker publishes that failed.
    pub publish_failures_total: AtomicU64,
    /// SMS handed to the modem successfully.
    pub sms_sent_total: AtomicU64,
    /// Recipients the modem refused or never answered for.
    pub sms_failed_total: AtomicU64,
    /// Send requests rejected by validation.
    pub sends_rejected_total: AtomicU64,
    /// Set once a store write failed. Cleared only by a restart.
    pub durability_degraded: AtomicBool,
}

impl GatewayMetrics {
    /// Count a completed pass.
    pub fn record_pass_completed(&self, report: &PassReport) {
        self.passes_total.fetch_add(1, Ordering::Relaxed);
        self.messages_new_total
            .fetch_add(report.new as u64, Ordering::Relaxed);
        self.messages_deleted_total
            .fetch_add(report.deleted as u64, Ordering::Relaxed);
    }

    /// Count an aborted pass.
    pub fn record_pass_aborted(&self) {
        self.passes_aborted_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a skipped tick.
    pub fn record_pass_skipped(&self) {
        self.passes_skipped_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed publish.
    pub fn record_publish_failure(&self) {
        self.publish_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one delivered SMS.
    pub fn record_sms_sent(&self) {
        self.sms_sent_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one failed recipient.
    pub fn record_send_failed(&self) {
        self.sms_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a rejected send request.
    pub fn record_send_rejected(&self) {
        self.sends_rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Flag that a store write was lost.
    pub fn mark_durability_degraded(&self) {
        if !self.durability_degraded.swap(true, Ordering::Relaxed) {
            tracing::error!("State store write failed, durability degraded until restart");
        }
    }

    /// Whether a store write has failed since startup.
    pub fn is_durability_degraded(&self) -> bool {
        self.durability_degraded.load(Ordering::Relaxed)
    }
}

/// Main gateway service.
pub struct SmsGateway {
    config: Config,
    store: Arc<dyn StateStore>,
    session: Arc<RemoteSession>,
    notifier: Arc<Notifier>,
    metrics: Arc<GatewayMetrics>,
    status: Arc<RwLock<ModemStatus>>,
    engine: Arc<SyncEngine>,
    sender: Arc<SendCoordinator>,
}

impl std::fmt::Debug for SmsGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsGateway")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .field("mqtt_enabled", &self.notifier.is_enabled())
            .finish_non_exhaustive()
    }
}

impl SmsGateway {
    /// Wire up the gateway around a router client, a store and a publisher.
    pub fn new(
        config: Config,
        store: Arc<dyn StateStore>,
        gateway: Arc<dyn RemoteGateway>,
        notifier: Arc<Notifier>,
    ) -> Self {
        let session = Arc::new(RemoteSession::new(gateway, config.keenetic.call_timeout()));
        let metrics = Arc::new(GatewayMetrics::default());
        let status = Arc::new(RwLock::new(ModemStatus::default()));

        let engine = Arc::new(SyncEngine::new(
            session.clone(),
            store.clone(),
            notifier.clone(),
            metrics.clone(),
            status.clone(),
            config.sync.auto_delete,
        ));
        let sender = Arc::new(SendCoordinator::new(
            session.clone(),
            store.clone(),
            notifier.clone(),
            metrics.clone(),
            config.billing.cost(),
        ));

        Self {
            config,
            store,
            session,
            notifier,
            metrics,
            status,
            engine,
            sender,
        }
    }

    /// Get the gateway configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the state store.
    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Get access to the shared router session.
    pub fn session(&self) -> &RemoteSession {
        &self.session
    }

    /// Get access to the publisher.
    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    /// Get a clone of the sync engine Arc for the background task.
    pub fn engine(&self) -> Arc<SyncEngine> {
        self.engine.clone()
    }

    /// Get a clone of the send coordinator Arc.
    pub fn sender(&self) -> Arc<SendCoordinator> {
        self.sender.clone()
    }

    /// Last-known-good modem snapshot.
    pub async fn status(&self) -> ModemStatus {
        self.status.read().await.clone()
    }
}
