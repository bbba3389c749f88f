//! Sync engine.
//!
//! Runs one reconciliation pass per tick: list the modem, record what is new,
//! optionally delete it from the modem, then publish. The phase order comes
//! from [`PassState`]; this module performs the I/O for each action and
//! feeds the outcome back.

use crate::error::PublishError;
use crate::publisher::Notifier;
use crate::server::GatewayMetrics;
use crate::session::{unix_now, RemoteSession};
use crate::storage::StateStore;
use sms_core::{PassAction, PassEvent, PassState};
use sms_types::{Message, ModemStatus, SmsCapacity};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// What one pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Messages listed on the modem.
    pub listed: usize,
    /// Messages recorded for the first time.
    pub new: usize,
    /// Messages deleted from the modem.
    pub deleted: usize,
    /// Publishes accepted by the broker link.
    pub published: usize,
    /// Whether every status call succeeded.
    pub status_ok: bool,
}

/// How a pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Ran to the end.
    Completed(PassReport),
    /// Another pass was still running.
    Skipped,
    /// Listing failed; nothing was recorded.
    Aborted(String),
}

/// Clears the in-progress flag when a pass ends, however it ends.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Reconciles modem state with the local ledger.
pub struct SyncEngine {
    session: Arc<RemoteSession>,
    store: Arc<dyn StateStore>,
    notifier: Arc<Notifier>,
    metrics: Arc<GatewayMetrics>,
    status: Arc<RwLock<ModemStatus>>,
    auto_delete: bool,
    in_progress: AtomicBool,
}

impl SyncEngine {
    /// Create an engine. `status` is the modem snapshot shared with the
    /// gateway and the metrics endpoint.
    pub fn new(
        session: Arc<RemoteSession>,
        store: Arc<dyn StateStore>,
        notifier: Arc<Notifier>,
        metrics: Arc<GatewayMetrics>,
        status: Arc<RwLock<ModemStatus>>,
        auto_delete: bool,
    ) -> Self {
        Self {
            session,
            store,
            notifier,
            metrics,
            status,
            auto_delete,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Whether a pass is running right now.
    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Run one pass. Returns [`PassOutcome::Skipped`] if one is already
    /// running.
    pub async fn run_pass(&self) -> PassOutcome {
        if self.in_progress.swap(true, Ordering::SeqCst) {
            self.metrics.record_pass_skipped();
            tracing::debug!("pass already running, skipping tick");
            return PassOutcome::Skipped;
        }
        let _guard = PassGuard(&self.in_progress);

        let mut state = PassState::new();
        let mut actions = VecDeque::new();
        let (next, first) = state.on_event(PassEvent::Tick {
            auto_delete: self.auto_delete,
        });
        state = next;
        actions.extend(first);

        let mut report = PassReport::default();
        let mut listed: Vec<Message> = Vec::new();
        let mut fresh: Vec<Message> = Vec::new();

        while let Some(action) = actions.pop_front() {
            let event = match action {
                PassAction::FetchRemote => match self.session.list_messages().await {
                    Ok(messages) => {
                        report.listed = messages.len();
                        listed = messages;
                        report.status_ok = self.refresh_status().await;
                        PassEvent::Listed {
                            count: report.listed,
                        }
                    }
                    Err(e) => PassEvent::ListingFailed {
                        error: e.to_string(),
                    },
                },
                PassAction::Classify => {
                    fresh = self.classify(std::mem::take(&mut listed)).await;
                    report.new = fresh.len();
                    PassEvent::Classified { new: report.new }
                }
                PassAction::DeleteNew => {
                    report.deleted = self.delete_new(&fresh).await;
                    PassEvent::Cleaned {
                        deleted: report.deleted,
                    }
                }
                PassAction::Publish => {
                    let remaining = report.listed.saturating_sub(report.deleted);
                    report.published = self.publish_batch(&fresh, remaining).await;
                    PassEvent::Published
                }
                PassAction::Complete { new } => {
                    self.metrics.record_pass_completed(&report);
                    if new > 0 {
                        tracing::info!(
                            listed = report.listed,
                            new,
                            deleted = report.deleted,
                            published = report.published,
                            "pass complete"
                        );
                    } else {
                        tracing::debug!(listed = report.listed, "pass complete, nothing new");
                    }
                    return PassOutcome::Completed(report);
                }
                PassAction::Abort { error } => {
                    self.metrics.record_pass_aborted();
                    tracing::warn!("Sync pass aborted: {}", error);
                    self.status.write().await.mark_offline();
                    let connectivity = self.session.connectivity();
                    if let Err(e) = self.notifier.publish_device_status(&connectivity).await {
                        tracing::debug!(error = %e, "device status not published");
                    }
                    return PassOutcome::Aborted(error);
                }
                PassAction::SkipTick => return PassOutcome::Skipped,
            };

            let (next, follow_up) = state.on_event(event);
            state = next;
            actions.extend(follow_up);
        }

        // The machine always ends in Complete or Abort
        PassOutcome::Aborted(format!("pass stopped in phase {}", state.phase()))
    }

    /// Refresh the status snapshot. On any failure the previous snapshot is
    /// kept and marked offline.
    async fn refresh_status(&self) -> bool {
        let fetched = async {
            let signal = self.session.signal().await?;
            let network = self.session.network().await?;
            let modem = self.session.modem_info().await?;
            let sim = self.session.sim_info().await?;
            Ok::<_, sms_client::GatewayError>((signal, network, modem, sim))
        }
        .await;

        let mut status = self.status.write().await;
        match fetched {
            Ok((signal, network, modem, sim)) => {
                status.refresh(signal, network, modem, sim, unix_now());
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "status refresh failed, keeping last snapshot");
                status.mark_offline();
                false
            }
        }
    }

    /// Record every listed message; return the ones seen for the first time.
    async fn classify(&self, listed: Vec<Message>) -> Vec<Message> {
        let mut fresh = Vec::new();
        for message in listed {
            let fingerprint = message.fingerprint();
            match self.store.record_processed(&fingerprint).await {
                Ok(true) => {
                    tracing::info!(id = %message.id, sender = %message.sender, "new SMS");
                    fresh.push(message);
                }
                Ok(false) => {}
                Err(e) => {
                    // Not recorded, so the next pass retries it
                    self.metrics.mark_durability_degraded();
                    tracing::error!(id = %message.id, error = %e, "could not record SMS");
                }
            }
        }
        fresh
    }

    /// Delete new messages from the modem, best effort.
    async fn delete_new(&self, fresh: &[Message]) -> usize {
        let mut deleted = 0;
        for message in fresh {
            match self.session.delete_message(&message.id).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    tracing::warn!(id = %message.id, error = %e, "auto-delete failed");
                }
            }
        }
        deleted
    }

    /// Publish new messages (oldest first, so the retained topic ends on the
    /// newest), the status snapshot, connectivity and the ledger.
    async fn publish_batch(&self, fresh: &[Message], remaining: usize) -> usize {
        let snapshot = {
            let mut status = self.status.write().await;
            status.capacity = SmsCapacity::used(u32::try_from(remaining).unwrap_or(u32::MAX));
            status.clone()
        };

        if !self.notifier.is_enabled() {
            return 0;
        }
        if !self.notifier.is_connected() {
            tracing::debug!(new = fresh.len(), "broker unavailable, skipping publish");
            return 0;
        }

        let mut ordered: Vec<&Message> = fresh.iter().collect();
        ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let mut results = Vec::with_capacity(ordered.len() + 7);
        for message in ordered {
            results.push(("sms", self.notifier.publish_message(message).await));
        }

        let connectivity = self.session.connectivity();

        results.push(("signal", self.notifier.publish_signal(&snapshot.signal).await));
        results.push(("network", self.notifier.publish_network(&snapshot.network).await));
        results.push(("modem_info", self.notifier.publish_modem_info(&snapshot.modem).await));
        results.push(("sim_info", self.notifier.publish_sim_info(&snapshot.sim).await));
        results.push(("sms_capacity", self.notifier.publish_capacity(&snapshot.capacity).await));
        results.push((
            "device_status",
            self.notifier.publish_device_status(&connectivity).await,
        ));
        match self.store.counters().await {
            Ok(counters) => results.push(("counters", self.notifier.publish_counters(counters).await)),
            Err(e) => tracing::error!(error = %e, "could not read ledger"),
        }

        let mut published = 0;
        for (what, result) in results {
            match result {
                Ok(()) => published += 1,
                Err(PublishError::NotConnected) => {
                    self.metrics.record_publish_failure();
                    tracing::debug!(what, "broker went away mid-batch");
                }
                Err(e) => {
                    self.metrics.record_publish_failure();
                    tracing::warn!(what, error = %e, "publish failed");
                }
            }
        }
        published
    }
}

/// Spawn the periodic sync task.
///
/// Ticks missed while a pass runs are skipped, not queued. The loop exits
/// between passes once `shutdown` flips.
pub fn spawn_sync_task(
    engine: Arc<SyncEngine>,
    interval_secs: u64,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(interval_secs.max(1));
        tracing::info!("Sync task started (interval: {}s)", period.as_secs());

        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = timer.tick() => {}
                _ = shutdown.changed() => break,
            }

            if let PassOutcome::Aborted(error) = engine.run_pass().await {
                tracing::debug!("Pass aborted, retrying next tick: {}", error);
            }
        }

        tracing::info!("Sync task stopped");
    })
}
