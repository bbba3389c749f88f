//! Send coordinator.
//!
//! Validates a send, hands it to the modem one recipient at a time, charges
//! the ledger for every recipient that went through and publishes the
//! outcome. Operator actions that touch the ledger or wipe the modem are
//! routed through here as well.

use crate::error::{SendError, StoreError};
use crate::publisher::{DeleteStatus, Notifier, SendStatus};
use crate::server::GatewayMetrics;
use crate::session::RemoteSession;
use crate::storage::StateStore;
use sms_client::GatewayError;
use sms_types::{Cost, Counters, RecipientOutcome, SendRequest, SendResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Serializes outbound sends against the shared router session.
pub struct SendCoordinator {
    session: Arc<RemoteSession>,
    store: Arc<dyn StateStore>,
    notifier: Arc<Notifier>,
    metrics: Arc<GatewayMetrics>,
    cost_per_message: Cost,
    unrecorded: AtomicU64,
}

impl SendCoordinator {
    /// Create a coordinator charging `cost_per_message` per delivered SMS.
    pub fn new(
        session: Arc<RemoteSession>,
        store: Arc<dyn StateStore>,
        notifier: Arc<Notifier>,
        metrics: Arc<GatewayMetrics>,
        cost_per_message: Cost,
    ) -> Self {
        Self {
            session,
            store,
            notifier,
            metrics,
            cost_per_message,
            unrecorded: AtomicU64::new(0),
        }
    }

    /// Send `request` to every recipient.
    ///
    /// Returns `Err` only when the request is rejected before any recipient
    /// is tried. Per-recipient transport failures are reported in the
    /// returned [`SendResult`].
    pub async fn send(&self, request: SendRequest) -> Result<SendResult, SendError> {
        let numbers = request.recipients.join(",");
        let text = request.text.clone();

        let validated = match sms_core::validate(request) {
            Ok(validated) => validated,
            Err(e) => {
                let error = SendError::from(e);
                self.metrics.record_send_rejected();
                tracing::warn!(error = %error, "send rejected");
                self.notify_send(&SendStatus::rejected(&numbers, &text, &error))
                    .await;
                return Err(error);
            }
        };

        let mut outcomes = Vec::with_capacity(validated.recipients.len());
        let mut latest: Option<Counters> = None;
        let mut ledger_error: Option<String> = None;

        for number in &validated.recipients {
            match self
                .session
                .send_message(number, &validated.text, validated.encoding)
                .await
            {
                Ok(()) => {
                    tracing::info!(recipient = %number, encoding = ?validated.encoding, "SMS sent");
                    self.metrics.record_sms_sent();
                    match self.charge().await {
                        Ok(counters) => latest = Some(counters),
                        Err(e) => ledger_error = Some(e.to_string()),
                    }
                    outcomes.push(RecipientOutcome::sent(number.as_str()));
                }
                Err(e) => {
                    self.metrics.record_send_failed();
                    tracing::error!(recipient = %number, error = %e, "SMS send failed");
                    outcomes.push(RecipientOutcome::failed(number.as_str(), e.to_string()));
                }
            }
        }

        let counters = match latest {
            Some(counters) => self.with_unrecorded(counters),
            None => self.current_counters().await,
        };
        let charged = latest.is_some() || ledger_error.is_some();

        let result = SendResult {
            outcomes,
            encoding: validated.encoding,
            counters,
            ledger_error,
        };

        self.notify_send(&SendStatus::from_result(&numbers, &validated.text, &result))
            .await;
        if charged {
            if let Err(e) = self.notifier.publish_counters(counters).await {
                tracing::debug!(error = %e, "counters not published");
            }
        }

        Ok(result)
    }

    /// Charge one delivered message to the ledger.
    ///
    /// Charges left over from earlier store failures are written first. On
    /// failure this charge joins them in memory.
    async fn charge(&self) -> Result<Counters, StoreError> {
        while self
            .unrecorded
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            if let Err(e) = self.store.increment_counters(self.cost_per_message).await {
                // Put the claimed charge back alongside this one
                self.unrecorded.fetch_add(1, Ordering::SeqCst);
                return Err(self.defer_charge(e));
            }
        }

        self.store
            .increment_counters(self.cost_per_message)
            .await
            .map_err(|e| self.defer_charge(e))
    }

    fn defer_charge(&self, error: StoreError) -> StoreError {
        let pending = self.unrecorded.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics.mark_durability_degraded();
        tracing::error!(error = %error, pending, "sent SMS not recorded in ledger, holding charge in memory");
        error
    }

    /// Charges the modem confirmed that the stored ledger does not hold yet.
    pub fn unrecorded_charges(&self) -> u64 {
        self.unrecorded.load(Ordering::SeqCst)
    }

    fn with_unrecorded(&self, counters: Counters) -> Counters {
        let pending = self.unrecorded_charges();
        Counters {
            sent_count: counters.sent_count + pending,
            total_cost: counters.total_cost + self.cost_per_message * pending,
        }
    }

    async fn current_counters(&self) -> Counters {
        match self.counters().await {
            Ok(counters) => counters,
            Err(e) => {
                tracing::error!(error = %e, "could not read ledger");
                self.with_unrecorded(Counters::default())
            }
        }
    }

    async fn notify_send(&self, status: &SendStatus) {
        if let Err(e) = self.notifier.publish_send_status(status).await {
            tracing::debug!(error = %e, "send status not published");
        }
    }

    /// Current ledger, including charges held in memory.
    pub async fn counters(&self) -> Result<Counters, StoreError> {
        Ok(self.with_unrecorded(self.store.counters().await?))
    }

    /// Zero the sent count and cost, then publish the zeroed ledger.
    pub async fn reset_counters(&self) -> Result<Counters, StoreError> {
        if let Err(e) = self.store.reset_counters().await {
            self.metrics.mark_durability_degraded();
            return Err(e);
        }
        self.unrecorded.store(0, Ordering::SeqCst);
        tracing::info!("SMS counter reset");

        let counters = Counters::default();
        if let Err(e) = self.notifier.publish_counters(counters).await {
            tracing::debug!(error = %e, "counters not published");
        }
        Ok(counters)
    }

    /// Delete every message on the modem and publish the outcome.
    pub async fn delete_all(&self) -> Result<usize, GatewayError> {
        let result = self.session.delete_all().await;

        let status = match &result {
            Ok(count) => {
                tracing::info!("Deleted {} SMS messages", count);
                DeleteStatus::deleted(*count)
            }
            Err(e) => {
                tracing::error!(error = %e, "delete all failed");
                DeleteStatus::failed(e.to_string())
            }
        };
        if let Err(e) = self.notifier.publish_delete_status(&status).await {
            tracing::debug!(error = %e, "delete status not published");
        }

        result
    }
}
