//! Notification publisher.
//!
//! Pushes gateway state to an MQTT broker in the layout Home Assistant
//! discovers, and turns inbound command topics into gateway actions.
//!
//! Nothing is queued while the broker is unreachable: a publish on a down
//! link fails with [`PublishError::NotConnected`] and the caller logs it.
//! The next pass publishes fresh state anyway.

mod commands;
mod discovery;
mod memory;
mod mqtt;
mod payloads;
mod topics;

pub use commands::{spawn_command_task, Command, CommandError, CommandHandler, Inbound};
pub(crate) use commands::send_request;
pub use discovery::{descriptors, Descriptor, DiscoveryOptions, DEVICE_ID};
pub use memory::{MemoryLink, Published};
pub use mqtt::{MqttDriver, MqttLink};
pub use payloads::{CounterState, DeleteStatus, ReceivedSms, SendStatus};
pub use topics::Topics;

use crate::error::{PublishError, PublishResult};
use async_trait::async_trait;
use serde::Serialize;
use sms_core::ConnectivityReport;
use sms_types::{Counters, Message, ModemInfo, NetworkInfo, SignalInfo, SimInfo, SmsCapacity};
use std::sync::Arc;
use std::time::Duration;

/// Availability payload while the gateway runs.
pub const ONLINE: &str = "online";

/// Availability payload after shutdown (also the last will).
pub const OFFLINE: &str = "offline";

/// Transport seam between the publisher and a broker client.
#[async_trait]
pub trait BrokerLink: Send + Sync {
    /// Publish one message at least once.
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> PublishResult<()>;

    /// Subscribe to one topic.
    async fn subscribe(&self, topic: &str) -> PublishResult<()>;

    /// Whether the broker acknowledged the current connection.
    fn is_connected(&self) -> bool;
}

/// Publishes gateway state through an optional broker link.
///
/// With no link (MQTT disabled) every publish succeeds without doing
/// anything.
pub struct Notifier {
    link: Option<Arc<dyn BrokerLink>>,
    topics: Topics,
    discovery: DiscoveryOptions,
}

impl Notifier {
    /// Publisher over `link`.
    pub fn new(link: Arc<dyn BrokerLink>, topics: Topics, discovery: DiscoveryOptions) -> Self {
        Self {
            link: Some(link),
            topics,
            discovery,
        }
    }

    /// Publisher that drops everything.
    pub fn disabled(topics: Topics) -> Self {
        Self {
            link: None,
            topics,
            discovery: DiscoveryOptions::default(),
        }
    }

    /// Topic layout.
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Whether a broker link is configured.
    pub fn is_enabled(&self) -> bool {
        self.link.is_some()
    }

    /// Whether the broker link is up.
    pub fn is_connected(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.is_connected())
    }

    /// Publish a raw text payload.
    pub async fn publish_text(&self, topic: &str, payload: &str, retain: bool) -> PublishResult<()> {
        let Some(link) = &self.link else {
            return Ok(());
        };
        link.publish(topic, payload.as_bytes().to_vec(), retain)
            .await
    }

    /// Publish a JSON payload.
    pub async fn publish_state<T>(&self, topic: &str, payload: &T, retain: bool) -> PublishResult<()>
    where
        T: Serialize + ?Sized + Sync,
    {
        let Some(link) = &self.link else {
            return Ok(());
        };
        let body = serde_json::to_vec(payload)?;
        link.publish(topic, body, retain).await
    }

    /// Publish every discovery descriptor, retained.
    ///
    /// Descriptors are stable, so republishing is idempotent. Returns the
    /// number published.
    pub async fn publish_discovery(&self) -> PublishResult<usize> {
        let all = descriptors(&self.topics, &self.discovery);
        for descriptor in &all {
            let topic = self
                .topics
                .discovery(descriptor.component, &descriptor.unique_id);
            self.publish_state(&topic, &descriptor.config, true).await?;
        }
        Ok(all.len())
    }

    /// Everything owed to the broker after a (re)connection: availability,
    /// discovery, initial event states and command subscriptions.
    pub async fn announce(&self) -> PublishResult<()> {
        let Some(link) = &self.link else {
            return Ok(());
        };

        self.publish_text(&self.topics.availability(), ONLINE, true)
            .await?;
        let published = self.publish_discovery().await?;
        self.publish_send_status(&SendStatus::ready()).await?;
        self.publish_state(&self.topics.delete_status(), &DeleteStatus::idle(), true)
            .await?;

        for topic in self.topics.subscriptions() {
            link.subscribe(&topic).await?;
        }

        tracing::info!("Announced {} discovery descriptors", published);
        Ok(())
    }

    /// A newly arrived message.
    pub async fn publish_message(&self, message: &Message) -> PublishResult<()> {
        self.publish_state(&self.topics.last_sms(), &ReceivedSms::now(message), true)
            .await
    }

    /// Signal quality.
    pub async fn publish_signal(&self, signal: &SignalInfo) -> PublishResult<()> {
        self.publish_state(&self.topics.signal(), signal, true).await
    }

    /// Network registration.
    pub async fn publish_network(&self, network: &NetworkInfo) -> PublishResult<()> {
        self.publish_state(&self.topics.network(), network, true)
            .await
    }

    /// Modem hardware details.
    pub async fn publish_modem_info(&self, modem: &ModemInfo) -> PublishResult<()> {
        self.publish_state(&self.topics.modem_info(), modem, true)
            .await
    }

    /// SIM details.
    pub async fn publish_sim_info(&self, sim: &SimInfo) -> PublishResult<()> {
        self.publish_state(&self.topics.sim_info(), sim, true).await
    }

    /// SMS storage usage.
    pub async fn publish_capacity(&self, capacity: &SmsCapacity) -> PublishResult<()> {
        self.publish_state(&self.topics.capacity(), capacity, true)
            .await
    }

    /// Router connectivity.
    pub async fn publish_device_status(&self, report: &ConnectivityReport) -> PublishResult<()> {
        self.publish_state(&self.topics.device_status(), report, true)
            .await
    }

    /// Sent count and cost.
    pub async fn publish_counters(&self, counters: Counters) -> PublishResult<()> {
        self.publish_state(&self.topics.counters(), &CounterState::from(counters), true)
            .await
    }

    /// Outcome of a send.
    pub async fn publish_send_status(&self, status: &SendStatus) -> PublishResult<()> {
        self.publish_state(&self.topics.send_status(), status, false)
            .await
    }

    /// Outcome of a bulk delete.
    pub async fn publish_delete_status(&self, status: &DeleteStatus) -> PublishResult<()> {
        self.publish_state(&self.topics.delete_status(), status, false)
            .await
    }

    /// Current phone number and message text inputs.
    pub async fn publish_inputs(&self, phone_number: &str, message_text: &str) -> PublishResult<()> {
        self.publish_text(&self.topics.phone_number_state(), phone_number, true)
            .await?;
        self.publish_text(&self.topics.message_text_state(), message_text, true)
            .await
    }

    /// Final device status and `offline` availability, bounded by `grace`.
    pub async fn shutdown(&self, report: &ConnectivityReport, grace: Duration) -> PublishResult<()> {
        if !self.is_connected() {
            return Ok(());
        }

        let farewell = async {
            if let Err(e) = self.publish_device_status(report).await {
                tracing::debug!(error = %e, "final device status not published");
            }
            self.publish_text(&self.topics.availability(), OFFLINE, true)
                .await
        };

        match tokio::time::timeout(grace, farewell).await {
            Ok(result) => result,
            Err(_) => Err(PublishError::Timeout),
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("enabled", &self.is_enabled())
            .field("connected", &self.is_connected())
            .field("topics", &self.topics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sms_core::DeviceConnectivity;

    fn notifier(link: &Arc<MemoryLink>) -> Notifier {
        Notifier::new(
            link.clone(),
            Topics::new("gw", "ha"),
            DiscoveryOptions::default(),
        )
    }

    #[tokio::test]
    async fn announce_publishes_discovery_and_subscribes() {
        let link = Arc::new(MemoryLink::new());
        let notifier = notifier(&link);

        notifier.announce().await.unwrap();

        assert_eq!(link.last_text("gw/availability").as_deref(), Some(ONLINE));
        let discovery = link
            .published()
            .into_iter()
            .filter(|p| p.topic.ends_with("/config"))
            .collect::<Vec<_>>();
        assert_eq!(discovery.len(), 16);
        assert!(discovery.iter().all(|p| p.retain));
        assert_eq!(link.subscriptions().len(), 8);
        assert_eq!(link.last_json("gw/send_status").unwrap()["status"], "ready");
        assert_eq!(link.last_json("gw/delete_sms_status").unwrap()["status"], "idle");
    }

    #[tokio::test]
    async fn discovery_is_idempotent() {
        let link = Arc::new(MemoryLink::new());
        let notifier = notifier(&link);

        notifier.publish_discovery().await.unwrap();
        let first = link.published();
        link.clear();
        notifier.publish_discovery().await.unwrap();

        assert_eq!(first, link.published());
    }

    #[tokio::test]
    async fn disconnected_link_drops_publishes() {
        let link = Arc::new(MemoryLink::new());
        link.set_connected(false);
        let notifier = notifier(&link);

        let result = notifier.publish_counters(Counters::default()).await;
        assert_eq!(result, Err(PublishError::NotConnected));

        link.set_connected(true);
        assert!(link.published().is_empty());
    }

    #[tokio::test]
    async fn disabled_notifier_is_a_no_op() {
        let notifier = Notifier::disabled(Topics::new("gw", "ha"));
        assert!(!notifier.is_enabled());
        notifier.announce().await.unwrap();
        notifier.publish_counters(Counters::default()).await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_marks_offline() {
        let link = Arc::new(MemoryLink::new());
        let notifier = notifier(&link);
        let report = DeviceConnectivity::new().report(0);

        notifier
            .shutdown(&report, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(link.last_text("gw/availability").as_deref(), Some(OFFLINE));
        assert_eq!(
            link.last_json("gw/device_status/state").unwrap()["status"],
            "offline"
        );
    }

    #[tokio::test]
    async fn inputs_are_retained() {
        let link = Arc::new(MemoryLink::new());
        let notifier = notifier(&link);

        notifier.publish_inputs("", "").await.unwrap();

        let published = link.published();
        assert_eq!(published.len(), 2);
        assert!(published.iter().all(|p| p.retain && p.payload.is_empty()));
    }
}
