//! MQTT broker link over rumqttc.
//!
//! [`MqttLink`] is the publishing half, shared by everything that publishes.
//! [`MqttDriver`] owns the event loop: it polls the connection, feeds the
//! outcome to the broker link state machine, sleeps out the backoff and
//! forwards inbound command messages.

use super::commands::Inbound;
use super::{BrokerLink, Notifier, Topics, OFFLINE};
use crate::config::MqttConfig;
use crate::error::{PublishError, PublishResult};
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet,
    QoS,
};
use sms_core::{Backoff, LinkAction, LinkEvent, LinkState};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Capacity of the client request channel.
const REQUEST_CAPACITY: usize = 64;

/// Capacity of the inbound command channel.
const INBOUND_CAPACITY: usize = 32;

/// Upper bound for handing one request to the event loop.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishing half of the MQTT connection.
pub struct MqttLink {
    client: AsyncClient,
    connected: AtomicBool,
}

/// Event loop half of the MQTT connection.
pub struct MqttDriver {
    eventloop: EventLoop,
    link: Arc<MqttLink>,
    inbound: mpsc::Sender<Inbound>,
    backoff: Backoff,
    grace: Duration,
}

/// Broker options for `config`, with the `offline` last will on the
/// availability topic.
pub fn mqtt_options(config: &MqttConfig, topics: &Topics) -> MqttOptions {
    let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
    options.set_clean_session(true);
    options.set_last_will(LastWill::new(
        topics.availability(),
        OFFLINE,
        QoS::AtLeastOnce,
        true,
    ));
    if !config.username.is_empty() {
        options.set_credentials(config.username.clone(), config.password.clone());
    }
    options
}

impl MqttLink {
    /// Create the link and its driver. Nothing connects until the driver
    /// runs.
    pub fn new(
        config: &MqttConfig,
        topics: &Topics,
    ) -> (Arc<Self>, MqttDriver, mpsc::Receiver<Inbound>) {
        let (client, eventloop) = AsyncClient::new(mqtt_options(config, topics), REQUEST_CAPACITY);
        let link = Arc::new(Self {
            client,
            connected: AtomicBool::new(false),
        });
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);

        let driver = MqttDriver {
            eventloop,
            link: link.clone(),
            inbound: inbound_tx,
            backoff: Backoff::capped(config.max_backoff()),
            grace: config.shutdown_grace(),
        };

        (link, driver, inbound_rx)
    }

    fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

#[async_trait]
impl BrokerLink for MqttLink {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> PublishResult<()> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }
        let request = self
            .client
            .publish(topic, QoS::AtLeastOnce, retain, payload);
        match tokio::time::timeout(REQUEST_TIMEOUT, request).await {
            Ok(result) => result.map_err(|e| PublishError::Client(e.to_string())),
            Err(_) => Err(PublishError::Timeout),
        }
    }

    async fn subscribe(&self, topic: &str) -> PublishResult<()> {
        if !self.is_connected() {
            return Err(PublishError::NotConnected);
        }
        let request = self.client.subscribe(topic, QoS::AtLeastOnce);
        match tokio::time::timeout(REQUEST_TIMEOUT, request).await {
            Ok(result) => result.map_err(|e| PublishError::Client(e.to_string())),
            Err(_) => Err(PublishError::Timeout),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

enum Polled {
    Event(Result<Event, rumqttc::ConnectionError>),
    Shutdown,
}

impl MqttDriver {
    /// Run until shutdown is signalled.
    ///
    /// Every broker acknowledgement spawns `notifier.announce()`, so
    /// discovery and subscriptions are redone after each reconnect.
    pub async fn run(mut self, notifier: Arc<Notifier>, mut shutdown: watch::Receiver<bool>) {
        let mut state = LinkState::new();
        let mut events = VecDeque::from([LinkEvent::ConnectRequested]);
        tracing::info!("MQTT driver started");

        loop {
            while let Some(event) = events.pop_front() {
                let (next, actions) = state.on_event(event, &self.backoff);
                state = next;

                for action in actions {
                    match action {
                        // The event loop connects on the next poll
                        LinkAction::Connect => {}
                        LinkAction::Announce => {
                            self.link.set_connected(true);
                            tracing::info!("Connected to MQTT broker");
                            let notifier = notifier.clone();
                            tokio::spawn(async move {
                                if let Err(e) = notifier.announce().await {
                                    tracing::warn!(error = %e, "MQTT announce failed");
                                }
                            });
                        }
                        LinkAction::Report { error } => {
                            tracing::warn!("MQTT connection lost: {}", error);
                        }
                        LinkAction::Wait { delay } => {
                            tracing::debug!(?delay, "MQTT reconnect backoff");
                            tokio::select! {
                                _ = tokio::time::sleep(delay) => events.push_back(LinkEvent::TimerFired),
                                _ = shutdown.changed() => events.push_back(LinkEvent::ShutdownRequested),
                            }
                        }
                        LinkAction::Disconnect => {
                            self.disconnect().await;
                            tracing::info!("MQTT driver stopped");
                            return;
                        }
                    }
                }
            }

            if state.is_closed() {
                return;
            }

            let polled = tokio::select! {
                event = self.eventloop.poll() => Polled::Event(event),
                _ = shutdown.changed() => Polled::Shutdown,
            };

            match polled {
                Polled::Shutdown => events.push_back(LinkEvent::ShutdownRequested),
                Polled::Event(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                    if ack.code == ConnectReturnCode::Success {
                        events.push_back(LinkEvent::Acknowledged);
                    }
                }
                Polled::Event(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                    let inbound = Inbound {
                        topic: publish.topic.clone(),
                        payload: String::from_utf8_lossy(&publish.payload).into_owned(),
                    };
                    if self.inbound.try_send(inbound).is_err() {
                        tracing::warn!(topic = %publish.topic, "command queue full, dropping message");
                    }
                }
                Polled::Event(Ok(_)) => {}
                Polled::Event(Err(e)) => {
                    self.link.set_connected(false);
                    events.push_back(LinkEvent::Failed {
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    /// Send DISCONNECT and keep polling until it is written or the grace
    /// period runs out.
    async fn disconnect(&mut self) {
        let was_connected = self.link.is_connected();
        self.link.set_connected(false);
        if !was_connected {
            return;
        }

        let eventloop = &mut self.eventloop;
        let client = &self.link.client;
        let drain = async {
            if client.disconnect().await.is_err() {
                return;
            }
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };

        if tokio::time::timeout(self.grace, drain).await.is_err() {
            tracing::warn!("MQTT disconnect did not complete within grace period");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::DiscoveryOptions;

    fn config() -> MqttConfig {
        MqttConfig {
            host: "127.0.0.1".into(),
            port: 1,
            ..MqttConfig::default()
        }
    }

    #[test]
    fn options_carry_last_will() {
        let topics = Topics::new("gw", "ha");
        let mut config = config();
        config.keep_alive_secs = 1;

        let options = mqtt_options(&config, &topics);
        assert!(options.last_will().is_some());
        assert_eq!(options.keep_alive(), Duration::from_secs(5));
        assert_eq!(options.client_id(), "sms_keenetic_gateway");
    }

    #[tokio::test]
    async fn publish_fails_fast_before_connack() {
        let (link, _driver, _inbound) = MqttLink::new(&config(), &Topics::new("gw", "ha"));

        assert!(!link.is_connected());
        let result = link.publish("gw/availability", b"online".to_vec(), true).await;
        assert_eq!(result, Err(PublishError::NotConnected));
    }

    #[tokio::test]
    async fn driver_stops_on_shutdown_while_unreachable() {
        let topics = Topics::new("gw", "ha");
        let (link, driver, _inbound) = MqttLink::new(&config(), &topics);
        let notifier = Arc::new(Notifier::new(
            link,
            topics,
            DiscoveryOptions::default(),
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(driver.run(notifier, shutdown_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("driver should stop on shutdown")
            .expect("driver should not panic");
    }
}
