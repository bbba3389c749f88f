//! Broker connection state machine.
//!
//! Pure lifecycle of the publish/subscribe connection. The state machine
//! takes events as input and produces a new state plus a list of actions.
//! Nothing is buffered while disconnected: the only thing retried is the
//! connection itself, with capped exponential backoff.
//!
//! Every successful (re)connection yields [`LinkAction::Announce`] exactly
//! once, so discovery descriptors are re-published after a broker restart.

use std::time::Duration;

/// Broker link state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Not connected and not trying.
    #[default]
    Disconnected,
    /// Connection attempt in progress.
    Connecting {
        /// Failed attempts so far (0 for the first connect).
        attempt: u32,
    },
    /// Connected and acknowledged by the broker.
    Connected,
    /// Waiting for the backoff timer before the next attempt.
    Reconnecting {
        /// Number of reconnection attempts so far.
        attempt: u32,
    },
    /// Shut down; no further attempts.
    Closed,
}

impl LinkState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function apart from backoff jitter.
    pub fn on_event(self, event: LinkEvent, backoff: &Backoff) -> (Self, Vec<LinkAction>) {
        match (self, event) {
            (Self::Disconnected, LinkEvent::ConnectRequested) => {
                (Self::Connecting { attempt: 0 }, vec![LinkAction::Connect])
            }

            (Self::Connecting { .. }, LinkEvent::Acknowledged) => {
                (Self::Connected, vec![LinkAction::Announce])
            }
            (Self::Connecting { attempt }, LinkEvent::Failed { error }) => {
                let next_attempt = attempt.saturating_add(1);
                (
                    Self::Reconnecting {
                        attempt: next_attempt,
                    },
                    vec![
                        LinkAction::Report { error },
                        LinkAction::Wait {
                            delay: backoff.delay(next_attempt),
                        },
                    ],
                )
            }

            (Self::Connected, LinkEvent::Failed { error }) => (
                Self::Reconnecting { attempt: 1 },
                vec![
                    LinkAction::Report { error },
                    LinkAction::Wait {
                        delay: backoff.delay(1),
                    },
                ],
            ),

            (Self::Reconnecting { attempt }, LinkEvent::TimerFired) => {
                (Self::Connecting { attempt }, vec![LinkAction::Connect])
            }
            // The client may reconnect on its own before our timer fires
            (Self::Reconnecting { .. }, LinkEvent::Acknowledged) => {
                (Self::Connected, vec![LinkAction::Announce])
            }

            (Self::Closed, _) => (Self::Closed, vec![]),
            (_, LinkEvent::ShutdownRequested) => (Self::Closed, vec![LinkAction::Disconnect]),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if the link has been shut down.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Events in the broker connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Start connecting.
    ConnectRequested,
    /// Broker acknowledged the connection.
    Acknowledged,
    /// Connect attempt failed or an established connection dropped.
    Failed {
        /// Error message describing the failure.
        error: String,
    },
    /// Backoff timer fired.
    TimerFired,
    /// Process is shutting down.
    ShutdownRequested,
}

/// Actions for the broker driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Attempt a connection.
    Connect,
    /// Publish availability, discovery descriptors and subscriptions.
    Announce,
    /// Log a connection failure.
    Report {
        /// Error message describing the failure.
        error: String,
    },
    /// Sleep before the next attempt.
    Wait {
        /// Delay before reconnecting.
        delay: Duration,
    },
    /// Close the connection.
    Disconnect,
}

/// Exponential backoff policy.
///
/// Formula: min(max, 2^attempt seconds + random(0..jitter)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Upper bound for any delay.
    pub max: Duration,
    /// Upper bound for random jitter.
    pub jitter: Duration,
}

impl Backoff {
    /// Policy capped at `max`, with up to one second of jitter.
    pub fn capped(max: Duration) -> Self {
        Self {
            max,
            jitter: Duration::from_secs(1),
        }
    }

    /// Delay before reconnection attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = Duration::from_secs(2u64.pow(attempt.min(16)));
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(random_u64() % (jitter_ms + 1))
        };
        (base + jitter).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::capped(Duration::from_secs(60))
    }
}

/// Random value for jitter; zero if the OS source is unavailable.
fn random_u64() -> u64 {
    let mut bytes = [0u8; 8];
    match getrandom::getrandom(&mut bytes) {
        Ok(()) => u64::from_le_bytes(bytes),
        Err(_) => 0,
    }
}
