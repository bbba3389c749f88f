//! Inbound command topics.
//!
//! Home Assistant drives the gateway through a JSON send topic, three
//! buttons and two text inputs. The inputs are kept here until the send
//! button is pressed.

use super::{Notifier, SendStatus, Topics};
use crate::sender::SendCoordinator;
use serde::Deserialize;
use sms_types::{Encoding, SendRequest};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

/// Button payload.
pub const PRESS: &str = "PRESS";

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Topic it arrived on.
    pub topic: String,
    /// Payload as text.
    pub payload: String,
}

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send `text` to the comma-separated `numbers`.
    Send {
        /// Recipients.
        numbers: String,
        /// Message text.
        text: String,
        /// Force (`true`) or forbid (`false`) unicode mode.
        unicode: Option<bool>,
    },
    /// Send the current inputs.
    SendButton,
    /// Zero the sent counter and cost.
    ResetCounters,
    /// Delete every message on the modem.
    DeleteAll,
    /// Phone number input changed.
    SetPhoneNumber(String),
    /// Message text input changed.
    SetMessageText(String),
    /// Retained phone number seen after (re)subscribing.
    RestorePhoneNumber(String),
    /// Retained message text seen after (re)subscribing.
    RestoreMessageText(String),
}

/// A command payload could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Send payload is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// Send payload lacks a number or a text.
    #[error("Missing required field: number or text")]
    MissingFields,
}

#[derive(Debug, Deserialize)]
struct SendPayload {
    #[serde(alias = "target")]
    number: Option<String>,
    #[serde(alias = "message")]
    text: Option<String>,
    unicode: Option<bool>,
}

impl Command {
    /// Parse a message on `topic`. Unknown topics and button payloads other
    /// than `PRESS` yield `None`.
    pub fn parse(topics: &Topics, topic: &str, payload: &str) -> Result<Option<Self>, CommandError> {
        let command = if topic == topics.send() {
            let body: SendPayload = serde_json::from_str(payload)
                .map_err(|e| CommandError::InvalidJson(e.to_string()))?;
            match (body.number, body.text) {
                (Some(numbers), Some(text)) if !numbers.trim().is_empty() && !text.is_empty() => {
                    Self::Send {
                        numbers,
                        text,
                        unicode: body.unicode,
                    }
                }
                _ => return Err(CommandError::MissingFields),
            }
        } else if topic == topics.send_button() {
            return Ok((payload == PRESS).then_some(Self::SendButton));
        } else if topic == topics.reset_counter_button() {
            return Ok((payload == PRESS).then_some(Self::ResetCounters));
        } else if topic == topics.delete_all_button() {
            return Ok((payload == PRESS).then_some(Self::DeleteAll));
        } else if topic == topics.phone_number_set() {
            Self::SetPhoneNumber(payload.to_string())
        } else if topic == topics.message_text_set() {
            Self::SetMessageText(payload.to_string())
        } else if topic == topics.phone_number_state() {
            Self::RestorePhoneNumber(payload.to_string())
        } else if topic == topics.message_text_state() {
            Self::RestoreMessageText(payload.to_string())
        } else {
            return Ok(None);
        };
        Ok(Some(command))
    }
}

/// Send a request, mapping the optional unicode flag to an encoding hint.
pub(crate) fn send_request(numbers: &str, text: &str, unicode: Option<bool>) -> SendRequest {
    let request = SendRequest::new(numbers, text);
    match unicode {
        Some(true) => request.with_encoding(Encoding::Unicode),
        Some(false) => request.with_encoding(Encoding::Gsm7),
        None => request,
    }
}

#[derive(Debug, Default)]
struct TextInputs {
    phone_number: String,
    message_text: String,
}

/// Executes commands against the send coordinator.
pub struct CommandHandler {
    sender: Arc<SendCoordinator>,
    notifier: Arc<Notifier>,
    inputs: Mutex<TextInputs>,
}

impl CommandHandler {
    /// Handler with empty inputs.
    pub fn new(sender: Arc<SendCoordinator>, notifier: Arc<Notifier>) -> Self {
        Self {
            sender,
            notifier,
            inputs: Mutex::new(TextInputs::default()),
        }
    }

    /// Current phone number and message text inputs.
    pub async fn inputs(&self) -> (String, String) {
        let inputs = self.inputs.lock().await;
        (inputs.phone_number.clone(), inputs.message_text.clone())
    }

    /// Parse and execute one inbound message.
    pub async fn dispatch(&self, inbound: &Inbound) {
        match Command::parse(self.notifier.topics(), &inbound.topic, &inbound.payload) {
            Ok(Some(command)) => self.execute(command).await,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(topic = %inbound.topic, error = %e, "rejected command");
                let status = SendStatus::command_failed(&inbound.topic, &e.to_string());
                if let Err(e) = self.notifier.publish_send_status(&status).await {
                    tracing::debug!(error = %e, "command failure status not published");
                }
            }
        }
    }

    /// Execute a parsed command.
    pub async fn execute(&self, command: Command) {
        match command {
            Command::Send {
                numbers,
                text,
                unicode,
            } => {
                tracing::info!(recipients = %numbers, "send command received");
                // Outcome is published by the coordinator
                let _ = self.sender.send(send_request(&numbers, &text, unicode)).await;
            }
            Command::SendButton => self.send_inputs().await,
            Command::ResetCounters => {
                tracing::info!("reset counter button pressed");
                if let Err(e) = self.sender.reset_counters().await {
                    tracing::error!(error = %e, "counter reset failed");
                }
            }
            Command::DeleteAll => {
                tracing::info!("delete all button pressed");
                let _ = self.sender.delete_all().await;
            }
            Command::SetPhoneNumber(value) => {
                self.inputs.lock().await.phone_number = value.clone();
                if let Err(e) = self
                    .notifier
                    .publish_text(&self.notifier.topics().phone_number_state(), &value, true)
                    .await
                {
                    tracing::debug!(error = %e, "phone number state not published");
                }
            }
            Command::SetMessageText(value) => {
                self.inputs.lock().await.message_text = value.clone();
                if let Err(e) = self
                    .notifier
                    .publish_text(&self.notifier.topics().message_text_state(), &value, true)
                    .await
                {
                    tracing::debug!(error = %e, "message text state not published");
                }
            }
            Command::RestorePhoneNumber(value) => {
                self.inputs.lock().await.phone_number = value;
            }
            Command::RestoreMessageText(value) => {
                self.inputs.lock().await.message_text = value;
            }
        }
    }

    async fn send_inputs(&self) {
        let (numbers, text) = {
            let inputs = self.inputs.lock().await;
            (inputs.phone_number.clone(), inputs.message_text.clone())
        };

        if numbers.trim().is_empty() || text.trim().is_empty() {
            tracing::warn!("send button pressed with empty fields");
            if let Err(e) = self
                .notifier
                .publish_send_status(&SendStatus::missing_fields())
                .await
            {
                tracing::debug!(error = %e, "missing fields status not published");
            }
            return;
        }

        let _ = self.sender.send(send_request(&numbers, &text, None)).await;

        *self.inputs.lock().await = TextInputs::default();
        if let Err(e) = self.notifier.publish_inputs("", "").await {
            tracing::debug!(error = %e, "cleared inputs not published");
        }
    }
}

/// Spawn the task that executes inbound commands one at a time.
pub fn spawn_command_task(
    handler: Arc<CommandHandler>,
    mut inbound: mpsc::Receiver<Inbound>,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                message = inbound.recv() => match message {
                    Some(message) => handler.dispatch(&message).await,
                    None => break,
                },
                _ = shutdown.changed() => break,
            }
        }
        tracing::debug!("Command task stopped");
    })
}
