//! Router abstraction.
//!
//! Every operation is a single remote call with no retry loop of its own.
//! Callers serialize access (the router keeps one session) and apply their
//! own timeouts.

mod keenetic;
mod mock;

pub use keenetic::{login_digest, KeeneticClient, KeeneticConfig};
pub use mock::{MockGateway, SentSms};

use crate::error::GatewayError;
use async_trait::async_trait;
use sms_types::{Encoding, Message, MessageId, ModemInfo, NetworkInfo, SignalInfo, SimInfo};

/// Operations the gateway needs from the router's modem.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// List every SMS currently stored on the modem.
    async fn list_messages(&self) -> Result<Vec<Message>, GatewayError>;

    /// Delete one stored SMS.
    async fn delete_message(&self, id: &MessageId) -> Result<(), GatewayError>;

    /// Delete every stored SMS, returning how many were removed.
    async fn delete_all(&self) -> Result<usize, GatewayError>;

    /// Send one SMS to one number.
    async fn send_message(
        &self,
        number: &str,
        text: &str,
        encoding: Encoding,
    ) -> Result<(), GatewayError>;

    /// Current signal quality.
    async fn signal(&self) -> Result<SignalInfo, GatewayError>;

    /// Current network registration.
    async fn network(&self) -> Result<NetworkInfo, GatewayError>;

    /// Modem hardware details.
    async fn modem_info(&self) -> Result<ModemInfo, GatewayError>;

    /// SIM details.
    async fn sim_info(&self) -> Result<SimInfo, GatewayError>;

    /// Check that the modem interface responds.
    async fn check_connection(&self) -> Result<(), GatewayError>;
}
