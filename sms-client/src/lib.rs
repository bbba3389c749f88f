//! # sms-client
//!
//! Remote gateway client for the Keenetic SMS gateway.
//!
//! The gateway talks to the router's cellular modem through the
//! [`RemoteGateway`] trait. Two implementations ship here:
//!
//! - [`KeeneticClient`]: the router's RCI HTTP API with NDMS
//!   challenge/response login
//! - [`MockGateway`]: an in-memory modem for tests
//!
//! ## Example
//!
//! ```ignore
//! use sms_client::{KeeneticClient, KeeneticConfig, RemoteGateway};
//!
//! let client = KeeneticClient::new(KeeneticConfig::new("192.168.1.1", "admin", "secret"))?;
//! for msg in client.list_messages().await? {
//!     println!("{}: {}", msg.sender, msg.text);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod gateway;

pub use error::GatewayError;
pub use gateway::{KeeneticClient, KeeneticConfig, MockGateway, RemoteGateway, SentSms};
