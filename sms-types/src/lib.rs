//! # sms-types
//!
//! Shared data types for the Keenetic SMS gateway.
//!
//! This crate provides the types used across all gateway crates:
//! - [`MessageId`], [`Fingerprint`] - Remote identity and dedup keys
//! - [`Message`] - An SMS as listed by the modem
//! - [`ModemStatus`] - Last-known-good device snapshot
//! - [`SendRequest`], [`SendResult`], [`Encoding`] - Outbound sends
//! - [`Counters`], [`Cost`] - The sent-count / cost ledger
//! - [`ValidationError`] - Request validation failures

#![warn(missing_docs)]
#![warn(clippy::all)]

mod counters;
mod error;
mod ids;
mod message;
mod send;
mod status;

pub use counters::{Cost, Counters};
pub use error::ValidationError;
pub use ids::{Fingerprint, MessageId};
pub use message::{Message, SmsState};
pub use send::{
    split_recipients, Encoding, RecipientOutcome, SendRequest, SendResult, MAX_TEXT_CHARS,
};
pub use status::{
    ModemInfo, ModemStatus, NetworkInfo, SignalInfo, SimInfo, SmsCapacity,
};
