//! # sms-core
//!
//! Pure logic for the Keenetic SMS gateway (no I/O, instant tests).
//!
//! This crate implements the state machines and rules of the gateway
//! without any network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`pass`]: one reconciliation pass, `Idle -> Listing -> Classifying ->
//!   Cleaning -> Publishing -> Idle`
//! - [`link`]: broker connection lifecycle with capped exponential backoff
//! - [`connectivity`]: online/offline judgement from remote call outcomes
//! - [`encoding`]: GSM 7-bit alphabet detection
//! - [`validate`]: send request validation and normalization
//! - [`signal`]: RSSI to percentage mapping
//!
//! The actual I/O (router calls, SQLite, MQTT) is performed by `sms-gateway`,
//! which interprets the actions produced by these state machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connectivity;
pub mod encoding;
pub mod link;
pub mod pass;
pub mod signal;
pub mod validate;

pub use connectivity::{Connectivity, ConnectivityReport, DeviceConnectivity};
pub use encoding::{detect_encoding, is_gsm7_char};
pub use link::{Backoff, LinkAction, LinkEvent, LinkState};
pub use pass::{PassAction, PassEvent, PassState};
pub use signal::rssi_to_percent;
pub use validate::{validate, ValidatedSend};
