//! # sms-gateway
//!
//! SMS gateway service for Keenetic routers.
//!
//! This crate keeps a durable local view of the SMS stored on a router's
//! cellular modem and exposes it two ways:
//! - Polls the modem on a fixed interval and announces each message once
//! - Optionally deletes announced messages from the modem
//! - Sends SMS and keeps a persisted sent-count and cost ledger
//! - Serves a REST API and publishes to MQTT with Home Assistant discovery
//!
//! ## Architecture
//!
//! ```text
//!   Keenetic router (RCI)
//!            │
//!   ┌────────┴─────────┐
//!   │  RemoteSession   │  one call at a time
//!   └──┬────────────┬──┘
//!      │            │
//! ┌────┴─────┐ ┌────┴────────────┐      ┌──────────────┐
//! │SyncEngine│ │ SendCoordinator │◄─────┤ REST / MQTT  │
//! └────┬─────┘ └────┬────────────┘      │  commands    │
//!      │            │                   └──────────────┘
//!   ┌──┴────────────┴──┐   ┌──────────┐
//!   │   StateStore     │   │ Notifier │──► MQTT broker
//!   │ (SQLite ledger)  │   └──────────┘
//!   └──────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod publisher;
pub mod sender;
pub mod server;
pub mod session;
pub mod storage;
