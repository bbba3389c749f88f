//! Health check endpoint.

use crate::server::SmsGateway;
use axum::{Extension, Json};
use serde::Serialize;
use sms_core::ConnectivityReport;
use std::sync::Arc;
use std::time::Instant;

/// Global start time for uptime calculation.
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call once at startup).
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall status: `ok`, or `degraded` after a lost store write.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Whether the broker link is up. `false` when MQTT is disabled.
    pub mqtt_connected: bool,
    /// Whether a store write has failed since startup.
    pub durability_degraded: bool,
    /// Router reachability.
    pub router: ConnectivityReport,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health check handler.
pub async fn health_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> Json<HealthStatus> {
    let uptime = START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0);
    let degraded = gateway.metrics().is_durability_degraded();

    Json(HealthStatus {
        status: if degraded { "degraded" } else { "ok" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mqtt_connected: gateway.notifier().is_connected(),
        durability_degraded: degraded,
        router: gateway.session().connectivity(),
        uptime_seconds: uptime,
    })
}
