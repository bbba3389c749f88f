//! Prometheus metrics endpoint.

use crate::server::SmsGateway;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use sms_core::Connectivity;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Gauges reflect current state; counters are monotonic since startup.
pub async fn metrics_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> impl IntoResponse {
    let m = gateway.metrics();

    // Gauges
    let mqtt_connected = u8::from(gateway.notifier().is_connected());
    let router_online = u8::from(gateway.session().connectivity().status == Connectivity::Online);
    let degraded = u8::from(m.is_durability_degraded());
    let signal_percent = gateway.status().await.signal.percent;

    // Counters
    let passes = m.passes_total.load(Ordering::Relaxed);
    let aborted = m.passes_aborted_total.load(Ordering::Relaxed);
    let skipped = m.passes_skipped_total.load(Ordering::Relaxed);
    let new_messages = m.messages_new_total.load(Ordering::Relaxed);
    let deleted = m.messages_deleted_total.load(Ordering::Relaxed);
    let publish_failures = m.publish_failures_total.load(Ordering::Relaxed);
    let sent = m.sms_sent_total.load(Ordering::Relaxed);
    let failed = m.sms_failed_total.load(Ordering::Relaxed);
    let rejected = m.sends_rejected_total.load(Ordering::Relaxed);

    // Ledger (best effort)
    let (ledger_count, ledger_cost) = match gateway.store().counters().await {
        Ok(c) => (c.sent_count, c.total_cost.as_decimal()),
        Err(_) => (0, 0.0),
    };
    let processed = gateway.store().processed_count().await.unwrap_or(0);

    let body = format!(
        r#"# HELP sms_gateway_info Gateway information
# TYPE sms_gateway_info gauge
sms_gateway_info{{version="{version}"}} 1

# HELP sms_gateway_mqtt_connected Whether the broker link is up
# TYPE sms_gateway_mqtt_connected gauge
sms_gateway_mqtt_connected {mqtt_connected}

# HELP sms_gateway_router_online Whether the router is considered reachable
# TYPE sms_gateway_router_online gauge
sms_gateway_router_online {router_online}

# HELP sms_gateway_durability_degraded Whether a store write has failed since startup
# TYPE sms_gateway_durability_degraded gauge
sms_gateway_durability_degraded {degraded}

# HELP sms_gateway_signal_percent Last known signal quality
# TYPE sms_gateway_signal_percent gauge
sms_gateway_signal_percent {signal_percent}

# HELP sms_gateway_passes_total Sync passes completed
# TYPE sms_gateway_passes_total counter
sms_gateway_passes_total {passes}

# HELP sms_gateway_passes_aborted_total Sync passes aborted on listing failure
# TYPE sms_gateway_passes_aborted_total counter
sms_gateway_passes_aborted_total {aborted}

# HELP sms_gateway_passes_skipped_total Ticks skipped while a pass was running
# TYPE sms_gateway_passes_skipped_total counter
sms_gateway_passes_skipped_total {skipped}

# HELP sms_gateway_messages_new_total Messages recorded for the first time
# TYPE sms_gateway_messages_new_total counter
sms_gateway_messages_new_total {new_messages}

# HELP sms_gateway_messages_deleted_total Messages auto-deleted from the modem
# TYPE sms_gateway_messages_deleted_total counter
sms_gateway_messages_deleted_total {deleted}

# HELP sms_gateway_publish_failures_total Broker publishes that failed
# TYPE sms_gateway_publish_failures_total counter
sms_gateway_publish_failures_total {publish_failures}

# HELP sms_gateway_sms_sent_total SMS handed to the modem
# TYPE sms_gateway_sms_sent_total counter
sms_gateway_sms_sent_total {sent}

# HELP sms_gateway_sms_failed_total Recipients that could not be sent to
# TYPE sms_gateway_sms_failed_total counter
sms_gateway_sms_failed_total {failed}

# HELP sms_gateway_sends_rejected_total Send requests rejected by validation
# TYPE sms_gateway_sends_rejected_total counter
sms_gateway_sends_rejected_total {rejected}

# HELP sms_gateway_ledger_sent Persisted sent count
# TYPE sms_gateway_ledger_sent gauge
sms_gateway_ledger_sent {ledger_count}

# HELP sms_gateway_ledger_cost Persisted total cost
# TYPE sms_gateway_ledger_cost gauge
sms_gateway_ledger_cost {ledger_cost}

# HELP sms_gateway_processed_messages Fingerprints in the processed set
# TYPE sms_gateway_processed_messages gauge
sms_gateway_processed_messages {processed}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
