//! Modem status endpoints.
//!
//! Each call goes live to the router through the shared session.

use super::{ApiError, StatusMessage};
use crate::server::SmsGateway;
use axum::{Extension, Json};
use sms_core::ConnectivityReport;
use sms_types::{ModemInfo, NetworkInfo, SignalInfo, SimInfo, SmsCapacity};
use std::sync::Arc;

/// Current signal quality.
pub async fn signal_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> Result<Json<SignalInfo>, ApiError> {
    Ok(Json(gateway.session().signal().await?))
}

/// Current network registration.
pub async fn network_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> Result<Json<NetworkInfo>, ApiError> {
    Ok(Json(gateway.session().network().await?))
}

/// Modem identity.
pub async fn modem_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> Result<Json<ModemInfo>, ApiError> {
    Ok(Json(gateway.session().modem_info().await?))
}

/// SIM identity.
pub async fn sim_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> Result<Json<SimInfo>, ApiError> {
    Ok(Json(gateway.session().sim_info().await?))
}

/// Messages currently stored on the modem.
pub async fn capacity_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> Result<Json<SmsCapacity>, ApiError> {
    let stored = gateway.session().list_messages().await?.len();
    Ok(Json(SmsCapacity::used(
        u32::try_from(stored).unwrap_or(u32::MAX),
    )))
}

/// Router reachability as judged from recent calls.
pub async fn connectivity_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> Json<ConnectivityReport> {
    Json(gateway.session().connectivity())
}

/// Probe the router session.
pub async fn reset_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> Json<StatusMessage> {
    let active = match gateway.session().check_connection().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "router connection check failed");
            false
        }
    };
    Json(StatusMessage::ok(format!("Connection active: {active}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::publisher::{Notifier, Topics};
    use crate::storage::SqliteStore;
    use sms_client::{GatewayError, MockGateway};
    use sms_types::{Message, MessageId, SmsState};

    async fn gateway(mock: &MockGateway) -> Arc<SmsGateway> {
        let store = SqliteStore::in_memory().await.unwrap();
        Arc::new(SmsGateway::new(
            Config::default(),
            Arc::new(store),
            Arc::new(mock.clone()),
            Arc::new(Notifier::disabled(Topics::new("gw", "ha"))),
        ))
    }

    #[tokio::test]
    async fn capacity_counts_stored_messages() {
        let mock = MockGateway::new();
        for id in ["nv-1", "nv-2"] {
            mock.deliver(Message {
                id: MessageId::new(id),
                sender: "+1".into(),
                timestamp: "2025-01-19 14:30:00".into(),
                text: "hi".into(),
                state: SmsState::Read,
            });
        }
        let gateway = gateway(&mock).await;

        let Json(capacity) = capacity_handler(Extension(gateway)).await.unwrap();
        assert_eq!(capacity.sim_used, 2);
    }

    #[tokio::test]
    async fn reset_reports_failed_check() {
        let mock = MockGateway::new();
        mock.fail_next_status(GatewayError::Timeout);
        let gateway = gateway(&mock).await;

        let Json(reply) = reset_handler(Extension(gateway.clone())).await;
        assert_eq!(reply.message, "Connection active: false");

        let Json(reply) = reset_handler(Extension(gateway)).await;
        assert_eq!(reply.message, "Connection active: true");
    }
}
