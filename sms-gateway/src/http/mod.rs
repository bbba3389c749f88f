//! HTTP endpoints for sms-gateway.
//!
//! Health, metrics and modem status are public. Everything that reads or
//! changes messages or the ledger sits behind HTTP Basic auth.

mod auth;
pub mod health;
mod metrics;
mod sms;
mod status;

use crate::server::SmsGateway;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{middleware, Extension, Json, Router};
use serde::Serialize;
use sms_client::GatewayError;
use std::sync::Arc;

pub use health::{init_start_time, HealthStatus};

/// Build the HTTP router with all endpoints.
pub fn build_router(gateway: Arc<SmsGateway>) -> Router {
    let protected = Router::new()
        .route("/sms", get(sms::list_handler).post(sms::send_handler))
        .route("/sms/getsms", get(sms::pop_handler))
        .route("/sms/deleteall", delete(sms::delete_all_handler))
        .route(
            "/sms/:id",
            get(sms::get_handler).delete(sms::delete_handler),
        )
        .route("/counters", get(sms::counters_handler))
        .route("/counters/reset", post(sms::reset_counters_handler))
        .route_layer(middleware::from_fn(auth::require_basic_auth));

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/status/signal", get(status::signal_handler))
        .route("/status/network", get(status::network_handler))
        .route("/status/modem", get(status::modem_handler))
        .route("/status/sim", get(status::sim_handler))
        .route("/status/sms_capacity", get(status::capacity_handler))
        .route("/status/connectivity", get(status::connectivity_handler))
        .route("/status/reset", get(status::reset_handler))
        .merge(protected)
        .layer(Extension(gateway))
}

/// `{"status": .., "message": ..}` body used for replies without data.
#[derive(Debug, Clone, Serialize)]
pub struct StatusMessage {
    /// HTTP status code, repeated in the body.
    pub status: u16,
    /// Human readable outcome.
    pub message: String,
}

impl StatusMessage {
    /// 200 with `message`.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: message.into(),
        }
    }
}

/// Error reply for REST handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Reply with `status` and `message`.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        if e.is_not_found() {
            return Self::not_found(e.to_string());
        }
        if e.is_unreachable() {
            return Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Connection to router failed: {e}"),
            );
        }
        Self::internal(e.to_string())
    }
}

impl From<crate::error::StoreError> for ApiError {
    fn from(e: crate::error::StoreError) -> Self {
        Self::internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = StatusMessage {
            status: self.status.as_u16(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::publisher::{Notifier, Topics};
    use crate::storage::SqliteStore;
    use axum::body::Body;
    use axum::http::Request;
    use sms_client::MockGateway;
    use tower::util::ServiceExt;

    async fn test_gateway() -> Arc<SmsGateway> {
        let store = SqliteStore::in_memory().await.unwrap();
        Arc::new(SmsGateway::new(
            Config::default(),
            Arc::new(store),
            Arc::new(MockGateway::new()),
            Arc::new(Notifier::disabled(Topics::new("gw", "ha"))),
        ))
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = build_router(test_gateway().await);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_ok() {
        let app = build_router(test_gateway().await);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_routes_are_public() {
        let gateway = test_gateway().await;

        for uri in [
            "/status/signal",
            "/status/network",
            "/status/modem",
            "/status/sim",
            "/status/sms_capacity",
            "/status/connectivity",
            "/status/reset",
        ] {
            let response = build_router(gateway.clone())
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn sms_routes_require_auth() {
        let gateway = test_gateway().await;

        for (method, uri) in [
            ("GET", "/sms"),
            ("POST", "/sms"),
            ("GET", "/sms/getsms"),
            ("DELETE", "/sms/deleteall"),
            ("GET", "/sms/0"),
            ("GET", "/counters"),
            ("POST", "/counters/reset"),
        ] {
            let response = build_router(gateway.clone())
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[test]
    fn gateway_errors_map_to_status() {
        let e = ApiError::from(GatewayError::Timeout);
        assert_eq!(e.status, StatusCode::SERVICE_UNAVAILABLE);

        let e = ApiError::from(GatewayError::Api {
            status: 404,
            message: "no such message".into(),
        });
        assert_eq!(e.status, StatusCode::NOT_FOUND);
    }
}
