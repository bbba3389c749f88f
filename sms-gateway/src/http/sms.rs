//! Message and ledger endpoints.

use super::{ApiError, StatusMessage};
use crate::publisher::{send_request, CounterState};
use crate::server::SmsGateway;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use sms_types::{Encoding, Message, RecipientOutcome};
use std::sync::Arc;

/// `POST /sms` body. `message` and `target` are accepted as aliases.
#[derive(Debug, Default, Deserialize)]
pub struct SendBody {
    text: Option<String>,
    message: Option<String>,
    number: Option<String>,
    target: Option<String>,
    unicode: Option<bool>,
}

impl SendBody {
    fn text(&self) -> Option<&str> {
        first_filled(&self.text, &self.message)
    }

    fn numbers(&self) -> Option<&str> {
        first_filled(&self.number, &self.target)
    }
}

fn first_filled<'a>(a: &'a Option<String>, b: &'a Option<String>) -> Option<&'a str> {
    [a, b]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|s| !s.trim().is_empty())
}

/// `POST /sms` reply.
#[derive(Debug, Serialize)]
pub struct SendReply {
    status: u16,
    message: String,
    encoding: Encoding,
    sent: usize,
    failed: usize,
    outcomes: Vec<RecipientOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ledger_error: Option<String>,
}

/// Find a listed message by modem id, or by position in the listing.
fn find<'a>(messages: &'a [Message], id: &str) -> Option<&'a Message> {
    messages
        .iter()
        .find(|m| m.id.as_str() == id)
        .or_else(|| id.parse::<usize>().ok().and_then(|i| messages.get(i)))
}

fn not_found(id: &str) -> ApiError {
    ApiError::not_found(format!("SMS with id '{id}' not found"))
}

/// Every message currently on the modem.
pub async fn list_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(gateway.session().list_messages().await?))
}

/// One message, by id or index.
pub async fn get_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let messages = gateway.session().list_messages().await?;
    let message = find(&messages, &id).ok_or_else(|| not_found(&id))?;
    Ok(Json(message.clone()))
}

/// Delete one message, by id or index.
pub async fn delete_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let messages = gateway.session().list_messages().await?;
    let message = find(&messages, &id).ok_or_else(|| not_found(&id))?;
    gateway.session().delete_message(&message.id).await?;
    tracing::info!(id = %message.id, "SMS deleted over REST");
    Ok(StatusCode::NO_CONTENT)
}

/// Take the oldest message off the modem.
///
/// The message is recorded before it is deleted, and announced on the
/// broker unless the sync loop already did. Nothing is deleted when the
/// record fails.
pub async fn pop_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> Result<Response, ApiError> {
    let messages = gateway.session().list_messages().await?;
    // Router timestamps are zero-padded `YYYY-MM-DD HH:MM:SS`, so they sort
    // lexically.
    let Some(oldest) = messages
        .into_iter()
        .min_by(|a, b| a.timestamp.cmp(&b.timestamp))
    else {
        let empty = serde_json::json!({"Date": "", "Number": "", "State": "", "Text": ""});
        return Ok(Json(empty).into_response());
    };

    let fresh = match gateway.store().record_processed(&oldest.fingerprint()).await {
        Ok(fresh) => fresh,
        Err(e) => {
            gateway.metrics().mark_durability_degraded();
            tracing::error!(id = %oldest.id, error = %e, "could not record SMS, leaving it on the modem");
            return Err(e.into());
        }
    };

    gateway.session().delete_message(&oldest.id).await?;

    if fresh && !oldest.text.is_empty() {
        if let Err(e) = gateway.notifier().publish_message(&oldest).await {
            tracing::debug!(error = %e, "popped SMS not published");
        }
    }

    Ok(Json(oldest).into_response())
}

/// Wipe the modem.
pub async fn delete_all_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> Result<Json<StatusMessage>, ApiError> {
    let count = gateway.sender().delete_all().await?;
    Ok(Json(StatusMessage::ok(format!("Deleted {count} SMS messages"))))
}

/// Send to one or more comma-separated numbers.
///
/// 200 when at least one recipient got the message, with per-recipient
/// outcomes; 503 when none did.
pub async fn send_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
    body: Option<Json<SendBody>>,
) -> Result<(StatusCode, Json<SendReply>), ApiError> {
    let Json(body) = body.unwrap_or_default();
    let text = body
        .text()
        .ok_or_else(|| ApiError::bad_request("Missing required field: text or message"))?;
    let numbers = body
        .numbers()
        .ok_or_else(|| ApiError::bad_request("Missing required field: number or target"))?;

    let result = gateway
        .sender()
        .send(send_request(numbers, text, body.unicode))
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let sent = result.succeeded();
    let status = if sent > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let message = if sent > 0 {
        format!("Sent to {sent} recipients")
    } else {
        "Connection to router failed: no recipient reached".to_string()
    };

    Ok((
        status,
        Json(SendReply {
            status: status.as_u16(),
            message,
            encoding: result.encoding,
            sent,
            failed: result.failed(),
            outcomes: result.outcomes,
            ledger_error: result.ledger_error,
        }),
    ))
}

/// Persisted ledger.
pub async fn counters_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> Result<Json<CounterState>, ApiError> {
    Ok(Json(gateway.sender().counters().await?.into()))
}

/// Zero the ledger.
pub async fn reset_counters_handler(
    Extension(gateway): Extension<Arc<SmsGateway>>,
) -> Result<Json<CounterState>, ApiError> {
    Ok(Json(gateway.sender().reset_counters().await?.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::build_router;
    use crate::publisher::{DiscoveryOptions, MemoryLink, Notifier, Topics};
    use crate::storage::faulty::FaultyStore;
    use crate::storage::{SqliteStore, StateStore};
    use axum::body::Body;
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
    use axum::http::Request;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use sms_client::MockGateway;
    use sms_types::{MessageId, SmsState};
    use tower::util::ServiceExt;

    struct Harness {
        gateway: Arc<SmsGateway>,
        mock: MockGateway,
        link: Arc<MemoryLink>,
    }

    async fn harness() -> Harness {
        harness_with(Arc::new(SqliteStore::in_memory().await.unwrap()))
    }

    fn harness_with(store: Arc<dyn StateStore>) -> Harness {
        let mock = MockGateway::new();
        let link = Arc::new(MemoryLink::new());
        let gateway = Arc::new(SmsGateway::new(
            Config::default(),
            store,
            Arc::new(mock.clone()),
            Arc::new(Notifier::new(
                link.clone(),
                Topics::new("gw", "ha"),
                DiscoveryOptions::default(),
            )),
        ));
        Harness {
            gateway,
            mock,
            link,
        }
    }

    fn message(id: &str, timestamp: &str, text: &str) -> Message {
        Message {
            id: MessageId::new(id),
            sender: "+420123456789".into(),
            timestamp: timestamp.into(),
            text: text.into(),
            state: SmsState::Unread,
        }
    }

    fn request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let auth = format!("Basic {}", STANDARD.encode("admin:password"));
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, auth);
        match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn call(h: &Harness, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = build_router(h.gateway.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn wrong_password_is_challenged() {
        let h = harness().await;
        let auth = format!("Basic {}", STANDARD.encode("admin:nope"));
        let response = build_router(h.gateway.clone())
            .oneshot(
                Request::builder()
                    .uri("/sms")
                    .header(AUTHORIZATION, auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn lists_messages() {
        let h = harness().await;
        h.mock.deliver(message("nv-1", "2025-01-19 14:30:00", "hi"));

        let (status, json) = call(&h, request("GET", "/sms", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["Id"], "nv-1");
        assert_eq!(json[0]["Text"], "hi");
    }

    #[tokio::test]
    async fn finds_message_by_id_or_index() {
        let h = harness().await;
        h.mock.deliver(message("nv-1", "2025-01-19 14:30:00", "first"));
        h.mock.deliver(message("nv-7", "2025-01-19 14:31:00", "second"));

        let (status, json) = call(&h, request("GET", "/sms/nv-7", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["Text"], "second");

        let (status, json) = call(&h, request("GET", "/sms/0", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["Text"], "first");

        let (status, json) = call(&h, request("GET", "/sms/5", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "SMS with id '5' not found");
    }

    #[tokio::test]
    async fn deletes_single_message() {
        let h = harness().await;
        h.mock.deliver(message("nv-3", "2025-01-19 14:30:00", "bye"));

        let (status, _) = call(&h, request("DELETE", "/sms/nv-3", None)).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(h.mock.deleted(), vec![MessageId::new("nv-3")]);
    }

    #[tokio::test]
    async fn pop_takes_oldest_and_announces_once() {
        let h = harness().await;
        h.mock.deliver(message("nv-2", "2025-01-19 15:00:00", "newer"));
        h.mock.deliver(message("nv-1", "2025-01-19 14:00:00", "older"));

        let (status, json) = call(&h, request("GET", "/sms/getsms", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["Text"], "older");
        assert_eq!(h.mock.deleted(), vec![MessageId::new("nv-1")]);
        assert_eq!(h.link.published_to("gw/sms/state").len(), 1);

        // Same message seen again: returned, not re-announced
        h.mock.deliver(message("nv-1", "2025-01-19 14:00:00", "older"));
        h.mock.deliver(message("nv-0", "2025-01-19 13:00:00", "older"));
        let _ = call(&h, request("GET", "/sms/getsms", None)).await;
        let _ = call(&h, request("GET", "/sms/getsms", None)).await;
        assert_eq!(h.link.published_to("gw/sms/state").len(), 2);
    }

    #[tokio::test]
    async fn pop_leaves_message_on_modem_when_record_fails() {
        let store = Arc::new(FaultyStore::new().await);
        store.fail_record(true);
        let h = harness_with(store.clone());
        h.mock.deliver(message("nv-1", "2025-01-19 14:00:00", "keep me"));

        let (status, _) = call(&h, request("GET", "/sms/getsms", None)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(h.mock.deleted().is_empty());
        assert_eq!(h.mock.inbox().len(), 1);
        assert!(h.link.published_to("gw/sms/state").is_empty());
        assert!(h.gateway.metrics().is_durability_degraded());

        // Store recovers: the same message is recorded, deleted and announced
        store.fail_record(false);
        let (status, json) = call(&h, request("GET", "/sms/getsms", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["Text"], "keep me");
        assert_eq!(h.mock.deleted(), vec![MessageId::new("nv-1")]);
        assert_eq!(h.link.published_to("gw/sms/state").len(), 1);
    }

    #[tokio::test]
    async fn pop_on_empty_modem_returns_blank_message() {
        let h = harness().await;

        let (status, json) = call(&h, request("GET", "/sms/getsms", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["Text"], "");
        assert!(h.mock.deleted().is_empty());
    }

    #[tokio::test]
    async fn delete_all_reports_count() {
        let h = harness().await;
        h.mock.deliver(message("nv-1", "2025-01-19 14:00:00", "a"));
        h.mock.deliver(message("nv-2", "2025-01-19 14:01:00", "b"));

        let (status, json) = call(&h, request("DELETE", "/sms/deleteall", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Deleted 2 SMS messages");
        assert!(h.mock.inbox().is_empty());
    }

    #[tokio::test]
    async fn send_accepts_aliases() {
        let h = harness().await;
        let body = serde_json::json!({"message": "Hello", "target": "+1, +2"});

        let (status, json) = call(&h, request("POST", "/sms", Some(body))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Sent to 2 recipients");
        assert_eq!(json["encoding"], "gsm7");
        assert_eq!(h.mock.sent().len(), 2);
    }

    #[tokio::test]
    async fn send_reports_ledger_failure() {
        let store = Arc::new(FaultyStore::new().await);
        store.fail_increment(true);
        let h = harness_with(store);
        let body = serde_json::json!({"text": "Hello", "number": "+1"});

        let (status, json) = call(&h, request("POST", "/sms", Some(body))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sent"], 1);
        assert!(json["ledger_error"].is_string());

        let (_, counters) = call(&h, request("GET", "/counters", None)).await;
        assert_eq!(counters["count"], 1);
    }

    #[tokio::test]
    async fn send_requires_text_and_number() {
        let h = harness().await;

        let body = serde_json::json!({"number": "+1"});
        let (status, json) = call(&h, request("POST", "/sms", Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Missing required field: text or message");

        let body = serde_json::json!({"text": "hi", "number": " "});
        let (status, json) = call(&h, request("POST", "/sms", Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Missing required field: number or target");
        assert!(h.mock.sent().is_empty());
    }

    #[tokio::test]
    async fn send_rejects_long_text() {
        let h = harness().await;
        let body = serde_json::json!({"text": "a".repeat(256), "number": "+1"});

        let (status, _) = call(&h, request("POST", "/sms", Some(body))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(h.mock.sent().is_empty());
    }

    #[tokio::test]
    async fn partial_send_is_ok_with_outcomes() {
        let h = harness().await;
        h.mock.fail_sends_to("+2");
        let body = serde_json::json!({"text": "hi", "number": "+1,+2"});

        let (status, json) = call(&h, request("POST", "/sms", Some(body))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sent"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["outcomes"][1]["ok"], false);
    }

    #[tokio::test]
    async fn send_with_no_recipient_reached_is_unavailable() {
        let h = harness().await;
        h.mock.fail_sends_to("+1");
        let body = serde_json::json!({"text": "hi", "number": "+1"});

        let (status, json) = call(&h, request("POST", "/sms", Some(body))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["sent"], 0);
    }

    #[tokio::test]
    async fn counters_read_and_reset() {
        let h = harness().await;
        let body = serde_json::json!({"text": "hi", "number": "+1,+2,+3"});
        call(&h, request("POST", "/sms", Some(body))).await;

        let (status, json) = call(&h, request("GET", "/counters", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 3);

        let (status, json) = call(&h, request("POST", "/counters/reset", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 0);
    }
}
