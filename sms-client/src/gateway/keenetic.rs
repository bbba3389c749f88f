//! Keenetic RCI client.
//!
//! Login is NDMS challenge/response: `GET /auth` answers 401 with
//! `X-NDM-Challenge` and `X-NDM-Realm`, and `POST /auth` expects
//! `sha256(challenge + md5(login:realm:password))`. The session cookie is kept
//! by the HTTP client. Commands are JSON arrays posted to `/rci/`; interface
//! status comes from `GET /rci/show/interface/<name>`.

use super::RemoteGateway;
use crate::error::GatewayError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use sms_core::rssi_to_percent;
use sms_types::{
    Encoding, Message, MessageId, ModemInfo, NetworkInfo, SignalInfo, SimInfo, SmsState,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default modem interface name.
pub const DEFAULT_INTERFACE: &str = "UsbLte0";

/// Default per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const UNKNOWN: &str = "Unknown";

/// Connection settings for a Keenetic router.
#[derive(Clone)]
pub struct KeeneticConfig {
    /// Router host, optionally with port or scheme.
    pub host: String,
    /// Admin login.
    pub username: String,
    /// Admin password.
    pub password: String,
    /// Modem interface name.
    pub interface: String,
    /// Use HTTPS when `host` has no scheme.
    pub use_https: bool,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl KeeneticConfig {
    /// Settings with the default interface and timeout.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            interface: DEFAULT_INTERFACE.to_string(),
            use_https: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Base URL of the router.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else if self.use_https {
            format!("https://{host}")
        } else {
            format!("http://{host}")
        }
    }
}

impl fmt::Debug for KeeneticConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeeneticConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("interface", &self.interface)
            .field("use_https", &self.use_https)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// NDMS login digest: `sha256(challenge + md5(login:realm:password))`, hex.
pub fn login_digest(login: &str, realm: &str, password: &str, challenge: &str) -> String {
    let inner = hex::encode(md5::Md5::digest(
        format!("{login}:{realm}:{password}").as_bytes(),
    ));
    hex::encode(Sha256::digest(format!("{challenge}{inner}").as_bytes()))
}

enum Rci {
    Show(String),
    Command(Value),
}

/// Client for the Keenetic RCI API.
pub struct KeeneticClient {
    config: KeeneticConfig,
    base_url: String,
    http: reqwest::Client,
    authenticated: AtomicBool,
}

impl KeeneticClient {
    /// Create a client. No request is made until the first call.
    pub fn new(config: KeeneticConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Connection(e.to_string()))?;
        let base_url = config.base_url();
        Ok(Self {
            config,
            base_url,
            http,
            authenticated: AtomicBool::new(false),
        })
    }

    /// Modem interface this client addresses.
    pub fn interface(&self) -> &str {
        &self.config.interface
    }

    /// Run the challenge/response login.
    pub async fn authenticate(&self) -> Result<(), GatewayError> {
        let url = format!("{}/auth", self.base_url);
        let response = self.http.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => {
                debug!("router session still valid");
                self.authenticated.store(true, Ordering::SeqCst);
                return Ok(());
            }
            StatusCode::UNAUTHORIZED => {}
            status => {
                return Err(GatewayError::Api {
                    status: status.as_u16(),
                    message: "unexpected status from /auth".into(),
                })
            }
        }

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let challenge = header("X-NDM-Challenge")
            .ok_or_else(|| GatewayError::Auth("missing X-NDM-Challenge header".into()))?;
        let realm = header("X-NDM-Realm")
            .ok_or_else(|| GatewayError::Auth("missing X-NDM-Realm header".into()))?;

        let password = login_digest(
            &self.config.username,
            &realm,
            &self.config.password,
            &challenge,
        );
        let response = self
            .http
            .post(&url)
            .json(&json!({ "login": self.config.username, "password": password }))
            .send()
            .await?;

        if response.status() == StatusCode::OK {
            info!(host = %self.config.host, "authenticated with router");
            self.authenticated.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            self.authenticated.store(false, Ordering::SeqCst);
            Err(GatewayError::Auth(format!(
                "login rejected with HTTP {}",
                response.status().as_u16()
            )))
        }
    }

    async fn ensure_authenticated(&self) -> Result<(), GatewayError> {
        if self.authenticated.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.authenticate().await
    }

    /// Perform one RCI request, re-authenticating once if the session expired.
    async fn call(&self, request: &Rci) -> Result<Value, GatewayError> {
        self.ensure_authenticated().await?;

        let mut reauthenticated = false;
        loop {
            let builder = match request {
                Rci::Show(path) => self.http.get(format!("{}/rci/show/{path}", self.base_url)),
                Rci::Command(command) => self
                    .http
                    .post(format!("{}/rci/", self.base_url))
                    .json(&json!([command])),
            };
            let response = builder.send().await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                self.authenticated.store(false, Ordering::SeqCst);
                if reauthenticated {
                    return Err(GatewayError::Auth(
                        "session rejected after re-authentication".into(),
                    ));
                }
                info!("router session expired, re-authenticating");
                self.authenticate().await?;
                reauthenticated = true;
                continue;
            }

            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(GatewayError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            let value: Value = serde_json::from_str(&body)
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
            if let Some(message) = rci_error(&value) {
                return Err(GatewayError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            return Ok(value);
        }
    }

    async fn show_interface(&self) -> Result<Value, GatewayError> {
        self.call(&Rci::Show(format!("interface/{}", self.config.interface)))
            .await
    }

    async fn command(&self, command: Value) -> Result<Value, GatewayError> {
        self.call(&Rci::Command(command)).await
    }
}

#[async_trait]
impl RemoteGateway for KeeneticClient {
    async fn list_messages(&self) -> Result<Vec<Message>, GatewayError> {
        let response = self
            .command(json!({ "sms": { "list": { "interface": self.config.interface } } }))
            .await?;
        parse_messages(&response)
    }

    async fn delete_message(&self, id: &MessageId) -> Result<(), GatewayError> {
        self.command(json!({
            "sms": { "delete": [{ "interface": self.config.interface, "id": id.as_str() }] }
        }))
        .await?;
        debug!(%id, "deleted message from modem");
        Ok(())
    }

    async fn delete_all(&self) -> Result<usize, GatewayError> {
        let messages = self.list_messages().await?;
        if messages.is_empty() {
            return Ok(0);
        }
        let targets: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "interface": self.config.interface, "id": m.id.as_str() }))
            .collect();
        let count = targets.len();
        self.command(json!({ "sms": { "delete": targets } })).await?;
        info!(count, "deleted all messages from modem");
        Ok(count)
    }

    async fn send_message(
        &self,
        number: &str,
        text: &str,
        encoding: Encoding,
    ) -> Result<(), GatewayError> {
        let mut send = json!({
            "interface": self.config.interface,
            "to": number,
            "message": text,
        });
        if encoding == Encoding::Unicode {
            send["unicode"] = Value::Bool(true);
        }
        self.command(json!({ "sms": { "send": send } })).await?;
        Ok(())
    }

    async fn signal(&self) -> Result<SignalInfo, GatewayError> {
        Ok(parse_signal(&self.show_interface().await?))
    }

    async fn network(&self) -> Result<NetworkInfo, GatewayError> {
        Ok(parse_network(&self.show_interface().await?))
    }

    async fn modem_info(&self) -> Result<ModemInfo, GatewayError> {
        Ok(parse_modem(&self.show_interface().await?))
    }

    async fn sim_info(&self) -> Result<SimInfo, GatewayError> {
        Ok(parse_sim(&self.show_interface().await?))
    }

    async fn check_connection(&self) -> Result<(), GatewayError> {
        self.show_interface().await.map(|_| ())
    }
}

/// First RCI `status` entry of kind `error`, anywhere in the response.
fn rci_error(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(statuses)) = map.get("status") {
                let failed = statuses
                    .iter()
                    .find(|s| s.get("status").and_then(Value::as_str) == Some("error"));
                if let Some(failed) = failed {
                    let message = failed
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("command failed");
                    return Some(message.to_string());
                }
            }
            map.values().find_map(rci_error)
        }
        Value::Array(items) => items.iter().find_map(rci_error),
        _ => None,
    }
}

/// String or number field as text.
fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn int_field(value: &Value, key: &str) -> Option<i32> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_or(value: &Value, key: &str, default: &str) -> String {
    text_field(value, key).unwrap_or_else(|| default.to_string())
}

/// Parse an `sms list` response.
///
/// Messages come either as an object keyed by id or as a list of objects
/// carrying their own `id` (or `index`).
pub(crate) fn parse_messages(response: &Value) -> Result<Vec<Message>, GatewayError> {
    let first = match response {
        Value::Array(items) => match items.first() {
            Some(first) => first,
            None => return Ok(Vec::new()),
        },
        Value::Object(_) => response,
        _ => {
            return Err(GatewayError::InvalidResponse(
                "sms list response is not an object".into(),
            ))
        }
    };

    let list = if let Some(list) = first.pointer("/sms/list") {
        list
    } else if first.get("messages").is_some() {
        first
    } else {
        return Err(GatewayError::InvalidResponse(
            "sms list response has no message list".into(),
        ));
    };

    let messages = match list {
        Value::Array(items) => items.iter().filter_map(|m| parse_message(None, m)).collect(),
        Value::Object(_) => match list.get("messages") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(by_id)) => by_id
                .iter()
                .filter_map(|(id, m)| parse_message(Some(id), m))
                .collect(),
            Some(Value::Array(items)) => {
                items.iter().filter_map(|m| parse_message(None, m)).collect()
            }
            Some(other) => {
                return Err(GatewayError::InvalidResponse(format!(
                    "unexpected messages value: {other}"
                )))
            }
        },
        _ => Vec::new(),
    };
    Ok(messages)
}

fn parse_message(id: Option<&str>, body: &Value) -> Option<Message> {
    if !body.is_object() {
        warn!(item = %body, "skipping malformed sms entry");
        return None;
    }
    let id = id
        .map(str::to_string)
        .or_else(|| text_field(body, "id"))
        .or_else(|| text_field(body, "index"));
    let Some(id) = id else {
        warn!("skipping sms entry without id");
        return None;
    };

    let sender = text_field(body, "from")
        .filter(|s| !s.is_empty())
        .or_else(|| text_field(body, "number"))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let state = match body.get("read") {
        Some(Value::Bool(read)) => SmsState::from_read_flag(*read),
        _ => match body.get("status").and_then(Value::as_str) {
            Some(s) if s.eq_ignore_ascii_case("unread") => SmsState::Unread,
            _ => SmsState::Read,
        },
    };

    Some(Message {
        id: MessageId::new(id),
        sender,
        timestamp: text_or(body, "timestamp", ""),
        text: text_or(body, "text", ""),
        state,
    })
}

pub(crate) fn parse_signal(iface: &Value) -> SignalInfo {
    let rssi = int_field(iface, "signal-strength")
        .filter(|r| *r != 0)
        .or_else(|| int_field(iface, "rssi"))
        .unwrap_or(0);
    SignalInfo {
        rssi,
        percent: rssi_to_percent(rssi),
        bit_error_rate: 0,
    }
}

pub(crate) fn parse_network(iface: &Value) -> NetworkInfo {
    NetworkInfo {
        name: text_or(iface, "operator", UNKNOWN),
        state: text_or(iface, "state", UNKNOWN),
        code: format!(
            "{}{}",
            text_or(iface, "mcc", ""),
            text_or(iface, "mnc", "")
        ),
        cell_id: text_or(iface, "cell-id", ""),
        lac: text_or(iface, "lac", ""),
    }
}

pub(crate) fn parse_modem(iface: &Value) -> ModemInfo {
    ModemInfo {
        imei: text_or(iface, "imei", UNKNOWN),
        manufacturer: text_or(iface, "manufacturer", UNKNOWN),
        model: text_or(iface, "model", UNKNOWN),
        firmware: text_or(iface, "firmware", UNKNOWN),
    }
}

pub(crate) fn parse_sim(iface: &Value) -> SimInfo {
    SimInfo {
        imsi: text_or(iface, "imsi", "N/A"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode as AxumStatus;
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    // ===========================================
    // Response Parsing Tests
    // ===========================================

    #[test]
    fn parses_messages_keyed_by_id() {
        let response = json!([{
            "sms": { "list": {
                "nv-slots": 50,
                "messages": {
                    "nv-2": {
                        "timestamp": "2025-01-19 14:30:00",
                        "from": "+420123456789",
                        "text": "Hello",
                        "read": false
                    },
                    "nv-3": {
                        "timestamp": "2025-01-19 14:31:00",
                        "from": "+420987654321",
                        "text": "World",
                        "read": true
                    }
                }
            }}
        }]);

        let mut messages = parse_messages(&response).unwrap();
        messages.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id.as_str(), "nv-2");
        assert_eq!(messages[0].sender, "+420123456789");
        assert_eq!(messages[0].state, SmsState::Unread);
        assert_eq!(messages[1].state, SmsState::Read);
    }

    #[test]
    fn parses_message_list_with_inline_ids() {
        let response = json!([{
            "messages": [
                { "index": 7, "number": "+1", "text": "hi", "status": "unread" },
                { "text": "no id" }
            ]
        }]);
        let messages = parse_messages(&response).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id.as_str(), "7");
        assert_eq!(messages[0].sender, "+1");
        assert_eq!(messages[0].state, SmsState::Unread);
        assert_eq!(messages[0].timestamp, "");
    }

    #[test]
    fn empty_inbox_is_empty_list() {
        assert!(parse_messages(&json!([{ "sms": { "list": {} } }]))
            .unwrap()
            .is_empty());
        assert!(parse_messages(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn unexpected_shape_is_invalid_response() {
        assert!(matches!(
            parse_messages(&json!([{ "show": {} }])),
            Err(GatewayError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_messages(&Value::Null),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn parses_interface_status() {
        let iface = json!({
            "signal-strength": "-75",
            "operator": "T-Mobile CZ",
            "state": "up",
            "mcc": 230,
            "mnc": "01",
            "cell-id": "1A2B",
            "lac": 42,
            "imei": "123456789012345",
            "manufacturer": "Quectel",
            "model": "EC25",
            "imsi": "230011234567890"
        });

        let signal = parse_signal(&iface);
        assert_eq!(signal.rssi, -75);
        assert_eq!(signal.percent, 61);

        let network = parse_network(&iface);
        assert_eq!(network.name, "T-Mobile CZ");
        assert_eq!(network.code, "23001");
        assert_eq!(network.lac, "42");

        let modem = parse_modem(&iface);
        assert_eq!(modem.model, "EC25");
        assert_eq!(modem.firmware, UNKNOWN);

        assert_eq!(parse_sim(&iface).imsi, "230011234567890");
    }

    #[test]
    fn missing_signal_is_zero() {
        let signal = parse_signal(&json!({ "state": "down" }));
        assert_eq!(signal.rssi, 0);
        assert_eq!(signal.percent, 0);
        assert_eq!(parse_sim(&json!({})).imsi, "N/A");
    }

    #[test]
    fn rssi_fallback_field() {
        let signal = parse_signal(&json!({ "signal-strength": 0, "rssi": -51 }));
        assert_eq!(signal.rssi, -51);
        assert_eq!(signal.percent, 100);
    }

    #[test]
    fn finds_nested_rci_error() {
        let response = json!([{ "sms": { "delete": {
            "status": [{ "status": "error", "code": "7405600", "message": "no such message" }]
        }}}]);
        assert_eq!(rci_error(&response).as_deref(), Some("no such message"));

        let ok = json!([{ "sms": { "send": {
            "status": [{ "status": "message", "message": "sent" }]
        }}}]);
        assert_eq!(rci_error(&ok), None);
    }

    #[test]
    fn login_digest_matches_manual_computation() {
        let md5 = hex::encode(md5::Md5::digest(b"admin:Keenetic:secret"));
        let expected = hex::encode(Sha256::digest(format!("CHALLENGE{md5}").as_bytes()));
        assert_eq!(
            login_digest("admin", "Keenetic", "secret", "CHALLENGE"),
            expected
        );
        assert_eq!(expected.len(), 64);
        assert_ne!(
            login_digest("admin", "Keenetic", "secret", "OTHER"),
            expected
        );
    }

    #[test]
    fn base_url_respects_scheme() {
        let mut config = KeeneticConfig::new("192.168.1.1", "admin", "x");
        assert_eq!(config.base_url(), "http://192.168.1.1");
        config.use_https = true;
        assert_eq!(config.base_url(), "https://192.168.1.1");
        config.host = "http://router.lan:8080/".into();
        assert_eq!(config.base_url(), "http://router.lan:8080");
    }

    #[test]
    fn debug_redacts_password() {
        let config = KeeneticConfig::new("router", "admin", "hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    // ===========================================
    // Fake Router Tests
    // ===========================================

    const CHALLENGE: &str = "ABCDEF0123";
    const REALM: &str = "Keenetic Test";

    #[derive(Default)]
    struct FakeRouter {
        logged_in: bool,
        expire_next: bool,
        logins: u32,
        commands: Vec<Value>,
    }

    type Shared = Arc<Mutex<FakeRouter>>;

    async fn auth_get(State(router): State<Shared>) -> Response {
        if router.lock().unwrap().logged_in {
            return AxumStatus::OK.into_response();
        }
        (
            AxumStatus::UNAUTHORIZED,
            [("X-NDM-Challenge", CHALLENGE), ("X-NDM-Realm", REALM)],
        )
            .into_response()
    }

    async fn auth_post(State(router): State<Shared>, Json(body): Json<Value>) -> AxumStatus {
        let expected = login_digest("admin", REALM, "secret", CHALLENGE);
        if body["login"] == "admin" && body["password"] == expected.as_str() {
            let mut router = router.lock().unwrap();
            router.logged_in = true;
            router.logins += 1;
            AxumStatus::OK
        } else {
            AxumStatus::UNAUTHORIZED
        }
    }

    async fn rci(State(router): State<Shared>, Json(body): Json<Value>) -> Response {
        let mut router = router.lock().unwrap();
        if router.expire_next {
            router.expire_next = false;
            router.logged_in = false;
        }
        if !router.logged_in {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        router.commands.push(body.clone());

        let sms = &body[0]["sms"];
        if sms.get("list").is_some() {
            Json(json!([{ "sms": { "list": { "messages": {
                "nv-1": { "timestamp": "2025-01-19 14:30:00", "from": "+1", "text": "hi", "read": false }
            }}}}]))
            .into_response()
        } else if sms["delete"][0]["id"] == "nv-404" {
            Json(json!([{ "sms": { "delete": {
                "status": [{ "status": "error", "message": "no such message" }]
            }}}]))
            .into_response()
        } else {
            Json(json!([{}])).into_response()
        }
    }

    async fn show_interface(State(router): State<Shared>) -> Response {
        if !router.lock().unwrap().logged_in {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        Json(json!({ "signal-strength": -82, "operator": "Vodafone", "state": "up" }))
            .into_response()
    }

    async fn spawn_router() -> (String, Shared) {
        let shared = Shared::default();
        let app = Router::new()
            .route("/auth", get(auth_get).post(auth_post))
            .route("/rci/", post(rci))
            .route("/rci/show/interface/:name", get(show_interface))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr.to_string(), shared)
    }

    fn client(host: &str, password: &str) -> KeeneticClient {
        KeeneticClient::new(KeeneticConfig::new(host, "admin", password)).unwrap()
    }

    #[tokio::test]
    async fn logs_in_and_lists_messages() {
        let (host, router) = spawn_router().await;
        let client = client(&host, "secret");

        let messages = client.list_messages().await.unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id.as_str(), "nv-1");
        assert_eq!(router.lock().unwrap().logins, 1);
    }

    #[tokio::test]
    async fn reauthenticates_once_on_expired_session() {
        let (host, router) = spawn_router().await;
        let client = client(&host, "secret");
        client.list_messages().await.unwrap();

        router.lock().unwrap().expire_next = true;
        let messages = client.list_messages().await.unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(router.lock().unwrap().logins, 2);
    }

    #[tokio::test]
    async fn wrong_password_is_auth_error() {
        let (host, _router) = spawn_router().await;
        let client = client(&host, "wrong");

        let result = client.list_messages().await;
        assert!(matches!(result, Err(GatewayError::Auth(_))));
    }

    #[tokio::test]
    async fn unicode_send_sets_flag() {
        let (host, router) = spawn_router().await;
        let client = client(&host, "secret");

        client
            .send_message("+420111", "Привет", Encoding::Unicode)
            .await
            .unwrap();
        client
            .send_message("+420222", "Hello", Encoding::Gsm7)
            .await
            .unwrap();

        let commands = router.lock().unwrap().commands.clone();
        let unicode = &commands[0][0]["sms"]["send"];
        assert_eq!(unicode["to"], "+420111");
        assert_eq!(unicode["unicode"], true);
        let plain = &commands[1][0]["sms"]["send"];
        assert_eq!(plain["message"], "Hello");
        assert!(plain.get("unicode").is_none());
    }

    #[tokio::test]
    async fn rci_error_status_is_reported() {
        let (host, _router) = spawn_router().await;
        let client = client(&host, "secret");

        let result = client.delete_message(&MessageId::new("nv-404")).await;
        assert!(matches!(result, Err(GatewayError::Api { .. })));
        client.delete_message(&MessageId::new("nv-1")).await.unwrap();
    }

    #[tokio::test]
    async fn delete_all_sends_bulk_command() {
        let (host, router) = spawn_router().await;
        let client = client(&host, "secret");

        assert_eq!(client.delete_all().await.unwrap(), 1);

        let commands = router.lock().unwrap().commands.clone();
        let delete = &commands[1][0]["sms"]["delete"];
        assert_eq!(delete[0]["id"], "nv-1");
        assert_eq!(delete[0]["interface"], DEFAULT_INTERFACE);
    }

    #[tokio::test]
    async fn status_reads_interface() {
        let (host, _router) = spawn_router().await;
        let client = client(&host, "secret");

        let signal = client.signal().await.unwrap();
        assert_eq!(signal.percent, 50);
        assert_eq!(client.network().await.unwrap().name, "Vodafone");
        client.check_connection().await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_router_is_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client(&addr.to_string(), "secret");
        let result = client.check_connection().await;
        assert!(result.unwrap_err().is_unreachable());
    }
}
