//! HTTP Basic auth for the message and ledger routes.

use super::ApiError;
use crate::server::SmsGateway;
use axum::extract::Request;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;

const CHALLENGE: &str = r#"Basic realm="sms-gateway""#;

/// Decode `Authorization: Basic ...` into user and password.
fn credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Reject requests without the configured credentials.
pub async fn require_basic_auth(
    Extension(gateway): Extension<Arc<SmsGateway>>,
    request: Request,
    next: Next,
) -> Response {
    let http = &gateway.config().http;
    match credentials(request.headers()) {
        Some((user, password)) if user == http.username && password == http.password => {
            next.run(request).await
        }
        other => {
            if other.is_some() {
                tracing::warn!(path = %request.uri().path(), "rejected HTTP credentials");
            }
            let mut response =
                ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized Access").into_response();
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn decodes_basic_credentials() {
        let value = format!("Basic {}", STANDARD.encode("admin:pa:ss"));
        assert_eq!(
            credentials(&headers(&value)),
            Some(("admin".to_string(), "pa:ss".to_string()))
        );
    }

    #[test]
    fn rejects_other_schemes() {
        assert_eq!(credentials(&headers("Bearer abc")), None);
        assert_eq!(credentials(&headers("Basic not-base64!")), None);
        assert_eq!(credentials(&HeaderMap::new()), None);
    }
}
