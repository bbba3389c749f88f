//! Error types for router calls.

use thiserror::Error;

/// A call to the router failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The router could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Login was rejected or the challenge was malformed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The router answered with an error status.
    #[error("router returned HTTP {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or RCI error message.
        message: String,
    },

    /// The call did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Whether the failure means the router is unreachable, as opposed to
    /// the router rejecting the request.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout)
    }

    /// Whether the router reported that the addressed item does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = GatewayError::Api {
            status: 500,
            message: "busy".into(),
        };
        assert_eq!(err.to_string(), "router returned HTTP 500: busy");
        assert_eq!(GatewayError::Timeout.to_string(), "request timed out");
    }

    #[test]
    fn unreachable_classification() {
        assert!(GatewayError::Timeout.is_unreachable());
        assert!(GatewayError::Connection("refused".into()).is_unreachable());
        assert!(!GatewayError::Auth("bad password".into()).is_unreachable());
        assert!(!GatewayError::Api {
            status: 400,
            message: String::new()
        }
        .is_unreachable());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GatewayError>();
    }
}
