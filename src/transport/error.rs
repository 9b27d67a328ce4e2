//! Transport error types

use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;
use thiserror::Error;

/// A failed request or an aborted response stream
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status from the relay.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = match TransportErrorKind::from_status(status) {
            TransportErrorKind::Auth => format!("Authentication failed: {message}"),
            TransportErrorKind::RateLimit => format!("Rate limit exceeded: {message}"),
            TransportErrorKind::InvalidRequest => format!("Invalid request: {message}"),
            TransportErrorKind::ServerError => format!("Server error: {message}"),
            TransportErrorKind::Network | TransportErrorKind::Unknown => {
                format!("HTTP {status}: {message}")
            }
        };
        Self::new(TransportErrorKind::from_status(status), message)
    }

    /// Classify a non-success response, keeping any `Retry-After` hint.
    pub fn from_response(status: u16, headers: &HeaderMap, message: impl Into<String>) -> Self {
        let error = Self::from_status(status, message);
        match retry_after(headers) {
            Some(delay) => error.with_retry_after(delay),
            None => error,
        }
    }

    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::network(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            Self::network(format!("Connection failed: {e}"))
        } else if e.is_body() || e.is_decode() {
            Self::network(format!("Stream aborted: {e}"))
        } else {
            Self::unknown(format!("Request failed: {e}"))
        }
    }
}

/// Error classification. Nothing in the engine retries automatically; the
/// classification is surfaced so a caller can decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Network issues, timeouts, dropped streams
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400)
    InvalidRequest,
    Unknown,
}

impl TransportErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth,
            429 => Self::RateLimit,
            400 | 404 | 422 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}

/// `Retry-After` as delay-seconds. The HTTP-date form is not used by the
/// Responses API and is ignored.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(TransportError::from_status(401, "x").kind, TransportErrorKind::Auth);
        assert_eq!(TransportError::from_status(429, "x").kind, TransportErrorKind::RateLimit);
        assert_eq!(TransportError::from_status(400, "x").kind, TransportErrorKind::InvalidRequest);
        assert_eq!(TransportError::from_status(502, "x").kind, TransportErrorKind::ServerError);
        assert_eq!(TransportError::from_status(418, "x").kind, TransportErrorKind::Unknown);
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, "7".parse().unwrap());
        let error = TransportError::from_response(429, &headers, "slow down");
        assert_eq!(error.kind, TransportErrorKind::RateLimit);
        assert_eq!(error.retry_after, Some(Duration::from_secs(7)));
        assert_eq!(error.message, "Rate limit exceeded: slow down");

        headers.insert(RETRY_AFTER, "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap());
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(TransportErrorKind::Network.is_retryable());
        assert!(TransportErrorKind::ServerError.is_retryable());
        assert!(!TransportErrorKind::Auth.is_retryable());
        assert!(!TransportErrorKind::InvalidRequest.is_retryable());
    }
}
