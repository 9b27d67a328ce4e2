//! HTTP transport to the relay endpoint

use super::{ByteStream, TransportError, TurnTransport};
use crate::request::TurnRequest;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;

/// Posts turn requests to a relay and streams back its event body
pub struct RelayTransport {
    client: Client,
    url: String,
}

impl RelayTransport {
    /// No overall request timeout is set: a long generation is
    /// indistinguishable from a stalled one at this layer.
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::unknown(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Deserialize)]
struct RelayErrorBody {
    error: String,
}

#[async_trait]
impl TurnTransport for RelayTransport {
    async fn open(&self, request: &TurnRequest) -> Result<ByteStream, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<RelayErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(TransportError::from_response(status.as_u16(), &headers, message));
        }

        let body = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| TransportError::from_reqwest(&e))
        });
        Ok(Box::pin(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportErrorKind;
    use axum::{
        http::{header, StatusCode},
        routing::post,
        Router,
    };
    use std::time::Duration;

    /// Serve a relay that always answers 429 and return its endpoint
    async fn rate_limited_relay(retry_after: &'static str) -> String {
        let app = Router::new().route(
            "/api/turn_response",
            post(move || async move {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after)],
                    r#"{"error":"Rate limit reached"}"#,
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/turn_response")
    }

    #[tokio::test]
    async fn test_rate_limit_carries_retry_after() {
        let transport = RelayTransport::new(rate_limited_relay("7").await).unwrap();
        let request = TurnRequest::new("gpt-4.1", vec![], vec![]);

        let Err(error) = transport.open(&request).await else {
            panic!("expected a rate limit error");
        };
        assert_eq!(error.kind, TransportErrorKind::RateLimit);
        assert_eq!(error.retry_after, Some(Duration::from_secs(7)));
        assert_eq!(error.message, "Rate limit exceeded: Rate limit reached");
    }
}
