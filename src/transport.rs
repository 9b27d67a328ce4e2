//! Turn transport abstraction
//!
//! A transport opens one turn request against the relay endpoint and hands
//! back the raw response body. Framing and decoding happen in [`crate::sse`].

mod error;
mod relay;

pub use error::{retry_after, TransportError, TransportErrorKind};
pub use relay::RelayTransport;

use crate::request::TurnRequest;
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Raw response body, chunked at arbitrary boundaries
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// Opens turn requests
#[async_trait]
pub trait TurnTransport: Send + Sync {
    /// Send the request and return the streaming body once headers arrive
    async fn open(&self, request: &TurnRequest) -> Result<ByteStream, TransportError>;
}

#[async_trait]
impl<T: TurnTransport + ?Sized> TurnTransport for Arc<T> {
    async fn open(&self, request: &TurnRequest) -> Result<ByteStream, TransportError> {
        (**self).open(request).await
    }
}

/// Logging wrapper for transports
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T: TurnTransport> LoggingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: TurnTransport> TurnTransport for LoggingTransport<T> {
    async fn open(&self, request: &TurnRequest) -> Result<ByteStream, TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.open(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(
                    model = %request.model,
                    items = request.messages.len(),
                    tools = request.tools.len(),
                    chained = request.previous_response_id.is_some(),
                    duration_ms = %duration.as_millis(),
                    "Turn request opened"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %request.model,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    retry_after = ?e.retry_after,
                    "Turn request failed"
                );
            }
        }

        result
    }
}
