//! Mock implementations for testing
//!
//! These mocks drive the turn loop without a network.

use crate::request::TurnRequest;
use crate::tools::Tool;
use crate::transport::{ByteStream, TransportError, TurnTransport};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

// ============================================================================
// Mock Transport
// ============================================================================

enum QueuedBody {
    /// Chunks, optionally followed by a connection failure
    Chunks(Vec<Vec<u8>>, Option<TransportError>),
    /// Chunks, then the body never ends
    Stalled(Vec<Vec<u8>>),
    /// The request itself fails
    Refused(TransportError),
}

/// Transport that replays queued response bodies in order
#[derive(Default)]
pub struct MockTransport {
    bodies: Mutex<VecDeque<QueuedBody>>,
    requests: Mutex<Vec<TurnRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// One relay record for an event
    pub fn record(kind: &str, data: &Value) -> Vec<u8> {
        format!("data: {}\n\n", json!({ "event": kind, "data": data })).into_bytes()
    }

    /// Queue a well-formed body carrying these events, then `[DONE]`
    pub fn queue_events(&self, events: &[(&str, Value)]) {
        self.queue_body(sse_body(events), None);
    }

    pub fn queue_body(&self, chunks: Vec<Vec<u8>>, error: Option<TransportError>) {
        self.bodies
            .lock()
            .unwrap()
            .push_back(QueuedBody::Chunks(chunks, error));
    }

    pub fn queue_stalled(&self, chunks: Vec<Vec<u8>>) {
        self.bodies
            .lock()
            .unwrap()
            .push_back(QueuedBody::Stalled(chunks));
    }

    pub fn queue_error(&self, error: TransportError) {
        self.bodies
            .lock()
            .unwrap()
            .push_back(QueuedBody::Refused(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<TurnRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TurnTransport for MockTransport {
    async fn open(&self, request: &TurnRequest) -> Result<ByteStream, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let body = self
            .bodies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| QueuedBody::Refused(TransportError::unknown("no body queued")));

        match body {
            QueuedBody::Refused(error) => Err(error),
            QueuedBody::Chunks(chunks, error) => {
                let items = chunks.into_iter().map(Ok).chain(error.map(Err));
                Ok(Box::pin(stream::iter(items.collect::<Vec<_>>())))
            }
            QueuedBody::Stalled(chunks) => {
                let items = stream::iter(chunks.into_iter().map(Ok).collect::<Vec<_>>());
                Ok(Box::pin(items.chain(stream::pending())))
            }
        }
    }
}

/// Relay body for a list of events, chunked one record per chunk
pub fn sse_body(events: &[(&str, Value)]) -> Vec<Vec<u8>> {
    events
        .iter()
        .map(|(kind, data)| MockTransport::record(kind, data))
        .chain(std::iter::once(b"data: [DONE]\n\n".to_vec()))
        .collect()
}

// ============================================================================
// Recording Tool
// ============================================================================

/// Tool that records its arguments and returns a fixed result
pub struct RecordingTool {
    name: String,
    result: Result<Value, String>,
    calls: Mutex<Vec<Value>>,
}

impl RecordingTool {
    pub fn ok(name: &str, result: Value) -> Self {
        Self {
            name: name.to_string(),
            result: Ok(result),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            result: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Test tool {}", self.name)
    }

    fn parameters(&self) -> Map<String, Value> {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), json!({}));
        schema
    }

    async fn call(&self, arguments: Value) -> Result<Value, String> {
        self.calls.lock().unwrap().push(arguments);
        self.result.clone()
    }
}
