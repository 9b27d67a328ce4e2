//! Streaming relay
//!
//! A single endpoint that forwards a turn request to the upstream
//! Responses service with the server-held key and re-emits every upstream
//! event as a `{"event", "data"}` record.

mod handlers;

pub use handlers::{create_router, envelope, upstream_body, TurnResponseRequest};

use crate::config::RelayConfig;
use crate::transport::TransportError;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct RelayState {
    pub client: reqwest::Client,
    pub config: Arc<RelayConfig>,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Result<Self, TransportError> {
        // No overall timeout; a response streams for as long as the model writes
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::from_reqwest(&e))?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }
}
