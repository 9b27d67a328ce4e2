//! turnstream - streaming turn engine for a Responses-API chat client
//!
//! Decodes the relay's event stream, reconciles it into a conversation
//! store, runs local tools and continues the turn until the model is done.

pub mod config;
pub mod conversation;
pub mod models;
pub mod partial_json;
pub mod reconciler;
pub mod relay;
pub mod request;
pub mod runtime;
pub mod sse;
pub mod tools;
pub mod transport;
