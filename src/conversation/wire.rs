//! Wire-context items
//!
//! The minimal item list resent upstream to continue a conversation.
//! Client-authored items are typed; items produced by the service are kept
//! as the raw JSON it sent so they round-trip exactly.

use super::item::{ContentKind, Role};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireItem {
    Message(WireMessage),
    FunctionCallOutput(FunctionCallOutput),
    ApprovalResponse(ApprovalResponse),
    /// An output item exactly as the service produced it
    Raw(Value),
}

impl WireItem {
    pub fn user_text(text: impl Into<String>) -> Self {
        WireItem::Message(WireMessage::parts(
            Role::User,
            ContentKind::InputText,
            text.into(),
        ))
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        WireItem::Message(WireMessage::parts(
            Role::Assistant,
            ContentKind::OutputText,
            text.into(),
        ))
    }

    pub fn developer(text: impl Into<String>) -> Self {
        WireItem::Message(WireMessage {
            role: Role::Developer,
            content: WireContent::Text(text.into()),
        })
    }

    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        WireItem::FunctionCallOutput(FunctionCallOutput {
            kind: "function_call_output",
            call_id: call_id.into(),
            output: output.into(),
        })
    }

    pub fn approval_response(approval_request_id: impl Into<String>, approve: bool) -> Self {
        WireItem::ApprovalResponse(ApprovalResponse {
            kind: "mcp_approval_response",
            approval_request_id: approval_request_id.into(),
            approve,
        })
    }

    /// Items written by this client rather than echoed from a response.
    ///
    /// Chained requests only need to carry these; the service already holds
    /// everything it produced itself.
    pub fn is_client_authored(&self) -> bool {
        match self {
            WireItem::Message(message) => message.role != Role::Assistant,
            WireItem::FunctionCallOutput(_) | WireItem::ApprovalResponse(_) => true,
            WireItem::Raw(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: WireContent,
}

impl WireMessage {
    fn parts(role: Role, kind: ContentKind, text: String) -> Self {
        Self {
            role,
            content: WireContent::Parts(vec![WireContentPart { kind, text }]),
        }
    }

    pub fn text(&self) -> String {
        match &self.content {
            WireContent::Text(text) => text.clone(),
            WireContent::Parts(parts) => parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Parts(Vec<WireContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireContentPart {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCallOutput {
    #[serde(rename = "type")]
    kind: &'static str,
    pub call_id: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalResponse {
    #[serde(rename = "type")]
    kind: &'static str,
    pub approval_request_id: String,
    pub approve: bool,
}
