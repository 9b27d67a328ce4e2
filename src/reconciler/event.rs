//! Typed stream events
//!
//! Each record on the relay stream is an envelope `{event, data}`. The kind
//! string selects the payload type. Kinds this crate does not handle decode
//! to [`ServerEvent::Unknown`] so new upstream events pass through harmlessly.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A record that could not be decoded; only that record is lost
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed event envelope: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed `{kind}` payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    ResponseCreated(ResponseEnvelope),
    ResponseCompleted(ResponseEnvelope),
    ResponseFailed(ResponseEnvelope),
    Error(ErrorPayload),

    ReasoningSummaryDelta(ItemDelta),
    ReasoningSummaryDone(SummaryDone),

    OutputTextDelta(TextDelta),
    AnnotationAdded(AnnotationAdded),

    OutputItemAdded(ItemEnvelope),
    OutputItemDone(ItemEnvelope),

    FunctionCallArgumentsDelta(ItemDelta),
    FunctionCallArgumentsDone(ArgumentsDone),
    McpCallArgumentsDelta(ItemDelta),
    McpCallArgumentsDone(ArgumentsDone),

    WebSearchProgress(SearchProgress),
    WebSearchQuery(QueryUpdate),
    FileSearchProgress(SearchProgress),

    CodeDelta(ItemDelta),
    CodeDone(CodeDone),
    CodeInterpreterProgress(SearchProgress),

    /// Any kind not listed above
    Unknown { kind: String },
}

/// Phase carried by `*.in_progress` / `*.searching` / `*.completed` events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    InProgress,
    /// `searching` for search tools, `interpreting` for code execution
    Working,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseEnvelope {
    pub response: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Vec<Value>,
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemDelta {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub delta: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummaryDone {
    #[serde(default)]
    pub item_id: Option<String>,
    /// Present on `.done`; `.finished` carries no text
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextDelta {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub delta: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnnotationAdded {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub annotation: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemEnvelope {
    pub item: Value,
}

impl ItemEnvelope {
    pub fn item_type(&self) -> &str {
        self.str_field("type").unwrap_or_default()
    }

    pub fn item_id(&self) -> Option<&str> {
        self.str_field("id")
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.item.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArgumentsDone {
    #[serde(default)]
    pub item_id: Option<String>,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchProgress {
    #[serde(skip, default = "default_phase")]
    pub phase: ProgressPhase,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub output: Option<Value>,
}

fn default_phase() -> ProgressPhase {
    ProgressPhase::InProgress
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryUpdate {
    #[serde(default)]
    pub item_id: Option<String>,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodeDone {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    data: Value,
}

impl ServerEvent {
    /// Decode one relay record
    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        let raw: RawEvent = serde_json::from_str(text)?;
        Self::from_parts(raw.event, raw.data)
    }

    /// Decode an event from its kind string and payload
    pub fn from_parts(kind: String, data: Value) -> Result<Self, DecodeError> {
        fn payload<T: serde::de::DeserializeOwned>(kind: &str, data: Value) -> Result<T, DecodeError> {
            serde_json::from_value(data).map_err(|source| DecodeError::Payload {
                kind: kind.to_string(),
                source,
            })
        }

        fn progress(kind: &str, data: Value, phase: ProgressPhase) -> Result<SearchProgress, DecodeError> {
            let mut progress: SearchProgress = payload(kind, data)?;
            progress.phase = phase;
            Ok(progress)
        }

        use ProgressPhase::{Completed, InProgress, Working};

        let event = match kind.as_str() {
            "response.created" => ServerEvent::ResponseCreated(payload(&kind, data)?),
            "response.completed" => ServerEvent::ResponseCompleted(payload(&kind, data)?),
            "response.failed" => ServerEvent::ResponseFailed(payload(&kind, data)?),
            "error" => ServerEvent::Error(payload(&kind, data)?),

            "response.reasoning_summary_text.delta" => {
                ServerEvent::ReasoningSummaryDelta(payload(&kind, data)?)
            }
            "response.reasoning_summary_text.finished" | "response.reasoning_summary_text.done" => {
                ServerEvent::ReasoningSummaryDone(payload(&kind, data)?)
            }

            "response.output_text.delta" => ServerEvent::OutputTextDelta(payload(&kind, data)?),
            "response.output_text.annotation.added" => {
                ServerEvent::AnnotationAdded(payload(&kind, data)?)
            }

            "response.output_item.added" => ServerEvent::OutputItemAdded(payload(&kind, data)?),
            "response.output_item.done" => ServerEvent::OutputItemDone(payload(&kind, data)?),

            "response.function_call_arguments.delta" => {
                ServerEvent::FunctionCallArgumentsDelta(payload(&kind, data)?)
            }
            "response.function_call_arguments.done" => {
                ServerEvent::FunctionCallArgumentsDone(payload(&kind, data)?)
            }
            "response.mcp_call_arguments.delta" | "response.mcp_call.arguments.delta" => {
                ServerEvent::McpCallArgumentsDelta(payload(&kind, data)?)
            }
            "response.mcp_call_arguments.done" | "response.mcp_call.arguments.done" => {
                ServerEvent::McpCallArgumentsDone(payload(&kind, data)?)
            }

            "response.web_search_call.in_progress" => {
                ServerEvent::WebSearchProgress(progress(&kind, data, InProgress)?)
            }
            "response.web_search_call.searching" => {
                ServerEvent::WebSearchProgress(progress(&kind, data, Working)?)
            }
            "response.web_search_call.completed" => {
                ServerEvent::WebSearchProgress(progress(&kind, data, Completed)?)
            }
            "response.web_search_query.added" | "response.web_search_query.updated" => {
                ServerEvent::WebSearchQuery(payload(&kind, data)?)
            }

            "response.file_search_call.in_progress" => {
                ServerEvent::FileSearchProgress(progress(&kind, data, InProgress)?)
            }
            "response.file_search_call.searching" => {
                ServerEvent::FileSearchProgress(progress(&kind, data, Working)?)
            }
            "response.file_search_call.completed" => {
                ServerEvent::FileSearchProgress(progress(&kind, data, Completed)?)
            }

            "response.code_interpreter_call_code.delta"
            | "response.code_interpreter_call.code.delta" => {
                ServerEvent::CodeDelta(payload(&kind, data)?)
            }
            "response.code_interpreter_call_code.done"
            | "response.code_interpreter_call.code.done" => {
                ServerEvent::CodeDone(payload(&kind, data)?)
            }
            "response.code_interpreter_call.in_progress" => {
                ServerEvent::CodeInterpreterProgress(progress(&kind, data, InProgress)?)
            }
            "response.code_interpreter_call.interpreting" => {
                ServerEvent::CodeInterpreterProgress(progress(&kind, data, Working)?)
            }
            "response.code_interpreter_call.completed" => {
                ServerEvent::CodeInterpreterProgress(progress(&kind, data, Completed)?)
            }

            _ => ServerEvent::Unknown { kind },
        };
        Ok(event)
    }

    /// Event kind for logging
    pub fn kind(&self) -> &str {
        match self {
            ServerEvent::ResponseCreated(_) => "response.created",
            ServerEvent::ResponseCompleted(_) => "response.completed",
            ServerEvent::ResponseFailed(_) => "response.failed",
            ServerEvent::Error(_) => "error",
            ServerEvent::ReasoningSummaryDelta(_) => "response.reasoning_summary_text.delta",
            ServerEvent::ReasoningSummaryDone(_) => "response.reasoning_summary_text.done",
            ServerEvent::OutputTextDelta(_) => "response.output_text.delta",
            ServerEvent::AnnotationAdded(_) => "response.output_text.annotation.added",
            ServerEvent::OutputItemAdded(_) => "response.output_item.added",
            ServerEvent::OutputItemDone(_) => "response.output_item.done",
            ServerEvent::FunctionCallArgumentsDelta(_) => "response.function_call_arguments.delta",
            ServerEvent::FunctionCallArgumentsDone(_) => "response.function_call_arguments.done",
            ServerEvent::McpCallArgumentsDelta(_) => "response.mcp_call_arguments.delta",
            ServerEvent::McpCallArgumentsDone(_) => "response.mcp_call_arguments.done",
            ServerEvent::WebSearchProgress(_) => "response.web_search_call",
            ServerEvent::WebSearchQuery(_) => "response.web_search_query",
            ServerEvent::FileSearchProgress(_) => "response.file_search_call",
            ServerEvent::CodeDelta(_) => "response.code_interpreter_call_code.delta",
            ServerEvent::CodeDone(_) => "response.code_interpreter_call_code.done",
            ServerEvent::CodeInterpreterProgress(_) => "response.code_interpreter_call",
            ServerEvent::Unknown { kind } => kind,
        }
    }
}
