//! Turn driver
//!
//! Runs one logical turn: request, stream, reconcile, then dispatch local
//! tools and continue with the extended context until a response asks for
//! nothing more. Continuation is a loop, so failure and cancellation are
//! handled the same way at any depth.

use crate::config::ContextMode;
use crate::conversation::{ConversationStore, Item, ToolStatus, WireItem};
use crate::reconciler::{Effect, Reconciler};
use crate::request::{ReasoningEffort, TurnRequest};
use crate::sse::{event_stream, StreamError};
use crate::tools::{DispatchError, ToolRegistry, ToolsConfig};
use crate::transport::{ByteStream, TransportError, TurnTransport};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Where a turn currently is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnPhase {
    #[default]
    Idle,
    Requesting,
    Streaming,
    ToolExecuting,
    Done,
    Failed,
}

/// Per-driver request settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSettings {
    pub model: String,
    pub reasoning_effort: ReasoningEffort,
    pub context_mode: ContextMode,
    /// Automatic continuations allowed per user action
    pub max_continuations: u32,
    pub tools: ToolsConfig,
    pub developer_prompt: String,
}

/// How a turn ended without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The last response requested no local tool
    Completed { requests: u32 },
    /// Gateway calls wait on an operator decision
    AwaitingApproval { request_ids: Vec<String> },
    /// The model called functions nobody registered; the turn stops here
    ToolUnavailable { names: Vec<String> },
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("upstream error: {message}")]
    Upstream { message: String },
    #[error("turn cancelled")]
    Cancelled,
    #[error("stopped after {limit} automatic continuations")]
    ContinuationLimit { limit: u32 },
    #[error("no approval request with id {request_id}")]
    UnknownApproval { request_id: String },
}

/// What one drained response asked for
struct Drained {
    effects: Vec<Effect>,
    response_id: Option<String>,
}

pub struct TurnDriver<T> {
    transport: T,
    tools: Arc<ToolRegistry>,
    settings: TurnSettings,
}

impl<T: TurnTransport> TurnDriver<T> {
    pub fn new(transport: T, tools: Arc<ToolRegistry>, settings: TurnSettings) -> Self {
        Self {
            transport,
            tools,
            settings,
        }
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    /// Append a user message and run a turn for it
    pub async fn send_user_message(
        &self,
        store: &mut ConversationStore,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        store.push_user_message(text);
        store.set_assistant_loading(true);
        self.run(store, cancel).await
    }

    /// Record an operator decision on a gateway approval request.
    ///
    /// An approval continues the conversation; a denial is recorded and
    /// sent with the next request, but nothing runs now.
    pub async fn respond_to_approval(
        &self,
        store: &mut ConversationStore,
        request_id: &str,
        approve: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<TurnOutcome>, TurnError> {
        let index = store
            .rposition(|item| matches!(item, Item::ApprovalRequest(a) if a.id == request_id))
            .ok_or_else(|| TurnError::UnknownApproval {
                request_id: request_id.to_string(),
            })?;

        store.update_item(index, |item| {
            if let Item::ApprovalRequest(request) = item {
                request.decision = Some(approve);
            }
        });
        store.push_wire(WireItem::approval_response(request_id, approve));
        tracing::info!(request_id = %request_id, approve, "Approval decision recorded");

        if !approve {
            return Ok(None);
        }
        store.set_assistant_loading(true);
        self.run(store, cancel).await.map(Some)
    }

    /// Run requests until a response needs no further local work
    pub async fn run(
        &self,
        store: &mut ConversationStore,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        let turn = Uuid::new_v4();
        tracing::info!(turn = %turn, model = %self.settings.model, "Turn started");

        let result = self.drive(store, cancel, turn).await;
        store.set_assistant_loading(false);

        match &result {
            Ok(outcome) => {
                tracing::info!(turn = %turn, outcome = ?outcome, "Turn finished");
                store.set_phase(TurnPhase::Done);
            }
            Err(e) => {
                tracing::error!(turn = %turn, error = %e, "Turn failed");
                store.set_phase(TurnPhase::Failed);
            }
        }
        result
    }

    async fn drive(
        &self,
        store: &mut ConversationStore,
        cancel: &CancellationToken,
        turn: Uuid,
    ) -> Result<TurnOutcome, TurnError> {
        let mut requests = 0u32;

        loop {
            requests += 1;
            store.set_phase(TurnPhase::Requesting);
            let request = self.build_request(store);

            let body = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(TurnError::Cancelled),
                body = self.transport.open(&request) => body?,
            };

            store.set_phase(TurnPhase::Streaming);
            let drained = drain(store, body, cancel).await?;

            if let Some(message) = drained.effects.iter().find_map(|e| match e {
                Effect::UpstreamFailed { message } => Some(message.clone()),
                _ => None,
            }) {
                return Err(TurnError::Upstream { message });
            }
            store.mark_response(drained.response_id);

            let mut invocations = Vec::new();
            let mut approvals = Vec::new();
            for effect in drained.effects {
                match effect {
                    Effect::InvokeTool { item_id } => invocations.push(item_id),
                    Effect::AwaitApproval { request_id } => approvals.push(request_id),
                    Effect::UpstreamFailed { .. } => {}
                }
            }

            if invocations.is_empty() {
                if approvals.is_empty() {
                    return Ok(TurnOutcome::Completed { requests });
                }
                return Ok(TurnOutcome::AwaitingApproval {
                    request_ids: approvals,
                });
            }

            store.set_phase(TurnPhase::ToolExecuting);
            let unavailable = self.execute_tools(store, &invocations, cancel).await?;
            if !unavailable.is_empty() {
                return Ok(TurnOutcome::ToolUnavailable { names: unavailable });
            }

            let limit = self.settings.max_continuations;
            if requests > limit {
                return Err(TurnError::ContinuationLimit { limit });
            }
            tracing::info!(turn = %turn, continuation = requests, "Continuing after tool output");
        }
    }

    /// Assemble the outbound request from the store
    pub fn build_request(&self, store: &ConversationStore) -> TurnRequest {
        let model = &self.settings.model;
        let tools = self.settings.tools.build(model, &self.tools);

        let chained = match (self.settings.context_mode, store.previous_response_id()) {
            (ContextMode::Chained, Some(previous)) => Some(previous.to_string()),
            _ => None,
        };

        let messages = if chained.is_some() {
            store
                .wire_since_response()
                .iter()
                .filter(|item| item.is_client_authored())
                .cloned()
                .collect()
        } else {
            std::iter::once(WireItem::developer(self.settings.developer_prompt.as_str()))
                .chain(store.wire().iter().cloned())
                .collect()
        };

        TurnRequest::new(model.as_str(), messages, tools)
            .with_reasoning(self.settings.reasoning_effort)
            .with_previous_response(chained)
    }

    /// Dispatch every finished local call and append its output.
    ///
    /// Returns the names of functions with no registered handler; those
    /// calls get no output.
    async fn execute_tools(
        &self,
        store: &mut ConversationStore,
        item_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, TurnError> {
        let mut unavailable = Vec::new();

        for item_id in item_ids {
            let Some(index) = store.position_by_id(item_id) else {
                continue;
            };
            let Some(call) = store.item(index).and_then(Item::as_tool_call).cloned() else {
                continue;
            };
            let Some(call_id) = call.call_id.clone() else {
                tracing::warn!(item_id = %item_id, "Function call finished without a call id");
                continue;
            };
            let name = call.name.clone().unwrap_or_default();

            let output = if call.status == ToolStatus::Failed {
                json!({ "error": "arguments were not valid JSON" })
            } else {
                let result = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(TurnError::Cancelled),
                    result = self.tools.invoke(&name, call.parsed_arguments.clone()) => result,
                };
                match result {
                    Ok(value) => value,
                    Err(DispatchError::UnknownCapability { name }) => {
                        tracing::warn!(tool = %name, "Model called an unregistered tool");
                        unavailable.push(name);
                        continue;
                    }
                    Err(DispatchError::Handler { name, message }) => {
                        tracing::warn!(tool = %name, error = %message, "Tool handler failed");
                        json!({ "error": message })
                    }
                }
            };

            let output = output.to_string();
            store.update_item(index, |item| {
                if let Item::ToolCall(call) = item {
                    call.output = Some(output.clone());
                }
            });
            store.push_wire(WireItem::function_call_output(call_id, output));
        }

        Ok(unavailable)
    }
}

/// Feed a response body through the reconciler until it ends
async fn drain(
    store: &mut ConversationStore,
    body: ByteStream,
    cancel: &CancellationToken,
) -> Result<Drained, TurnError> {
    let mut reconciler = Reconciler::new();
    let mut effects = Vec::new();
    let events = event_stream(body);
    tokio::pin!(events);

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TurnError::Cancelled),
            next = events.next() => next,
        };
        let Some(next) = next else {
            break;
        };

        match next {
            Ok(event) => match reconciler.apply(store, &event) {
                Ok(more) => effects.extend(more),
                Err(e) => tracing::warn!(error = %e, "Protocol invariant violation, event ignored"),
            },
            Err(StreamError::Decode(e)) => tracing::warn!(error = %e, "Dropping malformed event"),
            Err(StreamError::Transport(e)) => return Err(TurnError::Transport(e)),
        }
    }

    Ok(Drained {
        effects,
        response_id: reconciler.response_id().map(str::to_string),
    })
}
