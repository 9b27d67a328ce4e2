//! Turn reconciler
//!
//! One reducer step per stream event, applied strictly in arrival order.
//! Each step mutates the conversation store and returns the [`Effect`]s the
//! turn driver must act on once the stream has drained.
//!
//! Matching rule: an event carrying an identity already assigned to an item
//! is matched exactly. Otherwise it attaches to the most recently appended
//! open item of the compatible kind that has no identity yet, and that item
//! adopts the identity.

mod event;

#[cfg(test)]
mod proptests;

pub use event::{
    AnnotationAdded, ArgumentsDone, CodeDone, DecodeError, ErrorPayload, ItemDelta, ItemEnvelope,
    ProgressPhase, QueryUpdate, ResponseBody, ResponseEnvelope, SearchProgress, ServerEvent,
    SummaryDone, TextDelta,
};

use crate::conversation::{
    Annotation, ApprovalRequestItem, ConversationStore, Item, MessageItem, Role, ToolCallItem,
    ToolCatalogItem, ToolDescriptor, ToolKind, ToolStatus, WireItem,
};
use crate::partial_json;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Work for the turn driver produced by a reducer step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// A local function call finished streaming and should be dispatched
    InvokeTool { item_id: String },
    /// A gateway call needs an operator decision before the turn can go on
    AwaitApproval { request_id: String },
    /// The service reported that the response failed
    UpstreamFailed { message: String },
}

/// An event that could not be applied. The step is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("`{kind}` references item {item_id:?} with no matching open item")]
    UnmatchedItem {
        kind: String,
        item_id: Option<String>,
    },
}

impl ReconcileError {
    fn unmatched(event: &ServerEvent, item_id: Option<&str>) -> Self {
        ReconcileError::UnmatchedItem {
            kind: event.kind().to_string(),
            item_id: item_id.map(str::to_string),
        }
    }
}

/// Per-response reconciliation state
///
/// A fresh reconciler is used for every request, so accumulators never
/// leak from one response into the next.
#[derive(Debug, Default)]
pub struct Reconciler {
    summary: String,
    open_summary: Option<usize>,
    response_id: Option<String>,
    /// Wire placeholder written at item-added for each output message
    message_wire: HashMap<String, usize>,
    finished_items: HashSet<String>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the response being reconciled, once announced
    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }

    /// Apply one event
    #[allow(clippy::too_many_lines)]
    pub fn apply(
        &mut self,
        store: &mut ConversationStore,
        event: &ServerEvent,
    ) -> Result<Vec<Effect>, ReconcileError> {
        match event {
            ServerEvent::ResponseCreated(envelope) => {
                if envelope.response.id.is_some() {
                    self.response_id.clone_from(&envelope.response.id);
                }
                Ok(vec![])
            }
            ServerEvent::ResponseCompleted(envelope) => Ok(self.response_completed(store, &envelope.response)),
            ServerEvent::ResponseFailed(envelope) => {
                let message = envelope
                    .response
                    .error
                    .as_ref()
                    .map_or_else(|| "response failed".to_string(), |e| e.message.clone());
                Ok(vec![Effect::UpstreamFailed { message }])
            }
            ServerEvent::Error(error) => Ok(vec![Effect::UpstreamFailed {
                message: error.message.clone(),
            }]),

            ServerEvent::ReasoningSummaryDelta(delta) => {
                self.summary_delta(store, delta);
                Ok(vec![])
            }
            ServerEvent::ReasoningSummaryDone(done) => self.summary_done(store, event, done),

            ServerEvent::OutputTextDelta(delta) => {
                self.text_delta(store, delta);
                Ok(vec![])
            }
            ServerEvent::AnnotationAdded(added) => Self::annotation_added(store, event, added),

            ServerEvent::OutputItemAdded(envelope) => {
                self.item_added(store, envelope);
                Ok(vec![])
            }
            ServerEvent::OutputItemDone(envelope) => self.item_done(store, event, envelope),

            ServerEvent::FunctionCallArgumentsDelta(delta) => {
                Self::arguments_delta(store, event, ToolKind::Function, delta)
            }
            ServerEvent::McpCallArgumentsDelta(delta) => {
                Self::arguments_delta(store, event, ToolKind::Mcp, delta)
            }
            ServerEvent::FunctionCallArgumentsDone(done) => {
                Self::arguments_done(store, event, ToolKind::Function, done)
            }
            ServerEvent::McpCallArgumentsDone(done) => {
                Self::arguments_done(store, event, ToolKind::Mcp, done)
            }

            ServerEvent::WebSearchProgress(progress) => Self::web_search_progress(store, event, progress),
            ServerEvent::WebSearchQuery(update) => {
                let index = locate_call(store, ToolKind::WebSearch, update.item_id.as_deref())
                    .ok_or_else(|| ReconcileError::unmatched(event, update.item_id.as_deref()))?;
                update_call(store, index, |call| {
                    call.current_query = Some(update.query.clone());
                    call.record_query(&update.query);
                });
                Ok(vec![])
            }
            ServerEvent::FileSearchProgress(progress) => {
                let index = locate_call(store, ToolKind::FileSearch, progress.item_id.as_deref())
                    .ok_or_else(|| ReconcileError::unmatched(event, progress.item_id.as_deref()))?;
                update_call(store, index, |call| match progress.phase {
                    ProgressPhase::InProgress => {}
                    ProgressPhase::Working => {
                        call.set_status(ToolStatus::Searching);
                    }
                    ProgressPhase::Completed => {
                        if let Some(output) = &progress.output {
                            call.output = Some(output_text(output));
                        }
                        call.set_status(ToolStatus::Completed);
                    }
                });
                Ok(vec![])
            }

            ServerEvent::CodeDelta(delta) => {
                let index = locate_open_code_call(store, delta.item_id.as_deref())
                    .ok_or_else(|| ReconcileError::unmatched(event, delta.item_id.as_deref()))?;
                update_call(store, index, |call| call.code.push_str(&delta.delta));
                Ok(vec![])
            }
            ServerEvent::CodeDone(done) => {
                let index = locate_open_code_call(store, done.item_id.as_deref())
                    .ok_or_else(|| ReconcileError::unmatched(event, done.item_id.as_deref()))?;
                update_call(store, index, |call| call.code.clone_from(&done.code));
                Ok(vec![])
            }
            ServerEvent::CodeInterpreterProgress(progress) => {
                let index = locate_call(store, ToolKind::CodeInterpreter, progress.item_id.as_deref())
                    .ok_or_else(|| ReconcileError::unmatched(event, progress.item_id.as_deref()))?;
                if progress.phase == ProgressPhase::Completed {
                    update_call(store, index, |call| call.set_status(ToolStatus::Completed));
                }
                Ok(vec![])
            }

            ServerEvent::Unknown { kind } => {
                tracing::trace!(kind = %kind, "Ignoring unhandled event");
                Ok(vec![])
            }
        }
    }

    // ------------------------------------------------------------------
    // Reasoning summaries
    // ------------------------------------------------------------------

    fn summary_delta(&mut self, store: &mut ConversationStore, delta: &ItemDelta) {
        store.set_assistant_loading(false);
        self.summary.push_str(&delta.delta);

        let open = self.open_summary.filter(|&index| {
            store
                .item(index)
                .and_then(Item::as_message)
                .is_some_and(|m| m.is_summary && m.id == delta.item_id)
        });

        match open {
            Some(index) => {
                let text = self.summary.clone();
                store.update_item(index, |item| {
                    if let Item::Message(message) = item {
                        message.output_part_mut().text = text;
                    }
                });
            }
            None => {
                let message = MessageItem::summary(delta.item_id.clone(), self.summary.clone());
                self.open_summary = Some(store.push_item(Item::Message(message)));
            }
        }
    }

    fn summary_done(
        &mut self,
        store: &mut ConversationStore,
        event: &ServerEvent,
        done: &SummaryDone,
    ) -> Result<Vec<Effect>, ReconcileError> {
        let Some(index) = self.open_summary.take() else {
            return Err(ReconcileError::unmatched(event, done.item_id.as_deref()));
        };
        let text = done.text.clone().unwrap_or_else(|| std::mem::take(&mut self.summary));
        self.summary.clear();

        store.update_item(index, |item| {
            if let Item::Message(message) = item {
                message.output_part_mut().text.clone_from(&text);
            }
        });
        if !text.is_empty() {
            store.push_wire(WireItem::assistant_text(text));
        }
        Ok(vec![])
    }

    // ------------------------------------------------------------------
    // Output text
    // ------------------------------------------------------------------

    fn text_delta(&mut self, store: &mut ConversationStore, delta: &TextDelta) {
        store.set_assistant_loading(false);

        if let Some(index) = locate_answer(store, delta.item_id.as_deref()) {
            store.update_item(index, |item| {
                if let Item::Message(message) = item {
                    if message.id.is_none() {
                        message.id.clone_from(&delta.item_id);
                    }
                    message.output_part_mut().text.push_str(&delta.delta);
                }
            });
        } else {
            let message = MessageItem::assistant(delta.item_id.clone(), delta.delta.clone());
            store.push_item(Item::Message(message));
        }
    }

    fn annotation_added(
        store: &mut ConversationStore,
        event: &ServerEvent,
        added: &AnnotationAdded,
    ) -> Result<Vec<Effect>, ReconcileError> {
        let Some(raw) = &added.annotation else {
            return Ok(vec![]);
        };
        let index = locate_answer(store, added.item_id.as_deref())
            .ok_or_else(|| ReconcileError::unmatched(event, added.item_id.as_deref()))?;
        let annotation = Annotation::from_value(raw);
        let produced = annotation.container_file();

        store.update_item(index, |item| {
            if let Item::Message(message) = item {
                message.output_part_mut().annotations.push(annotation);
            }
        });

        // Files cited from a container belong to the latest code execution
        if let Some(file) = produced {
            let code_call = store.rposition(|item| {
                item.as_tool_call()
                    .is_some_and(|c| c.kind == ToolKind::CodeInterpreter)
            });
            if let Some(code_index) = code_call {
                update_call(store, code_index, |call| {
                    if !call.files.iter().any(|f| f.file_id == file.file_id) {
                        call.files.push(file);
                    }
                });
            }
        }
        Ok(vec![])
    }

    // ------------------------------------------------------------------
    // Output items
    // ------------------------------------------------------------------

    fn item_added(&mut self, store: &mut ConversationStore, envelope: &ItemEnvelope) {
        store.set_assistant_loading(false);

        if let Some(id) = envelope.item_id() {
            if store.position_by_id(id).is_some() {
                tracing::debug!(item_id = %id, "Item already present, ignoring repeat");
                return;
            }
        }
        let id = envelope.item_id().map(str::to_string);

        if envelope.item_type() == "message" {
            let mut message = MessageItem::assistant(id, message_text(&envelope.item));
            message.output_part_mut().annotations = message_annotations(&envelope.item);
            let text = message.text();
            store.push_item(Item::Message(message));
            let wire_index = store.push_wire(WireItem::assistant_text(text));
            if let Some(id) = envelope.item_id() {
                self.message_wire.insert(id.to_string(), wire_index);
            }
            return;
        }

        let Some(kind) = ToolKind::from_item_type(envelope.item_type()) else {
            return;
        };

        let mut call = ToolCallItem::new(kind, id);
        call.name = envelope.str_field("name").map(str::to_string);
        call.server_label = envelope.str_field("server_label").map(str::to_string);
        if let Some(arguments) = envelope.str_field("arguments") {
            call.arguments = arguments.to_string();
            reparse_arguments(&mut call);
        }
        store.push_item(Item::ToolCall(call));
    }

    #[allow(clippy::too_many_lines)]
    fn item_done(
        &mut self,
        store: &mut ConversationStore,
        event: &ServerEvent,
        envelope: &ItemEnvelope,
    ) -> Result<Vec<Effect>, ReconcileError> {
        if let Some(id) = envelope.item_id() {
            if !self.finished_items.insert(id.to_string()) {
                tracing::debug!(item_id = %id, "Item already finished, ignoring repeat");
                return Ok(vec![]);
            }
        }

        if envelope.item_type() == "message" {
            self.message_done(store, envelope);
            return Ok(vec![]);
        }

        store.push_wire(WireItem::Raw(envelope.item.clone()));

        let Some(kind) = ToolKind::from_item_type(envelope.item_type()) else {
            return Ok(vec![]);
        };
        let item_id = envelope.item_id();
        let index = locate_call(store, kind, item_id)
            .ok_or_else(|| ReconcileError::unmatched(event, item_id))?;

        let item = &envelope.item;
        let failed = item_failed(item);
        let id = update_call(store, index, |call| {
            if let Some(call_id) = item.get("call_id").and_then(Value::as_str) {
                call.call_id = Some(call_id.to_string());
            }
            if call.name.is_none() {
                call.name = item.get("name").and_then(Value::as_str).map(str::to_string);
            }

            match kind {
                ToolKind::Function => {
                    if !call.status.is_terminal() {
                        if let Some(arguments) = item.get("arguments").and_then(Value::as_str) {
                            call.arguments = arguments.to_string();
                        }
                        finalize_arguments(call);
                    }
                }
                ToolKind::Mcp => {
                    if !call.arguments_final && !call.status.is_terminal() {
                        if let Some(arguments) = item.get("arguments").and_then(Value::as_str) {
                            call.arguments = arguments.to_string();
                            reparse_arguments(call);
                        }
                    }
                    call.output = item
                        .get("error")
                        .filter(|e| !e.is_null())
                        .or_else(|| item.get("output"))
                        .filter(|o| !o.is_null())
                        .map(output_text);
                    call.set_status(if failed { ToolStatus::Failed } else { ToolStatus::Completed });
                }
                ToolKind::CodeInterpreter => {
                    if call.code.is_empty() {
                        if let Some(code) = item.get("code").and_then(Value::as_str) {
                            call.code = code.to_string();
                        }
                    }
                    if let Some(logs) = code_logs(item) {
                        call.output = Some(logs);
                    }
                    call.set_status(if failed { ToolStatus::Failed } else { ToolStatus::Completed });
                }
                ToolKind::FileSearch => {
                    if call.output.is_none() {
                        call.output = item.get("results").filter(|r| !r.is_null()).map(output_text);
                    }
                    call.set_status(if failed { ToolStatus::Failed } else { ToolStatus::Completed });
                }
                ToolKind::WebSearch => {
                    if let Some(query) = call.current_query.take() {
                        call.record_query(&query);
                    }
                    call.set_status(if failed { ToolStatus::Failed } else { ToolStatus::Completed });
                }
            }
            call.id.clone()
        })
        .flatten();

        match (kind, id) {
            (ToolKind::Function, Some(item_id)) => Ok(vec![Effect::InvokeTool { item_id }]),
            _ => Ok(vec![]),
        }
    }

    fn message_done(&mut self, store: &mut ConversationStore, envelope: &ItemEnvelope) {
        let raw = WireItem::Raw(envelope.item.clone());
        let placeholder = envelope.item_id().and_then(|id| self.message_wire.remove(id));

        match placeholder {
            Some(wire_index) => {
                store.replace_wire(wire_index, raw);
            }
            None => {
                store.push_wire(raw);
            }
        }

        // Messages that arrive whole, with no text deltas, still get their text
        if let Some(index) = envelope.item_id().and_then(|id| store.position_by_id(id)) {
            let text = message_text(&envelope.item);
            let needs_text = store
                .item(index)
                .and_then(Item::as_message)
                .is_some_and(|m| m.text().is_empty() && !text.is_empty());
            if needs_text {
                store.update_item(index, |item| {
                    if let Item::Message(message) = item {
                        message.output_part_mut().text = text;
                    }
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Arguments
    // ------------------------------------------------------------------

    fn arguments_delta(
        store: &mut ConversationStore,
        event: &ServerEvent,
        kind: ToolKind,
        delta: &ItemDelta,
    ) -> Result<Vec<Effect>, ReconcileError> {
        let index = locate_call(store, kind, delta.item_id.as_deref())
            .ok_or_else(|| ReconcileError::unmatched(event, delta.item_id.as_deref()))?;
        update_call(store, index, |call| {
            // Late deltas cannot reopen finished arguments
            if call.arguments_final || call.status.is_terminal() {
                return;
            }
            call.arguments.push_str(&delta.delta);
            reparse_arguments(call);
        });
        Ok(vec![])
    }

    fn arguments_done(
        store: &mut ConversationStore,
        event: &ServerEvent,
        kind: ToolKind,
        done: &ArgumentsDone,
    ) -> Result<Vec<Effect>, ReconcileError> {
        let index = locate_call(store, kind, done.item_id.as_deref())
            .ok_or_else(|| ReconcileError::unmatched(event, done.item_id.as_deref()))?;

        let already_final = store
            .item(index)
            .and_then(Item::as_tool_call)
            .is_some_and(|c| c.arguments_final || c.status.is_terminal());
        if already_final {
            tracing::debug!(item_id = ?done.item_id, "Arguments already final, ignoring repeat");
            return Ok(vec![]);
        }

        update_call(store, index, |call| {
            call.arguments.clone_from(&done.arguments);
            finalize_arguments(call);
        });
        Ok(vec![])
    }

    fn web_search_progress(
        store: &mut ConversationStore,
        event: &ServerEvent,
        progress: &SearchProgress,
    ) -> Result<Vec<Effect>, ReconcileError> {
        let index = locate_call(store, ToolKind::WebSearch, progress.item_id.as_deref())
            .ok_or_else(|| ReconcileError::unmatched(event, progress.item_id.as_deref()))?;

        update_call(store, index, |call| match progress.phase {
            ProgressPhase::InProgress => {
                let seeded = call
                    .parsed_arguments
                    .get("query")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                if seeded.is_some() {
                    call.current_query = seeded;
                }
            }
            ProgressPhase::Working => {
                call.set_status(ToolStatus::Searching);
                if let Some(query) = &progress.query {
                    call.current_query = Some(query.clone());
                    call.record_query(query);
                }
            }
            ProgressPhase::Completed => {
                if let Some(output) = &progress.output {
                    call.output = Some(output_text(output));
                }
                call.set_status(ToolStatus::Completed);
                if let Some(query) = call.current_query.take() {
                    call.record_query(&query);
                }
            }
        });
        Ok(vec![])
    }

    // ------------------------------------------------------------------
    // Completion
    // ------------------------------------------------------------------

    fn response_completed(&mut self, store: &mut ConversationStore, response: &ResponseBody) -> Vec<Effect> {
        if response.id.is_some() {
            self.response_id.clone_from(&response.id);
        }

        let mut effects = Vec::new();
        for output in &response.output {
            let kind = output.get("type").and_then(Value::as_str).unwrap_or_default();
            let Some(id) = output.get("id").and_then(Value::as_str) else {
                continue;
            };
            if store.position_by_id(id).is_some() {
                continue;
            }
            let server_label = output
                .get("server_label")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            match kind {
                "mcp_list_tools" => {
                    store.push_item(Item::ToolCatalog(ToolCatalogItem {
                        id: id.to_string(),
                        server_label,
                        tools: tool_descriptors(output),
                    }));
                }
                "mcp_approval_request" => {
                    store.push_item(Item::ApprovalRequest(ApprovalRequestItem {
                        id: id.to_string(),
                        server_label,
                        name: output
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        arguments: output
                            .get("arguments")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        decision: None,
                    }));
                    effects.push(Effect::AwaitApproval {
                        request_id: id.to_string(),
                    });
                }
                _ => {}
            }
        }
        effects
    }
}

// ----------------------------------------------------------------------
// Matching
// ----------------------------------------------------------------------

/// Find the tool call an event refers to, adopting `item_id` on a
/// fallback match.
fn locate_call(store: &mut ConversationStore, kind: ToolKind, item_id: Option<&str>) -> Option<usize> {
    if let Some(id) = item_id {
        if let Some(index) =
            store.rposition(|item| call_of_kind(item, kind).is_some_and(|c| c.id.as_deref() == Some(id)))
        {
            return Some(index);
        }
    }

    let index = store.rposition(|item| {
        call_of_kind(item, kind)
            .is_some_and(|c| !c.status.is_terminal() && (item_id.is_none() || c.id.is_none()))
    })?;
    if let Some(id) = item_id {
        update_call(store, index, |call| call.id = Some(id.to_string()));
    }
    Some(index)
}

fn call_of_kind(item: &Item, kind: ToolKind) -> Option<&ToolCallItem> {
    item.as_tool_call().filter(|c| c.kind == kind)
}

fn locate_open_code_call(store: &mut ConversationStore, item_id: Option<&str>) -> Option<usize> {
    let index = locate_call(store, ToolKind::CodeInterpreter, item_id)?;
    let open = store
        .item(index)
        .and_then(Item::as_tool_call)
        .is_some_and(|c| c.status != ToolStatus::Completed);
    open.then_some(index)
}

fn is_answer(item: &Item) -> bool {
    item.as_message()
        .is_some_and(|m| m.role == Role::Assistant && !m.is_summary)
}

/// Find the assistant message output text belongs to
fn locate_answer(store: &ConversationStore, item_id: Option<&str>) -> Option<usize> {
    if let Some(id) = item_id {
        if let Some(index) = store.rposition(|item| is_answer(item) && item.id() == Some(id)) {
            return Some(index);
        }
    }
    let last = store.items().len().checked_sub(1)?;
    let open = store
        .item(last)
        .is_some_and(|item| is_answer(item) && (item_id.is_none() || item.id().is_none()));
    open.then_some(last)
}

fn update_call<R>(
    store: &mut ConversationStore,
    index: usize,
    f: impl FnOnce(&mut ToolCallItem) -> R,
) -> Option<R> {
    store
        .update_item(index, |item| match item {
            Item::ToolCall(call) => Some(f(call)),
            _ => None,
        })
        .flatten()
}

// ----------------------------------------------------------------------
// Item helpers
// ----------------------------------------------------------------------

/// Best-effort parse of streaming arguments; failures keep the last view.
fn reparse_arguments(call: &mut ToolCallItem) {
    if call.arguments.trim().is_empty() {
        return;
    }
    match partial_json::decode(&call.arguments) {
        Ok(value) => call.parsed_arguments = value,
        Err(e) => tracing::trace!(error = %e, "Arguments not yet decodable"),
    }
}

/// Final arguments must be complete JSON.
///
/// A gateway call stays open: its outcome arrives with item-done.
fn finalize_arguments(call: &mut ToolCallItem) {
    call.arguments_final = true;
    let text = if call.arguments.trim().is_empty() { "{}" } else { &call.arguments };
    match serde_json::from_str::<Value>(text) {
        Ok(value) => {
            call.parsed_arguments = value;
            if call.kind != ToolKind::Mcp {
                call.set_status(ToolStatus::Completed);
            }
        }
        Err(e) => {
            tracing::warn!(item_id = ?call.id, error = %e, "Final arguments are not valid JSON");
            call.set_status(ToolStatus::Failed);
        }
    }
}

fn item_failed(item: &Value) -> bool {
    let status = item.get("status").and_then(Value::as_str);
    let error = item.get("error").is_some_and(|e| !e.is_null());
    error || matches!(status, Some("failed" | "incomplete"))
}

fn output_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn content_parts(item: &Value) -> impl Iterator<Item = &Value> {
    item.get("content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn message_text(item: &Value) -> String {
    content_parts(item)
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect()
}

fn message_annotations(item: &Value) -> Vec<Annotation> {
    content_parts(item)
        .filter_map(|part| part.get("annotations").and_then(Value::as_array))
        .flatten()
        .map(Annotation::from_value)
        .collect()
}

fn code_logs(item: &Value) -> Option<String> {
    let logs: Vec<&str> = item
        .get("outputs")
        .and_then(Value::as_array)?
        .iter()
        .filter(|o| o.get("type").and_then(Value::as_str) == Some("logs"))
        .filter_map(|o| o.get("logs").and_then(Value::as_str))
        .collect();
    (!logs.is_empty()).then(|| logs.join("\n"))
}

fn tool_descriptors(item: &Value) -> Vec<ToolDescriptor> {
    item.get("tools")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|tool| {
            Some(ToolDescriptor {
                name: tool.get("name")?.as_str()?.to_string(),
                description: tool
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .collect()
}
