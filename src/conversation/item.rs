//! Display items
//!
//! Items are created on first reference by a stream event and mutated in
//! place as later events for the same identity arrive.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Developer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    InputText,
    OutputText,
}

/// One unit of conversation state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    Message(MessageItem),
    ToolCall(ToolCallItem),
    ToolCatalog(ToolCatalogItem),
    ApprovalRequest(ApprovalRequestItem),
}

impl Item {
    /// Service-assigned identity, if known yet
    pub fn id(&self) -> Option<&str> {
        match self {
            Item::Message(m) => m.id.as_deref(),
            Item::ToolCall(t) => t.id.as_deref(),
            Item::ToolCatalog(c) => Some(&c.id),
            Item::ApprovalRequest(a) => Some(&a.id),
        }
    }

    pub fn as_message(&self) -> Option<&MessageItem> {
        match self {
            Item::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCallItem> {
        match self {
            Item::ToolCall(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageItem {
    pub id: Option<String>,
    pub role: Role,
    pub content: Vec<ContentPart>,
    /// Transient reasoning narration rather than a final answer
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_summary: bool,
}

impl MessageItem {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Role::User,
            content: vec![ContentPart::new(ContentKind::InputText, text)],
            is_summary: false,
        }
    }

    pub fn assistant(id: Option<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: vec![ContentPart::new(ContentKind::OutputText, text)],
            is_summary: false,
        }
    }

    pub fn summary(id: Option<String>, text: impl Into<String>) -> Self {
        Self {
            is_summary: true,
            ..Self::assistant(id, text)
        }
    }

    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The part streamed text lands in, created on demand
    pub fn output_part_mut(&mut self) -> &mut ContentPart {
        if self.content.is_empty() {
            self.content.push(ContentPart::new(ContentKind::OutputText, ""));
        }
        let last = self.content.len() - 1;
        &mut self.content[last]
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.content.iter().flat_map(|p| p.annotations.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl ContentPart {
    pub fn new(kind: ContentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            annotations: Vec::new(),
        }
    }
}

/// A citation attached to output text
///
/// The service is inconsistent about field casing, so both `file_id` and
/// `fileId` (likewise `container_id`/`containerId`) are accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub kind: String,
    pub file_id: Option<String>,
    pub container_id: Option<String>,
    pub filename: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub index: Option<u64>,
}

impl Annotation {
    pub fn from_value(value: &Value) -> Self {
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| value.get(*k).and_then(Value::as_str))
                .map(str::to_string)
        };
        Self {
            kind: text(&["type"]).unwrap_or_default(),
            file_id: text(&["file_id", "fileId"]),
            container_id: text(&["container_id", "containerId"]),
            filename: text(&["filename"]),
            url: text(&["url"]),
            title: text(&["title"]),
            index: value.get("index").and_then(Value::as_u64),
        }
    }

    /// A file produced inside a code execution container
    pub fn container_file(&self) -> Option<FileRef> {
        if self.kind != "container_file_citation" {
            return None;
        }
        Some(FileRef {
            file_id: self.file_id.clone()?,
            container_id: self.container_id.clone(),
            filename: self.filename.clone(),
        })
    }
}

/// Tool call sub-kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    WebSearch,
    FileSearch,
    /// Resolved locally through the tool registry
    Function,
    /// Remote procedure through a gateway
    Mcp,
    CodeInterpreter,
}

impl ToolKind {
    /// Map an output item `type` to a tool kind
    pub fn from_item_type(item_type: &str) -> Option<Self> {
        match item_type {
            "web_search_call" => Some(ToolKind::WebSearch),
            "file_search_call" => Some(ToolKind::FileSearch),
            "function_call" => Some(ToolKind::Function),
            "mcp_call" => Some(ToolKind::Mcp),
            "code_interpreter_call" => Some(ToolKind::CodeInterpreter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    InProgress,
    Searching,
    Completed,
    Failed,
}

impl ToolStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ToolStatus::Completed | ToolStatus::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            ToolStatus::InProgress => 0,
            ToolStatus::Searching => 1,
            ToolStatus::Completed | ToolStatus::Failed => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRef {
    pub file_id: String,
    pub container_id: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallItem {
    pub kind: ToolKind,
    pub status: ToolStatus,
    pub id: Option<String>,
    /// Correlation id for the function output, known at item-done
    pub call_id: Option<String>,
    pub name: Option<String>,
    /// Raw argument text as streamed
    pub arguments: String,
    /// Best-effort structured view of `arguments`
    pub parsed_arguments: Value,
    /// Set once the final argument text has arrived
    pub arguments_final: bool,
    pub output: Option<String>,
    pub server_label: Option<String>,
    pub code: String,
    pub files: Vec<FileRef>,
    pub search_queries: Vec<String>,
    pub current_query: Option<String>,
}

impl ToolCallItem {
    pub fn new(kind: ToolKind, id: Option<String>) -> Self {
        Self {
            kind,
            status: ToolStatus::InProgress,
            id,
            call_id: None,
            name: None,
            arguments: String::new(),
            parsed_arguments: Value::Object(serde_json::Map::new()),
            arguments_final: false,
            output: None,
            server_label: None,
            code: String::new(),
            files: Vec::new(),
            search_queries: Vec::new(),
            current_query: None,
        }
    }

    /// Move forward in `in_progress → searching* → completed|failed`.
    ///
    /// Returns false (and leaves the status alone) for any step backwards or
    /// out of a terminal state.
    pub fn set_status(&mut self, status: ToolStatus) -> bool {
        if self.status.is_terminal() || status.rank() < self.status.rank() {
            return false;
        }
        self.status = status;
        true
    }

    /// Record a search query in the history if it is new
    pub fn record_query(&mut self, query: &str) {
        if !self.search_queries.iter().any(|q| q == query) {
            self.search_queries.push(query.to_string());
        }
    }
}

/// Tools advertised by a gateway
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCatalogItem {
    pub id: String,
    pub server_label: String,
    pub tools: Vec<ToolDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: Option<String>,
}

/// A gateway call waiting on an operator decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalRequestItem {
    pub id: String,
    pub server_label: String,
    pub name: String,
    pub arguments: String,
    /// `Some(approve)` once the operator has answered
    pub decision: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_is_monotonic() {
        let mut call = ToolCallItem::new(ToolKind::WebSearch, Some("ws_1".into()));
        assert!(call.set_status(ToolStatus::Searching));
        assert!(!call.set_status(ToolStatus::InProgress));
        assert_eq!(call.status, ToolStatus::Searching);
        assert!(call.set_status(ToolStatus::Searching));
        assert!(call.set_status(ToolStatus::Completed));
        assert!(!call.set_status(ToolStatus::Failed));
        assert!(!call.set_status(ToolStatus::Searching));
        assert_eq!(call.status, ToolStatus::Completed);
    }

    #[test]
    fn test_record_query_dedupes() {
        let mut call = ToolCallItem::new(ToolKind::WebSearch, None);
        call.record_query("rust");
        call.record_query("tokio");
        call.record_query("rust");
        assert_eq!(call.search_queries, vec!["rust", "tokio"]);
    }

    #[test]
    fn test_annotation_accepts_both_casings() {
        let snake = Annotation::from_value(&json!({
            "type": "container_file_citation",
            "file_id": "f1",
            "container_id": "c1",
            "filename": "plot.png"
        }));
        let camel = Annotation::from_value(&json!({
            "type": "container_file_citation",
            "fileId": "f1",
            "containerId": "c1",
            "filename": "plot.png"
        }));
        assert_eq!(snake, camel);
        assert_eq!(
            snake.container_file(),
            Some(FileRef {
                file_id: "f1".into(),
                container_id: Some("c1".into()),
                filename: Some("plot.png".into()),
            })
        );
    }

    #[test]
    fn test_url_citation_is_not_a_file() {
        let annotation = Annotation::from_value(&json!({
            "type": "url_citation",
            "url": "https://example.com",
            "title": "Example"
        }));
        assert_eq!(annotation.url.as_deref(), Some("https://example.com"));
        assert_eq!(annotation.container_file(), None);
    }

    #[test]
    fn test_tool_kind_from_item_type() {
        assert_eq!(ToolKind::from_item_type("function_call"), Some(ToolKind::Function));
        assert_eq!(ToolKind::from_item_type("mcp_call"), Some(ToolKind::Mcp));
        assert_eq!(ToolKind::from_item_type("reasoning"), None);
    }

    #[test]
    fn test_summary_message_serializes_flag() {
        let value = serde_json::to_value(Item::Message(MessageItem::summary(Some("rs_1".into()), "thinking"))).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["is_summary"], true);
        let value = serde_json::to_value(Item::Message(MessageItem::user("hi"))).unwrap();
        assert!(value.get("is_summary").is_none());
    }
}
