//! Outbound turn request

use crate::conversation::WireItem;
use crate::models;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// One request to the relay endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnRequest {
    pub model: String,
    /// Wire-context items, developer prompt first
    pub messages: Vec<WireItem>,
    pub tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    /// Continue from a stored response instead of resending full context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
}

impl TurnRequest {
    pub fn new(model: impl Into<String>, messages: Vec<WireItem>, tools: Vec<Value>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools,
            reasoning: None,
            previous_response_id: None,
        }
    }

    /// Attach a reasoning effort, only if the model accepts one
    #[must_use]
    pub fn with_reasoning(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning = models::supports_reasoning(&self.model).then_some(Reasoning { effort });
        self
    }

    #[must_use]
    pub fn with_previous_response(mut self, response_id: Option<String>) -> Self {
        self.previous_response_id = response_id;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reasoning {
    pub effort: ReasoningEffort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for ReasoningEffort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            other => Err(format!("unknown reasoning effort `{other}`")),
        }
    }
}
