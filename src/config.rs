//! Environment configuration
//!
//! Both sides read plain environment variables. Values that fail to parse
//! are logged and replaced by their defaults.

use crate::models::DEFAULT_MODEL;
use crate::request::ReasoningEffort;
use crate::runtime::TurnSettings;
use crate::tools::{FileSearchConfig, McpConfig, ToolsConfig, UserLocation, WebSearchConfig};
use std::str::FromStr;

/// Instruction placed ahead of the conversation on every request
pub const DEVELOPER_PROMPT: &str = "You are a helpful assistant helping users with their queries. \
If they need up to date information, use the web search tool. \
If they ask about their own documents, use the file search tool. \
For calculations or data work, use the code interpreter. \
Call a function tool only when it clearly helps answer the request.";

pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000/api/turn_response";
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_RELAY_PORT: u16 = 3000;
pub const DEFAULT_MAX_CONTINUATIONS: u32 = 8;

/// How earlier turns are carried into a new request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContextMode {
    /// Resend the whole wire-context every time
    #[default]
    Full,
    /// Send only new client items plus `previous_response_id`
    Chained,
}

impl FromStr for ContextMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(ContextMode::Full),
            "chained" => Ok(ContextMode::Chained),
            other => Err(format!("unknown context mode `{other}`")),
        }
    }
}

/// Configuration for the chat client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub relay_url: String,
    pub model: String,
    pub reasoning_effort: ReasoningEffort,
    pub context_mode: ContextMode,
    pub max_continuations: u32,
    pub tools: ToolsConfig,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str, default: bool| get(key).map_or(default, |v| parse_flag(key, &v, default));

        let web_search = flag("CHAT_WEB_SEARCH", false).then(|| WebSearchConfig {
            user_location: UserLocation {
                country: get("CHAT_WEB_SEARCH_COUNTRY").unwrap_or_default(),
                region: get("CHAT_WEB_SEARCH_REGION").unwrap_or_default(),
                city: get("CHAT_WEB_SEARCH_CITY").unwrap_or_default(),
            },
        });

        let mcp = match (get("CHAT_MCP_SERVER_URL"), get("CHAT_MCP_SERVER_LABEL")) {
            (Some(server_url), Some(server_label)) => Some(McpConfig {
                server_label,
                server_url,
                skip_approval: flag("CHAT_MCP_SKIP_APPROVAL", false),
                allowed_tools: get("CHAT_MCP_ALLOWED_TOOLS")
                    .map(|list| McpConfig::parse_allowed_tools(&list))
                    .unwrap_or_default(),
            }),
            _ => None,
        };

        Self {
            relay_url: get("CHAT_RELAY_URL").unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
            model: get("CHAT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            reasoning_effort: parse_or_default("CHAT_REASONING_EFFORT", get("CHAT_REASONING_EFFORT")),
            context_mode: parse_or_default("CHAT_CONTEXT_MODE", get("CHAT_CONTEXT_MODE")),
            max_continuations: get("CHAT_MAX_CONTINUATIONS")
                .map_or(DEFAULT_MAX_CONTINUATIONS, |v| {
                    parse_or_default_value("CHAT_MAX_CONTINUATIONS", &v, DEFAULT_MAX_CONTINUATIONS)
                }),
            tools: ToolsConfig {
                web_search,
                file_search: get("CHAT_FILE_SEARCH_VECTOR_STORE")
                    .map(|vector_store_id| FileSearchConfig { vector_store_id }),
                code_interpreter: flag("CHAT_CODE_INTERPRETER", false),
                functions: flag("CHAT_FUNCTIONS", true),
                mcp,
            },
        }
    }

    /// Settings for the turn driver
    pub fn turn_settings(&self) -> TurnSettings {
        TurnSettings {
            model: self.model.clone(),
            reasoning_effort: self.reasoning_effort,
            context_mode: self.context_mode,
            max_continuations: self.max_continuations,
            tools: self.tools.clone(),
            developer_prompt: DEVELOPER_PROMPT.to_string(),
        }
    }
}

/// Configuration for the relay server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub port: u16,
    /// Used when a request does not name a model
    pub default_model: String,
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string()),
            port: get("RELAY_PORT").map_or(DEFAULT_RELAY_PORT, |v| {
                parse_or_default_value("RELAY_PORT", &v, DEFAULT_RELAY_PORT)
            }),
            default_model: get("DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    /// Upstream Responses endpoint
    pub fn responses_url(&self) -> String {
        format!("{}/responses", self.base_url.trim_end_matches('/'))
    }
}

fn parse_flag(key: &str, value: &str, default: bool) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            tracing::warn!(key = %key, value = %value, "Ignoring unrecognized flag value");
            default
        }
    }
}

fn parse_or_default<T>(key: &str, value: Option<String>) -> T
where
    T: FromStr + Default,
    T::Err: std::fmt::Display,
{
    value.map_or_else(T::default, |v| parse_or_default_value(key, &v, T::default()))
}

fn parse_or_default_value<T>(key: &str, value: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().unwrap_or_else(|e| {
        tracing::warn!(key = %key, value = %value, error = %e, "Ignoring invalid setting");
        default
    })
}
