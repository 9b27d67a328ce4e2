//! Outbound tool specification list
//!
//! Built fresh for every request from the enabled tool families, the
//! selected model and the local registry.

use super::ToolRegistry;
use crate::models;
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolsConfig {
    pub web_search: Option<WebSearchConfig>,
    pub file_search: Option<FileSearchConfig>,
    pub code_interpreter: bool,
    /// Advertise the local function tools
    pub functions: bool,
    pub mcp: Option<McpConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebSearchConfig {
    pub user_location: UserLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserLocation {
    pub country: String,
    pub region: String,
    pub city: String,
}

impl UserLocation {
    pub fn is_empty(&self) -> bool {
        self.country.is_empty() && self.region.is_empty() && self.city.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSearchConfig {
    pub vector_store_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McpConfig {
    pub server_label: String,
    pub server_url: String,
    pub skip_approval: bool,
    pub allowed_tools: Vec<String>,
}

impl McpConfig {
    /// Parse a comma separated tool list, dropping blanks
    pub fn parse_allowed_tools(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl ToolsConfig {
    /// Tool specifications for one request
    pub fn build(&self, model: &str, registry: &ToolRegistry) -> Vec<Value> {
        let mut tools = Vec::new();

        if let Some(web) = &self.web_search {
            // Research models only accept the preview tool, without location
            if models::is_research_model(model) {
                tools.push(json!({ "type": "web_search_preview" }));
            } else {
                let mut spec = json!({ "type": "web_search" });
                if !web.user_location.is_empty() {
                    spec["user_location"] = location_spec(&web.user_location);
                }
                tools.push(spec);
            }
        }

        if let Some(files) = &self.file_search {
            tools.push(json!({
                "type": "file_search",
                "vector_store_ids": [files.vector_store_id],
            }));
        }

        if self.code_interpreter {
            tools.push(json!({ "type": "code_interpreter", "container": { "type": "auto" } }));
        }

        if self.functions {
            tools.extend(registry.definitions().into_iter().map(|def| {
                let required: Vec<&String> = def.parameters.keys().collect();
                json!({
                    "type": "function",
                    "name": def.name,
                    "description": def.description,
                    "parameters": {
                        "type": "object",
                        "properties": def.parameters,
                        "required": required,
                        "additionalProperties": false,
                    },
                    "strict": true,
                })
            }));
        }

        if let Some(mcp) = self.mcp.as_ref().filter(|m| !m.server_url.is_empty() && !m.server_label.is_empty()) {
            let mut spec = json!({
                "type": "mcp",
                "server_label": mcp.server_label,
                "server_url": mcp.server_url,
            });
            if mcp.skip_approval {
                spec["require_approval"] = json!("never");
            }
            if !mcp.allowed_tools.is_empty() {
                spec["allowed_tools"] = json!(mcp.allowed_tools);
            }
            tools.push(spec);
        }

        tools
    }
}

fn location_spec(location: &UserLocation) -> Value {
    let mut spec = json!({ "type": "approximate" });
    for (key, value) in [
        ("country", &location.country),
        ("region", &location.region),
        ("city", &location.city),
    ] {
        if !value.is_empty() {
            spec[key] = json!(value);
        }
    }
    spec
}
