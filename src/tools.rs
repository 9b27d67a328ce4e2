//! Tool dispatcher
//!
//! Local function tools are looked up by name in a [`ToolRegistry`]. The
//! registry is the only thing the engine knows about them; adding a tool
//! never touches the engine.

mod current_time;
pub mod specs;

pub use current_time::CurrentTimeTool;
pub use specs::{FileSearchConfig, McpConfig, ToolsConfig, UserLocation, WebSearchConfig};

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Trait for locally resolved function tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, as the model will call it
    fn name(&self) -> &str;

    /// Tool description for the model
    fn description(&self) -> String;

    /// JSON schema for each parameter, keyed by parameter name.
    ///
    /// Function specs are strict, so every parameter listed here is required.
    fn parameters(&self) -> Map<String, Value>;

    /// Run the tool. The result is serialized as the function output.
    async fn call(&self, arguments: Value) -> Result<Value, String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no tool registered as `{name}`")]
    UnknownCapability { name: String },
    #[error("tool `{name}` failed: {message}")]
    Handler { name: String, message: String },
}

/// Function definition advertised to the model
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Map<String, Value>,
}

/// Collection of local tools
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any earlier tool with the same name
    #[must_use]
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(Arc::new(tool));
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    /// Get all function definitions for the model
    pub fn definitions(&self) -> Vec<FunctionDefinition> {
        self.tools
            .iter()
            .map(|t| FunctionDefinition {
                name: t.name().to_string(),
                description: t.description(),
                parameters: t.parameters(),
            })
            .collect()
    }

    /// Invoke a tool by name
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, DispatchError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| DispatchError::UnknownCapability {
                name: name.to_string(),
            })?;

        tracing::debug!(tool = %name, "Invoking tool");
        tool.call(arguments)
            .await
            .map_err(|message| DispatchError::Handler {
                name: name.to_string(),
                message,
            })
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|t| t.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> String {
            "Echo the arguments".to_string()
        }

        fn parameters(&self) -> Map<String, Value> {
            let mut params = Map::new();
            params.insert("text".into(), json!({"type": "string"}));
            params
        }

        async fn call(&self, arguments: Value) -> Result<Value, String> {
            match arguments.get("text") {
                Some(text) => Ok(json!({ "echo": text })),
                None => Err("missing text".to_string()),
            }
        }
    }

    #[tokio::test]
    async fn test_invoke_registered_tool() {
        let registry = ToolRegistry::new().with_tool(Echo);
        let result = registry.invoke("echo", json!({"text": "hi"})).await.unwrap();
        assert_eq!(result, json!({"echo": "hi"}));
    }

    #[tokio::test]
    async fn test_unknown_capability() {
        let registry = ToolRegistry::new().with_tool(Echo);
        let err = registry.invoke("nope", json!({})).await.unwrap_err();
        assert_eq!(err, DispatchError::UnknownCapability { name: "nope".into() });
    }

    #[tokio::test]
    async fn test_handler_error() {
        let registry = ToolRegistry::new().with_tool(Echo);
        let err = registry.invoke("echo", json!({})).await.unwrap_err();
        assert!(matches!(err, DispatchError::Handler { ref name, .. } if name == "echo"));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let registry = ToolRegistry::new().with_tool(Echo).with_tool(Echo);
        assert_eq!(registry.definitions().len(), 1);
        assert!(registry.contains("echo"));
        assert_eq!(format!("{registry:?}"), "[\"echo\"]");
    }
}
