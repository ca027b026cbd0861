//! Tools the model can request during a turn
//!
//! A tool is a named external action (music lookup, clock). The registry maps
//! names to implementations and feeds declarations to the model endpoint.
//! Soft failures travel as an `{ "error": ... }` field in an otherwise
//! successful result; hard failures (transport, non-2xx) are `ToolError`s.

pub mod current_time;
pub mod now_playing;
mod relay;

pub use relay::RelayToolExecutor;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("tool endpoint error ({status}): {message}")]
    Endpoint { status: u16, message: String },
}

/// Name and description advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn run(&self, args: &Value) -> Result<Value, ToolError>;
}

/// The engine's view of tool execution: in-process registry or remote relay.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, name: &str, args: &Value) -> Result<Value, ToolError>;
}

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    /// Declarations for the model endpoint, sorted for stable payloads.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        let mut declarations: Vec<ToolDeclaration> = self
            .tools
            .values()
            .map(|t| ToolDeclaration {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect();
        declarations.sort_by(|a, b| a.name.cmp(&b.name));
        declarations
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        match self.tools.get(name) {
            Some(tool) => tool.run(args).await,
            // Unknown names answer with a soft error body, matching the
            // tool endpoint's observable behavior.
            None => Ok(json!({ "error": format!("Unknown tool: {name}") })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::current_time::CurrentTimeTool;
    use super::*;

    #[test]
    fn declarations_are_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(CurrentTimeTool);
        let declarations = registry.declarations();
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].name, "get_current_time");
        assert!(!declarations[0].description.is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_yields_soft_error() {
        let registry = ToolRegistry::new();
        let result = registry.execute("nope", &json!({})).await.unwrap();
        assert_eq!(result["error"], "Unknown tool: nope");
    }

    #[tokio::test]
    async fn registered_tool_is_dispatched() {
        let mut registry = ToolRegistry::new();
        registry.register(CurrentTimeTool);
        let result = registry.execute("get_current_time", &json!({})).await.unwrap();
        assert!(result.get("time").is_some());
    }
}
