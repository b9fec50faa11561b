//! Tool implementations backing the `agent` command dispatcher.
//!
//! Each tool wraps one external facility — an HTTP fetch, a search engine,
//! a subprocess, the filesystem — behind a common trait so the CLI can
//! dispatch by name with JSON arguments.

pub mod files;
pub mod terminal;
pub mod web;

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};

/// A tool the agent can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (used for dispatch).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON schema for the tool's arguments.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String>;
}

/// Name and description of a registered tool.
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a registry with the built-in tools.
    pub fn new() -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Box::new(web::BrowsePage::default()));
        registry.register(Box::new(web::WebSearch::default()));
        registry.register(Box::new(terminal::RunCommand));
        registry.register(Box::new(files::ReadFile));
        registry.register(Box::new(files::WriteFile));
        registry.register(Box::new(files::EditFile));

        registry
    }

    fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// List registered tools, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .tools
            .values()
            .map(|t| ToolSpec {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Tool definitions in the OpenAI function-calling shape.
    pub fn get_tool_schemas(&self) -> Vec<Value> {
        let mut schemas: Vec<(String, Value)> = self
            .tools
            .values()
            .map(|t| {
                (
                    t.name().to_string(),
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name(),
                            "description": t.description(),
                            "parameters": t.parameters_schema(),
                        }
                    }),
                )
            })
            .collect();
        schemas.sort_by(|a, b| a.0.cmp(&b.0));
        schemas.into_iter().map(|(_, v)| v).collect()
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        workspace: &Path,
    ) -> anyhow::Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;
        tool.execute(args, workspace).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_builtin_tools() {
        let registry = ToolRegistry::new();
        let names: Vec<String> = registry.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "browse_page",
                "edit_file",
                "read_file",
                "run_command",
                "web_search",
                "write_file"
            ]
        );
    }

    #[test]
    fn schemas_follow_function_calling_shape() {
        let registry = ToolRegistry::new();
        for schema in registry.get_tool_schemas() {
            assert_eq!(schema["type"], "function");
            assert!(schema["function"]["name"].is_string());
            assert_eq!(schema["function"]["parameters"]["type"], "object");
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("nope", json!({}), Path::new("."))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown tool"));
    }
}
