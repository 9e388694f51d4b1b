//! Name-keyed tool registry and the tool execution step.
//!
//! Execution never fails: a missing tool or a tool error becomes the textual result that
//! is fed back to the model, so the conversation can continue.

use crate::llm::models::{LlmMessage, LlmToolCall};
use crate::llm::tools::{LlmTool, ToolDescriptor};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Result of running one tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub tool_call_id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolOutcome {
    /// Convert into the tool-result message that goes back into history
    pub fn into_message(self) -> LlmMessage {
        LlmMessage::tool_result(self.tool_call_id, self.content, self.is_error)
    }
}

/// Mapping from tool name to tool
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn LlmTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its descriptor name, replacing any previous tool of that name
    pub fn register(&mut self, tool: Box<dyn LlmTool>) {
        let name = tool.name();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "Replaced previously registered tool");
        }
    }

    /// Builder-style variant of [`register`](Self::register)
    pub fn with_tool(mut self, tool: Box<dyn LlmTool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn LlmTool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Descriptors for every registered tool, ordered by name
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.descriptor()).collect()
    }

    /// Run the tool named by `call`.
    pub async fn execute(&self, call: &LlmToolCall) -> ToolOutcome {
        let Some(tool) = self.get(&call.name) else {
            warn!(tool = %call.name, id = %call.id, "Tool not found");
            return ToolOutcome {
                tool_call_id: call.id.clone(),
                name: call.name.clone(),
                content: format!("Tool '{}' not found", call.name),
                is_error: true,
            };
        };

        info!(tool = %call.name, id = %call.id, args = ?call.arguments, "Executing tool");

        match tool.run(&call.arguments).await {
            Ok(output) => ToolOutcome {
                tool_call_id: call.id.clone(),
                name: call.name.clone(),
                content: render_output(output),
                is_error: false,
            },
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                ToolOutcome {
                    tool_call_id: call.id.clone(),
                    name: call.name.clone(),
                    content: e.to_string(),
                    is_error: true,
                }
            }
        }
    }
}

fn render_output(output: Value) -> String {
    match output {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
