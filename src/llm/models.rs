use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Message role in LLM conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// Tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmToolCall {
    pub id: String,
    pub name: String,
    pub arguments: HashMap<String, Value>,
}

/// Message in LLM conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    #[serde(default = "default_role")]
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<LlmToolCall>>,
    /// Links a tool-result message to the call that produced it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

fn default_role() -> MessageRole {
    MessageRole::User
}

impl LlmMessage {
    fn new(role: MessageRole, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
            is_error: false,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, Some(content.into()))
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, Some(content.into()))
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, Some(content.into()))
    }

    /// Create an assistant message that requests tool calls.
    ///
    /// Empty text is dropped so the message carries only the tool calls.
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<LlmToolCall>) -> Self {
        let content = content.into();
        let mut message =
            Self::new(MessageRole::Assistant, if content.is_empty() { None } else { Some(content) });
        message.tool_calls = Some(tool_calls);
        message
    }

    /// Create a tool-result message correlated with `tool_call_id`
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        let mut message = Self::new(MessageRole::Tool, Some(content.into()));
        message.tool_call_id = Some(tool_call_id.into());
        message.is_error = is_error;
        message
    }
}

/// One segment of a complete model response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        /// Either a JSON object or a string holding encoded JSON
        input: Value,
    },
}

/// Response from LLM gateway
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmGatewayResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}
