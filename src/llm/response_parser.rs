//! Parsing of complete (non-streaming) model responses.

use crate::llm::models::{ContentBlock, LlmGatewayResponse, LlmToolCall};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

/// Text and tool calls extracted from one model response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub text: String,
    /// Tool calls ready for execution, in response order
    pub tool_calls: Vec<LlmToolCall>,
}

impl ParsedResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Split a response into its text and tool-call segments.
///
/// Text blocks are concatenated in order. Tool calls without a name or id are dropped. Tool-use input is taken as provided; input
/// that is not a JSON object (or a string encoding one) becomes an empty argument map.
pub fn parse_response(response: &LlmGatewayResponse) -> ParsedResponse {
    let mut parsed = ParsedResponse::default();

    for block in &response.content {
        match block {
            ContentBlock::Text { text } => parsed.text.push_str(text),
            ContentBlock::ToolUse { id, name, .. } if id.is_empty() || name.is_empty() => {
                warn!(tool = %name, id = %id, "Discarding tool call without a name or id");
            }
            ContentBlock::ToolUse { id, name, input } => {
                let arguments = arguments_from_value(input);
                info!(tool = %name, id = %id, args = ?arguments, "Tool call parsed");
                parsed.tool_calls.push(LlmToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    arguments,
                });
            }
        }
    }

    info!(
        "Response parsing complete. Text length: {}, Tool calls: {}",
        parsed.text.len(),
        parsed.tool_calls.len()
    );
    parsed
}

/// Convert a tool-use input value into an argument map
pub fn arguments_from_value(input: &Value) -> HashMap<String, Value> {
    match input {
        Value::Object(map) => map.clone().into_iter().collect(),
        Value::String(encoded) => arguments_from_json(encoded),
        Value::Null => HashMap::new(),
        other => {
            warn!("Tool input is not an object: {}", other);
            HashMap::new()
        }
    }
}

/// Decode accumulated JSON text into an argument map.
///
/// Empty text means no arguments. Malformed JSON or a non-object value yields an empty
/// map rather than an error.
pub fn arguments_from_json(encoded: &str) -> HashMap<String, Value> {
    if encoded.trim().is_empty() {
        return HashMap::new();
    }

    match serde_json::from_str::<Value>(encoded) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        Ok(other) => {
            warn!("Tool arguments decoded to a non-object value: {}", other);
            HashMap::new()
        }
        Err(e) => {
            warn!("Failed to decode tool arguments '{}': {}", encoded, e);
            HashMap::new()
        }
    }
}
