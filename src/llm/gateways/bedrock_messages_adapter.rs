//! Adapter between LLM messages and the Bedrock Converse wire format.

use crate::llm::models::{ContentBlock, LlmMessage, MessageRole};
use crate::llm::tools::ToolDescriptor;
use serde_json::{json, Value};
use tracing::warn;

/// System prompts and conversation turns for a Converse request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BedrockConversation {
    pub system: Vec<Value>,
    pub messages: Vec<Value>,
}

/// Adapt LLM messages to Converse `system` and `messages`.
///
/// Converse only knows `user` and `assistant` turns. Tool results are sent as
/// `toolResult` blocks in a user turn, and consecutive turns with the same role are
/// merged so that all results for one tool request travel together. Messages with no
/// content are dropped.
pub fn adapt_messages_to_bedrock(messages: &[LlmMessage]) -> BedrockConversation {
    let mut conversation = BedrockConversation::default();
    let mut turns: Vec<(&'static str, Vec<Value>)> = Vec::new();

    for msg in messages {
        let text = msg.content.as_deref().filter(|t| !t.is_empty());

        let (role, blocks) = match msg.role {
            MessageRole::System => {
                if let Some(text) = text {
                    conversation.system.push(json!({ "text": text }));
                }
                continue;
            }
            MessageRole::User => ("user", text.map(text_block).into_iter().collect()),
            MessageRole::Assistant => {
                let mut blocks: Vec<Value> = text.map(text_block).into_iter().collect();
                for call in msg.tool_calls.iter().flatten() {
                    blocks.push(json!({
                        "toolUse": {
                            "toolUseId": call.id,
                            "name": call.name,
                            "input": call.arguments,
                        }
                    }));
                }
                ("assistant", blocks)
            }
            MessageRole::Tool => {
                let Some(tool_use_id) = msg.tool_call_id.as_deref() else {
                    warn!("Dropping tool result without a tool call id");
                    continue;
                };
                let block = json!({
                    "toolResult": {
                        "toolUseId": tool_use_id,
                        "content": [{ "text": msg.content.as_deref().unwrap_or("") }],
                        "status": if msg.is_error { "error" } else { "success" },
                    }
                });
                ("user", vec![block])
            }
        };

        if blocks.is_empty() {
            continue;
        }

        match turns.last_mut() {
            Some((last_role, last_blocks)) if *last_role == role => last_blocks.extend(blocks),
            _ => turns.push((role, blocks)),
        }
    }

    conversation.messages = turns
        .into_iter()
        .map(|(role, content)| json!({ "role": role, "content": content }))
        .collect();
    conversation
}

fn text_block(text: &str) -> Value {
    json!({ "text": text })
}

/// Build the Converse `toolConfig`, or `None` when there are no tools
pub fn adapt_tools_to_bedrock(tools: &[ToolDescriptor]) -> Option<Value> {
    if tools.is_empty() {
        return None;
    }

    let specs: Vec<Value> = tools
        .iter()
        .map(|tool| {
            json!({
                "toolSpec": {
                    "name": tool.function.name,
                    "description": tool.function.description,
                    "inputSchema": { "json": tool.function.parameters },
                }
            })
        })
        .collect();

    Some(json!({ "tools": specs }))
}

/// Convert the content of a Converse output message into content blocks.
///
/// Block kinds other than text and tool use (reasoning, citations) are skipped.
pub fn convert_content_blocks(content: &[Value]) -> Vec<ContentBlock> {
    content
        .iter()
        .filter_map(|block| {
            if let Some(text) = block["text"].as_str() {
                return Some(ContentBlock::Text {
                    text: text.to_string(),
                });
            }

            let tool_use = block.get("toolUse")?;
            Some(ContentBlock::ToolUse {
                id: tool_use["toolUseId"].as_str().unwrap_or_default().to_string(),
                name: tool_use["name"].as_str().unwrap_or_default().to_string(),
                input: tool_use.get("input").cloned().unwrap_or(Value::Null),
            })
        })
        .collect()
}
