//! Incremental parsing of streamed model responses.
//!
//! [`StreamingParser`] folds [`ResponseChunk`]s into a running view of the response text
//! and assembles tool calls from partial JSON fragments. A tool call is completed when its
//! content block stops (or the message stops), at which point the accumulated fragments
//! are decoded into an argument map.

use crate::error::Result;
use crate::llm::gateway::{ChunkStream, ResponseChunk};
use crate::llm::models::LlmToolCall;
use crate::llm::response_parser::{arguments_from_json, ParsedResponse};
use futures::stream::{Stream, StreamExt};
use std::collections::BTreeMap;
use std::pin::Pin;
use tracing::{debug, info, warn};

/// Parser output for one consumed chunk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedChunk {
    /// Text carried by this chunk
    pub text_delta: String,
    /// All text seen so far in this response
    pub accumulated_text: String,
    /// Tool calls completed by this chunk, ready for execution
    pub completed_tools: Vec<LlmToolCall>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    partial_json: String,
}

/// Accumulator for one streamed model response
#[derive(Debug, Default)]
pub struct StreamingParser {
    accumulated_text: String,
    partial_tool_calls: BTreeMap<usize, PartialToolCall>,
    current_index: Option<usize>,
    completed: Vec<LlmToolCall>,
    stop_reason: Option<String>,
}

impl StreamingParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk and report what it changed
    pub fn feed(&mut self, chunk: ResponseChunk) -> ParsedChunk {
        let mut text_delta = String::new();
        let mut completed_tools = Vec::new();

        match chunk {
            ResponseChunk::Text { text, .. } => {
                self.accumulated_text.push_str(&text);
                text_delta = text;
            }
            ResponseChunk::ToolUseStart { index, id, name } => {
                debug!(index, tool = %name, id = %id, "Tool call started");
                let partial = self.partial_tool_calls.entry(index).or_default();
                partial.id = id;
                partial.name = name;
                self.current_index = Some(index);
            }
            ResponseChunk::ToolUseDelta {
                index,
                partial_json,
            } => match index.or(self.current_index) {
                Some(index) => {
                    let partial = self.partial_tool_calls.entry(index).or_insert_with(|| {
                        warn!(index, "Tool input arrived before its tool-use start");
                        PartialToolCall::default()
                    });
                    partial.partial_json.push_str(&partial_json);
                    self.current_index = Some(index);
                }
                None => warn!("Dropping tool input fragment with no open tool call"),
            },
            ResponseChunk::BlockStop { index } => {
                if let Some(call) = self.complete(index) {
                    completed_tools.push(call);
                }
            }
            ResponseChunk::MessageStop { stop_reason } => {
                debug!(stop_reason = ?stop_reason, "Message stopped");
                self.stop_reason = stop_reason;
                completed_tools.extend(self.flush());
            }
        }

        ParsedChunk {
            text_delta,
            accumulated_text: self.accumulated_text.clone(),
            completed_tools,
        }
    }

    /// Complete every tool call still open, in block order
    pub fn flush(&mut self) -> Vec<LlmToolCall> {
        let open: Vec<usize> = self.partial_tool_calls.keys().copied().collect();
        open.into_iter().filter_map(|index| self.complete(index)).collect()
    }

    /// Flush open calls and return the whole response
    pub fn finish(mut self) -> ParsedResponse {
        self.flush();
        info!("Streaming parsing complete. Final text length: {}", self.accumulated_text.len());
        ParsedResponse {
            text: self.accumulated_text,
            tool_calls: self.completed,
        }
    }

    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    pub fn stop_reason(&self) -> Option<&str> {
        self.stop_reason.as_deref()
    }

    fn complete(&mut self, index: usize) -> Option<LlmToolCall> {
        let partial = self.partial_tool_calls.remove(&index)?;
        if self.current_index == Some(index) {
            self.current_index = None;
        }

        if partial.name.is_empty() || partial.id.is_empty() {
            warn!(index, "Discarding tool call without a name or id");
            return None;
        }

        let call = LlmToolCall {
            id: partial.id,
            name: partial.name,
            arguments: arguments_from_json(&partial.partial_json),
        };
        info!(tool = %call.name, id = %call.id, args = ?call.arguments, "Tool call completed");
        self.completed.push(call.clone());
        Some(call)
    }
}

pub type ParsedChunkStream<'a> = Pin<Box<dyn Stream<Item = Result<ParsedChunk>> + Send + 'a>>;

/// Run a chunk stream through a fresh [`StreamingParser`].
///
/// Yields one [`ParsedChunk`] per input chunk. If the input ends with tool calls still
/// open, a final chunk carrying them is yielded. The first error ends the stream.
pub fn parse_streaming_response(mut chunks: ChunkStream<'_>) -> ParsedChunkStream<'_> {
    Box::pin(async_stream::stream! {
        info!("Starting streaming response parsing");
        let mut parser = StreamingParser::new();

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(chunk) => {
                    yield Ok(parser.feed(chunk));
                }
                Err(e) => {
                    warn!("Error in streaming response: {}", e);
                    yield Err(e);
                    return;
                }
            }
        }

        info!("Streamed response ended (stop reason: {:?})", parser.stop_reason());
        let flushed = parser.flush();
        if !flushed.is_empty() {
            yield Ok(ParsedChunk {
                text_delta: String::new(),
                accumulated_text: parser.accumulated_text().to_string(),
                completed_tools: flushed,
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use futures::stream;
    use serde_json::json;

    fn text(index: usize, t: &str) -> ResponseChunk {
        ResponseChunk::Text {
            index,
            text: t.to_string(),
        }
    }

    fn start(index: usize, id: &str, name: &str) -> ResponseChunk {
        ResponseChunk::ToolUseStart {
            index,
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn delta(index: usize, json: &str) -> ResponseChunk {
        ResponseChunk::ToolUseDelta {
            index: Some(index),
            partial_json: json.to_string(),
        }
    }

    #[test]
    fn test_text_accumulates() {
        let mut parser = StreamingParser::new();

        let first = parser.feed(text(0, "Hello"));
        let second = parser.feed(text(0, ", chef"));

        assert_eq!(first.text_delta, "Hello");
        assert_eq!(first.accumulated_text, "Hello");
        assert_eq!(second.text_delta, ", chef");
        assert_eq!(second.accumulated_text, "Hello, chef");
        assert!(second.completed_tools.is_empty());
    }

    #[test]
    fn test_streamed_arguments_reconstruct_object() {
        let expected = json!({"name": "chicken parmesan", "options": {"vegetarian": false}});
        let encoded = expected.to_string();
        let (a, rest) = encoded.split_at(5);
        let (b, c) = rest.split_at(12);

        let mut parser = StreamingParser::new();
        parser.feed(text(0, "Looking it up."));
        parser.feed(start(1, "tooluse_1", "get_recipe"));
        assert!(parser.feed(delta(1, a)).completed_tools.is_empty());
        assert!(parser.feed(delta(1, b)).completed_tools.is_empty());
        assert!(parser.feed(delta(1, c)).completed_tools.is_empty());
        let stop = parser.feed(ResponseChunk::BlockStop { index: 1 });

        assert_eq!(stop.completed_tools.len(), 1);
        let call = &stop.completed_tools[0];
        assert_eq!(call.id, "tooluse_1");
        assert_eq!(call.name, "get_recipe");
        assert_eq!(serde_json::to_value(&call.arguments).unwrap(), expected);
    }

    #[test]
    fn test_malformed_json_yields_empty_arguments() {
        let mut parser = StreamingParser::new();
        parser.feed(start(0, "tooluse_2", "get_recipe"));
        parser.feed(delta(0, "{\"name\": \"pan"));
        let stop = parser.feed(ResponseChunk::BlockStop { index: 0 });

        assert_eq!(stop.completed_tools.len(), 1);
        assert!(stop.completed_tools[0].arguments.is_empty());
    }

    #[test]
    fn test_no_fragments_means_empty_arguments() {
        let mut parser = StreamingParser::new();
        parser.feed(start(0, "tooluse_3", "get_recipe"));
        let stop = parser.feed(ResponseChunk::BlockStop { index: 0 });

        assert!(stop.completed_tools[0].arguments.is_empty());
    }

    #[test]
    fn test_delta_without_index_goes_to_current_call() {
        let mut parser = StreamingParser::new();
        parser.feed(start(2, "tooluse_4", "get_recipe"));
        parser.feed(ResponseChunk::ToolUseDelta {
            index: None,
            partial_json: "{\"name\":\"tacos\"}".to_string(),
        });
        let stop = parser.feed(ResponseChunk::BlockStop { index: 2 });

        assert_eq!(stop.completed_tools[0].arguments.get("name"), Some(&json!("tacos")));
    }

    #[test]
    fn test_interleaved_tool_calls_keyed_by_index() {
        let mut parser = StreamingParser::new();
        parser.feed(start(0, "a", "get_recipe"));
        parser.feed(start(1, "b", "get_recipe"));
        parser.feed(delta(0, "{\"name\":"));
        parser.feed(delta(1, "{\"name\":\"soup\"}"));
        parser.feed(delta(0, "\"salad\"}"));
        let first = parser.feed(ResponseChunk::BlockStop { index: 1 });
        let second = parser.feed(ResponseChunk::BlockStop { index: 0 });

        assert_eq!(first.completed_tools[0].id, "b");
        assert_eq!(first.completed_tools[0].arguments.get("name"), Some(&json!("soup")));
        assert_eq!(second.completed_tools[0].id, "a");
        assert_eq!(second.completed_tools[0].arguments.get("name"), Some(&json!("salad")));

        let finished = parser.finish();
        let ids: Vec<_> = finished.tool_calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_text_block_stop_is_ignored() {
        let mut parser = StreamingParser::new();
        parser.feed(text(0, "Hi"));
        let stop = parser.feed(ResponseChunk::BlockStop { index: 0 });

        assert!(stop.completed_tools.is_empty());
        assert_eq!(stop.accumulated_text, "Hi");
    }

    #[test]
    fn test_message_stop_flushes_open_calls() {
        let mut parser = StreamingParser::new();
        parser.feed(start(0, "tooluse_5", "get_recipe"));
        parser.feed(delta(0, "{\"name\":\"pho\"}"));
        let stop = parser.feed(ResponseChunk::MessageStop {
            stop_reason: Some("tool_use".to_string()),
        });

        assert_eq!(stop.completed_tools.len(), 1);
        assert_eq!(parser.stop_reason(), Some("tool_use"));
    }

    #[test]
    fn test_call_without_start_is_discarded() {
        let mut parser = StreamingParser::new();
        parser.feed(delta(3, "{\"name\":\"x\"}"));
        let stop = parser.feed(ResponseChunk::BlockStop { index: 3 });

        assert!(stop.completed_tools.is_empty());
    }

    #[test]
    fn test_finish_returns_text_and_calls() {
        let mut parser = StreamingParser::new();
        parser.feed(text(0, "One moment."));
        parser.feed(start(1, "tooluse_6", "get_recipe"));
        parser.feed(delta(1, "{\"name\":\"curry\"}"));

        let parsed = parser.finish();

        assert_eq!(parsed.text, "One moment.");
        assert_eq!(parsed.tool_calls.len(), 1);
        assert_eq!(parsed.tool_calls[0].arguments.get("name"), Some(&json!("curry")));
    }

    #[tokio::test]
    async fn test_parse_streaming_response_emits_per_chunk() {
        let chunks: ChunkStream<'static> = Box::pin(stream::iter(vec![
            Ok(text(0, "Sure")),
            Ok(text(0, "!")),
            Ok(start(1, "tooluse_7", "get_recipe")),
            Ok(delta(1, "{\"name\":\"bread\"}")),
            Ok(ResponseChunk::BlockStop { index: 1 }),
            Ok(ResponseChunk::MessageStop {
                stop_reason: Some("tool_use".to_string()),
            }),
        ]));

        let parsed: Vec<ParsedChunk> = parse_streaming_response(chunks)
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(parsed.len(), 6);
        assert_eq!(parsed[1].accumulated_text, "Sure!");
        assert_eq!(parsed[4].completed_tools.len(), 1);
        assert!(parsed[5].completed_tools.is_empty());
    }

    #[tokio::test]
    async fn test_parse_streaming_response_flushes_at_end() {
        let chunks: ChunkStream<'static> = Box::pin(stream::iter(vec![
            Ok(start(0, "tooluse_8", "get_recipe")),
            Ok(delta(0, "{}")),
        ]));

        let parsed: Vec<ParsedChunk> = parse_streaming_response(chunks)
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[2].completed_tools[0].id, "tooluse_8");
    }

    #[tokio::test]
    async fn test_parse_streaming_response_stops_on_error() {
        let chunks: ChunkStream<'static> = Box::pin(stream::iter(vec![
            Ok(text(0, "partial")),
            Err(AssistantError::GatewayError("connection reset".to_string())),
            Ok(text(0, "never seen")),
        ]));

        let results: Vec<_> = parse_streaming_response(chunks).collect().await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
