use crate::error::Result;
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use crate::llm::tools::ToolDescriptor;
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

/// Configuration for LLM completion
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 3000,
        }
    }
}

/// One incremental unit of a streamed model response.
///
/// `index` identifies the content block a chunk belongs to; text and tool-use blocks
/// share the same index space within one response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseChunk {
    Text { index: usize, text: String },
    ToolUseStart { index: usize, id: String, name: String },
    ToolUseDelta { index: Option<usize>, partial_json: String },
    BlockStop { index: usize },
    MessageStop { stop_reason: Option<String> },
}

pub type ChunkStream<'a> = Pin<Box<dyn Stream<Item = Result<ResponseChunk>> + Send + 'a>>;

/// Abstract interface for LLM providers
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Complete an LLM request and return the whole response
    async fn complete(
        &self,
        messages: &[LlmMessage],
        tools: &[ToolDescriptor],
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse>;

    /// Complete an LLM request as a stream of response chunks
    fn complete_stream<'a>(
        &'a self,
        messages: &'a [LlmMessage],
        tools: &'a [ToolDescriptor],
        config: &'a CompletionConfig,
    ) -> ChunkStream<'a>;
}
