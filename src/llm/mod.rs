pub mod chat_manager;
pub mod gateway;
pub mod gateways;
pub mod models;
pub mod prompt;
pub mod response_parser;
pub mod streaming_parser;
pub mod tools;

pub use chat_manager::{ChatBubble, ChatManager, ChatManagerBuilder, ChatUpdate};
pub use gateway::{ChunkStream, CompletionConfig, LlmGateway, ResponseChunk};
pub use models::{ContentBlock, LlmGatewayResponse, LlmMessage, LlmToolCall, MessageRole};
pub use prompt::PromptTemplate;
pub use response_parser::{parse_response, ParsedResponse};
pub use streaming_parser::{parse_streaming_response, ParsedChunk, StreamingParser};
pub use tools::{FunctionDescriptor, LlmTool, RecipeTool, ToolDescriptor, ToolRegistry};
