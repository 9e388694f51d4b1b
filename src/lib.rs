pub mod apis;
pub mod config;
pub mod error;
pub mod llm;
pub mod ui;

pub use error::{AssistantError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{AppConfig, LlmConfig, RecipeApiConfig, ServerConfig};
    pub use crate::error::{AssistantError, Result};
    pub use crate::llm::gateways::BedrockGateway;
    pub use crate::llm::tools::{FunctionDescriptor, LlmTool, RecipeTool, ToolDescriptor, ToolRegistry};
    pub use crate::llm::{
        ChatManager, ChatUpdate, CompletionConfig, LlmGateway, LlmMessage, MessageRole,
    };
}
