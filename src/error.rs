//! Error types and result aliases for the recipe assistant.
//!
//! This module defines the core error type [`AssistantError`] and the [`Result`] type alias
//! used throughout the library. Tool failures are not surfaced through this type during a
//! conversation; the tool registry turns them into inline result strings instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("LLM gateway error: {0}")]
    GatewayError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Event stream error: {0}")]
    EventStreamError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AssistantError>;
