pub mod bedrock;
pub mod bedrock_messages_adapter;
pub mod event_stream;

pub use bedrock::BedrockGateway;
pub use event_stream::{EventMessage, EventStreamDecoder};
