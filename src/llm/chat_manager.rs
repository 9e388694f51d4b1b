//! Conversation management with tool execution.
//!
//! [`ChatManager`] owns the chat history for one session. Each user turn renders the
//! prompt, invokes the model, runs any requested tools and re-invokes the model with the
//! results until it answers without tool calls. The turn is only written to history once
//! it completes; a failed or abandoned turn leaves the history untouched.

use crate::error::Result;
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmMessage, LlmToolCall, MessageRole};
use crate::llm::prompt::PromptTemplate;
use crate::llm::response_parser::parse_response;
use crate::llm::streaming_parser::parse_streaming_response;
use crate::llm::tools::{ToolOutcome, ToolRegistry};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;
const ROUND_SEPARATOR: &str = "\n\n";

/// Progress of a streamed chat turn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatUpdate {
    /// Running view of the assistant's reply after one chunk
    Text { delta: String, text: String },
    /// A requested tool ran; its result goes back to the model
    ToolResult {
        id: String,
        name: String,
        is_error: bool,
    },
    /// The turn finished and was recorded in history
    Done { text: String },
}

impl From<&ToolOutcome> for ChatUpdate {
    fn from(outcome: &ToolOutcome) -> Self {
        ChatUpdate::ToolResult {
            id: outcome.tool_call_id.clone(),
            name: outcome.name.clone(),
            is_error: outcome.is_error,
        }
    }
}

/// One displayable chat message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatBubble {
    pub role: MessageRole,
    pub text: String,
}

/// Owns the conversation and drives model and tool calls
///
/// # Examples
///
/// ```ignore
/// use recipe_assistant::llm::{ChatManager, ToolRegistry};
/// use recipe_assistant::llm::gateways::BedrockGateway;
/// use std::sync::Arc;
///
/// let gateway = Arc::new(BedrockGateway::new(config)?);
/// let mut manager = ChatManager::builder(gateway).tools(ToolRegistry::new()).build();
///
/// let reply = manager.send("What's a good recipe for chicken parmesan?").await?;
/// ```
pub struct ChatManager {
    gateway: Arc<dyn LlmGateway>,
    tools: ToolRegistry,
    prompt: PromptTemplate,
    config: CompletionConfig,
    max_tool_rounds: usize,
    history: Vec<LlmMessage>,
}

impl ChatManager {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self::builder(gateway).build()
    }

    pub fn builder(gateway: Arc<dyn LlmGateway>) -> ChatManagerBuilder {
        ChatManagerBuilder::new(gateway)
    }

    /// Run one user turn and return the assistant's reply.
    ///
    /// The reply joins the text of every model round in the turn, so text the model
    /// produced before requesting a tool is kept.
    pub async fn send(&mut self, input: &str) -> Result<String> {
        info!("Processing message: {}", input);
        let descriptors = self.tools.descriptors();
        let mut turn: Vec<LlmMessage> = Vec::new();
        let mut visible = String::new();
        let mut rounds = 0;

        let final_text = loop {
            let messages = self.messages_for(input, &turn);
            let response = self.gateway.complete(&messages, &descriptors, &self.config).await?;
            let parsed = parse_response(&response);

            let mut round_has_text = false;
            append_visible(&mut visible, &mut round_has_text, &parsed.text);

            if !parsed.has_tool_calls() {
                break parsed.text;
            }
            if rounds == self.max_tool_rounds {
                warn!("Tool round limit ({}) reached, returning last response", rounds);
                break parsed.text;
            }
            rounds += 1;

            for outcome in self.run_tools(&parsed.text, parsed.tool_calls, &mut turn).await {
                info!(tool = %outcome.name, is_error = outcome.is_error, "Tool result added");
            }
        };

        self.commit_turn(input, turn, final_text);
        info!("Message response completed");
        Ok(visible)
    }

    /// Run one user turn, streaming the reply.
    ///
    /// Yields a [`ChatUpdate::Text`] after every model chunk, a
    /// [`ChatUpdate::ToolResult`] for every executed tool and a final
    /// [`ChatUpdate::Done`]. The turn is recorded in history only when the stream is
    /// consumed to the end.
    pub fn send_stream<'a>(
        &'a mut self,
        input: &str,
    ) -> Pin<Box<dyn Stream<Item = Result<ChatUpdate>> + Send + 'a>> {
        let input = input.to_string();

        Box::pin(async_stream::stream! {
            info!("Streaming message: {}", input);
            let descriptors = self.tools.descriptors();
            let mut turn: Vec<LlmMessage> = Vec::new();
            let mut visible = String::new();
            let mut rounds = 0;

            let final_text = loop {
                let messages = self.messages_for(&input, &turn);
                let mut round_text = String::new();
                let mut round_has_text = false;
                let mut tool_calls: Vec<LlmToolCall> = Vec::new();

                {
                    let mut chunks = parse_streaming_response(
                        self.gateway.complete_stream(&messages, &descriptors, &self.config),
                    );

                    while let Some(result) = chunks.next().await {
                        match result {
                            Ok(chunk) => {
                                round_text = chunk.accumulated_text;
                                tool_calls.extend(chunk.completed_tools);
                                let delta =
                                    append_visible(&mut visible, &mut round_has_text, &chunk.text_delta);
                                yield Ok(ChatUpdate::Text {
                                    delta,
                                    text: visible.clone(),
                                });
                            }
                            Err(e) => {
                                yield Err(e);
                                return;
                            }
                        }
                    }
                }

                if tool_calls.is_empty() {
                    break round_text;
                }
                if rounds == self.max_tool_rounds {
                    warn!("Tool round limit ({}) reached, returning last response", rounds);
                    break round_text;
                }
                rounds += 1;

                let outcomes = self.run_tools(&round_text, tool_calls, &mut turn).await;
                for outcome in &outcomes {
                    yield Ok(ChatUpdate::from(outcome));
                }
            };

            self.commit_turn(&input, turn, final_text);
            info!("Streamed response completed");
            yield Ok(ChatUpdate::Done { text: visible });
        })
    }

    /// Forget the conversation
    pub fn clear_history(&mut self) {
        info!("Clearing chat history");
        self.history.clear();
    }

    pub fn history(&self) -> &[LlmMessage] {
        &self.history
    }

    /// The history as user and assistant bubbles.
    ///
    /// Assistant text from every round of a turn is merged into one bubble; tool
    /// messages are not shown.
    pub fn chat_bubbles(&self) -> Vec<ChatBubble> {
        let mut bubbles: Vec<ChatBubble> = Vec::new();

        for message in &self.history {
            let text = message.content.as_deref().unwrap_or("");
            match message.role {
                MessageRole::User => bubbles.push(ChatBubble {
                    role: MessageRole::User,
                    text: text.to_string(),
                }),
                MessageRole::Assistant if !text.is_empty() => match bubbles.last_mut() {
                    Some(last) if last.role == MessageRole::Assistant => {
                        last.text.push_str(ROUND_SEPARATOR);
                        last.text.push_str(text);
                    }
                    _ => bubbles.push(ChatBubble {
                        role: MessageRole::Assistant,
                        text: text.to_string(),
                    }),
                },
                _ => {}
            }
        }

        bubbles
    }

    fn messages_for(&self, input: &str, turn: &[LlmMessage]) -> Vec<LlmMessage> {
        let mut messages = self.prompt.render(&self.history, input);
        messages.extend(turn.iter().cloned());
        messages
    }

    /// Record the tool request and one result message per call, correlated by id
    async fn run_tools(
        &self,
        text: &str,
        tool_calls: Vec<LlmToolCall>,
        turn: &mut Vec<LlmMessage>,
    ) -> Vec<ToolOutcome> {
        info!("Tool calls requested: {}", tool_calls.len());
        turn.push(LlmMessage::assistant_with_tool_calls(text, tool_calls.clone()));

        let mut outcomes = Vec::with_capacity(tool_calls.len());
        for call in &tool_calls {
            let outcome = self.tools.execute(call).await;
            turn.push(outcome.clone().into_message());
            outcomes.push(outcome);
        }
        outcomes
    }

    fn commit_turn(&mut self, input: &str, turn: Vec<LlmMessage>, final_text: String) {
        self.history.push(LlmMessage::user(self.prompt.format_input(input)));
        self.history.extend(turn);
        self.history.push(LlmMessage::assistant(final_text));
    }
}

/// Append one delta to the visible reply, separating rounds with a blank line.
/// Returns what was actually appended.
fn append_visible(visible: &mut String, round_has_text: &mut bool, delta: &str) -> String {
    if delta.is_empty() {
        return String::new();
    }

    let mut appended = String::new();
    if !*round_has_text && !visible.is_empty() {
        appended.push_str(ROUND_SEPARATOR);
    }
    *round_has_text = true;
    appended.push_str(delta);
    visible.push_str(&appended);
    appended
}

/// Builder for constructing a `ChatManager` with custom configuration.
pub struct ChatManagerBuilder {
    gateway: Arc<dyn LlmGateway>,
    tools: ToolRegistry,
    prompt: PromptTemplate,
    config: CompletionConfig,
    max_tool_rounds: usize,
}

impl ChatManagerBuilder {
    fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            gateway,
            tools: ToolRegistry::new(),
            prompt: PromptTemplate::default(),
            config: CompletionConfig::default(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Set the tools available to the model
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Set the prompt template (default: the recipe assistant prompt)
    pub fn prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn completion_config(mut self, config: CompletionConfig) -> Self {
        self.config = config;
        self
    }

    /// Limit how many times one turn may run tools (default: 5)
    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn build(self) -> ChatManager {
        ChatManager {
            gateway: self.gateway,
            tools: self.tools,
            prompt: self.prompt,
            config: self.config,
            max_tool_rounds: self.max_tool_rounds,
            history: Vec::new(),
        }
    }
}
