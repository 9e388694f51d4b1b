use crate::config::LlmConfig;
use crate::error::{AssistantError, Result};
use crate::llm::gateway::{ChunkStream, CompletionConfig, LlmGateway, ResponseChunk};
use crate::llm::gateways::bedrock_messages_adapter::{
    adapt_messages_to_bedrock, adapt_tools_to_bedrock, convert_content_blocks,
};
use crate::llm::gateways::event_stream::{EventMessage, EventStreamDecoder};
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use crate::llm::tools::ToolDescriptor;
use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Gateway for models hosted on AWS Bedrock, via the Converse API
///
/// Requests are authenticated with a Bedrock API key sent as a bearer token.
pub struct BedrockGateway {
    client: Client,
    config: LlmConfig,
}

impl BedrockGateway {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    fn converse_url(&self, stream: bool) -> String {
        format!(
            "{}/model/{}/{}",
            self.config.endpoint_url(),
            urlencoding::encode(&self.config.model_id),
            if stream { "converse-stream" } else { "converse" }
        )
    }

    fn request_body(
        &self,
        messages: &[LlmMessage],
        tools: &[ToolDescriptor],
        config: &CompletionConfig,
    ) -> Value {
        let conversation = adapt_messages_to_bedrock(messages);

        let mut body = serde_json::json!({
            "messages": conversation.messages,
            "inferenceConfig": {
                "maxTokens": config.max_tokens,
                "temperature": config.temperature,
            },
        });

        if !conversation.system.is_empty() {
            body["system"] = Value::Array(conversation.system);
        }
        if let Some(tool_config) = adapt_tools_to_bedrock(tools) {
            body["toolConfig"] = tool_config;
        }

        body
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AssistantError::GatewayError(format!(
                "Bedrock API error: {} - {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl LlmGateway for BedrockGateway {
    async fn complete(
        &self,
        messages: &[LlmMessage],
        tools: &[ToolDescriptor],
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        info!("Delegating to Bedrock for completion");
        debug!("Model: {}, Message count: {}", self.config.model_id, messages.len());

        let body = self.request_body(messages, tools, config);
        let response = self.post(&self.converse_url(false), &body).await?;
        let response_body: Value = response.json().await?;

        let content = response_body["output"]["message"]["content"]
            .as_array()
            .map(|blocks| convert_content_blocks(blocks))
            .unwrap_or_default();

        if let Some(usage) = response_body.get("usage") {
            debug!(usage = %usage, "Bedrock token usage");
        }

        Ok(LlmGatewayResponse {
            content,
            stop_reason: response_body["stopReason"].as_str().map(String::from),
        })
    }

    fn complete_stream<'a>(
        &'a self,
        messages: &'a [LlmMessage],
        tools: &'a [ToolDescriptor],
        config: &'a CompletionConfig,
    ) -> ChunkStream<'a> {
        Box::pin(async_stream::stream! {
            info!("Starting Bedrock streaming completion");
            debug!("Model: {}, Message count: {}", self.config.model_id, messages.len());

            let body = self.request_body(messages, tools, config);
            let response = match self.post(&self.converse_url(true), &body).await {
                Ok(r) => r,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut bytes = response.bytes_stream();
            let mut decoder = EventStreamDecoder::new();
            let mut message_stopped = false;

            while let Some(chunk_result) = bytes.next().await {
                match chunk_result {
                    Ok(data) => decoder.push(&data),
                    Err(e) => {
                        yield Err(e.into());
                        return;
                    }
                }

                loop {
                    let message = match decoder.next_message() {
                        Ok(Some(message)) => message,
                        Ok(None) => break,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    };

                    match convert_event(&message) {
                        Ok(Some(chunk)) => {
                            if matches!(chunk, ResponseChunk::MessageStop { .. }) {
                                message_stopped = true;
                            }
                            yield Ok(chunk);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            if decoder.buffered() > 0 {
                warn!("Stream ended with {} undecoded bytes", decoder.buffered());
                yield Err(AssistantError::EventStreamError(format!(
                    "stream ended inside a message ({} undecoded bytes)",
                    decoder.buffered()
                )));
            } else if !message_stopped {
                warn!("Stream ended without a messageStop event");
                yield Err(AssistantError::EventStreamError(
                    "stream ended before messageStop".to_string(),
                ));
            }
        })
    }
}

/// Convert one ConverseStream event into a response chunk.
///
/// Events that carry nothing for the parser (message start, usage metadata) yield
/// `None`. Exception and error messages become errors.
pub fn convert_event(message: &EventMessage) -> Result<Option<ResponseChunk>> {
    match message.message_type() {
        Some("exception") => {
            let kind = message.header(":exception-type").unwrap_or("exception");
            let detail = serde_json::from_slice::<Value>(&message.payload)
                .ok()
                .and_then(|v| v["message"].as_str().map(String::from))
                .unwrap_or_else(|| String::from_utf8_lossy(&message.payload).into_owned());
            return Err(AssistantError::GatewayError(format!("Bedrock {}: {}", kind, detail)));
        }
        Some("error") => {
            return Err(AssistantError::GatewayError(format!(
                "Bedrock {}: {}",
                message.header(":error-code").unwrap_or("error"),
                message.header(":error-message").unwrap_or_default()
            )));
        }
        _ => {}
    }

    let Some(event_type) = message.event_type() else {
        warn!("Ignoring event without an event type");
        return Ok(None);
    };
    let payload: Value = serde_json::from_slice(&message.payload)?;
    let index = payload["contentBlockIndex"].as_u64().map(|i| i as usize);

    let chunk = match event_type {
        "contentBlockStart" => {
            let tool_use = &payload["start"]["toolUse"];
            match (tool_use["toolUseId"].as_str(), tool_use["name"].as_str()) {
                (Some(id), Some(name)) => Some(ResponseChunk::ToolUseStart {
                    index: index.unwrap_or_default(),
                    id: id.to_string(),
                    name: name.to_string(),
                }),
                _ => None,
            }
        }
        "contentBlockDelta" => {
            let delta = &payload["delta"];
            if let Some(text) = delta["text"].as_str() {
                Some(ResponseChunk::Text {
                    index: index.unwrap_or_default(),
                    text: text.to_string(),
                })
            } else {
                delta["toolUse"]["input"]
                    .as_str()
                    .map(|input| ResponseChunk::ToolUseDelta {
                        index,
                        partial_json: input.to_string(),
                    })
            }
        }
        "contentBlockStop" => Some(ResponseChunk::BlockStop {
            index: index.unwrap_or_default(),
        }),
        "messageStop" => Some(ResponseChunk::MessageStop {
            stop_reason: payload["stopReason"].as_str().map(String::from),
        }),
        "metadata" => {
            debug!(usage = %payload["usage"], "Bedrock token usage");
            None
        }
        "messageStart" => None,
        other => {
            debug!("Ignoring stream event {}", other);
            None
        }
    };

    Ok(chunk)
}
