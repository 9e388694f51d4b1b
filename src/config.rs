//! Application configuration.
//!
//! Every value comes from environment variables (after `.env` has been loaded by the
//! binary). The loaders take a lookup function so they can be exercised without touching
//! the process environment.

use crate::error::{AssistantError, Result};
use std::fmt;
use std::time::Duration;

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: usize = 3000;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RECIPE_API_BASE_URL: &str = "https://api.api-ninjas.com/v1/";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 7860;

/// Configuration for the hosted model
#[derive(Clone)]
pub struct LlmConfig {
    pub model_id: String,
    pub region: String,
    pub api_key: String,
    /// Overrides the regional Bedrock runtime endpoint
    pub endpoint: Option<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("model_id", &self.model_id)
            .field("region", &self.region)
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl LlmConfig {
    pub fn builder() -> LlmConfigBuilder {
        LlmConfigBuilder::default()
    }

    /// Load from `AWS_BEDROCK_MODEL_ID`, `AWS_REGION` and `AWS_BEARER_TOKEN_BEDROCK`,
    /// plus the optional `AWS_BEDROCK_ENDPOINT`, `LLM_TEMPERATURE` and `LLM_MAX_TOKENS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder()
            .model_id(require(&lookup, "AWS_BEDROCK_MODEL_ID")?)
            .region(require(&lookup, "AWS_REGION")?)
            .api_key(require(&lookup, "AWS_BEARER_TOKEN_BEDROCK")?);

        if let Some(endpoint) = non_empty(&lookup, "AWS_BEDROCK_ENDPOINT") {
            builder = builder.endpoint(endpoint);
        }
        if let Some(temperature) = parse_optional::<f32, _>(&lookup, "LLM_TEMPERATURE")? {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = parse_optional::<usize, _>(&lookup, "LLM_MAX_TOKENS")? {
            builder = builder.max_tokens(max_tokens);
        }

        builder.build()
    }

    /// Base URL of the Bedrock runtime service
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }
}

/// Builder for [`LlmConfig`]
#[derive(Debug, Clone)]
pub struct LlmConfigBuilder {
    model_id: Option<String>,
    region: Option<String>,
    api_key: Option<String>,
    endpoint: Option<String>,
    temperature: f32,
    max_tokens: usize,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl Default for LlmConfigBuilder {
    fn default() -> Self {
        Self {
            model_id: None,
            region: None,
            api_key: None,
            endpoint: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl LlmConfigBuilder {
    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the sampling temperature (default: 0.7)
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the response token limit (default: 3000)
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Build the config, failing when model id, region or API key is missing
    pub fn build(self) -> Result<LlmConfig> {
        match (self.model_id, self.region, self.api_key) {
            (Some(model_id), Some(region), Some(api_key)) => Ok(LlmConfig {
                model_id,
                region,
                api_key,
                endpoint: self.endpoint,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                connect_timeout: self.connect_timeout,
                read_timeout: self.read_timeout,
            }),
            _ => Err(AssistantError::ConfigError(
                "Required fields (model_id, region, api_key) must be set".to_string(),
            )),
        }
    }
}

/// Configuration for the recipe lookup API
#[derive(Clone)]
pub struct RecipeApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl fmt::Debug for RecipeApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipeApiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for RecipeApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_RECIPE_API_BASE_URL.to_string(),
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl RecipeApiConfig {
    /// Load from `API_NINJA_KEY` and the optional `RECIPE_API_BASE_URL`.
    ///
    /// A missing key is not an error here; lookups fail later and the failure is reported
    /// back to the model as the tool result.
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(key) = non_empty(&lookup, "API_NINJA_KEY") {
            config.api_key = key;
        }
        if let Some(base_url) = non_empty(&lookup, "RECIPE_API_BASE_URL") {
            config.base_url = base_url;
        }
        config
    }
}

/// Where the chat UI listens
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Load from the optional `SERVER_HOST` and `SERVER_PORT`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(host) = non_empty(&lookup, "SERVER_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_optional::<u16, _>(&lookup, "SERVER_PORT")? {
            config.port = port;
        }
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Everything the application needs at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub recipe_api: RecipeApiConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            llm: LlmConfig::from_lookup(&lookup)?,
            recipe_api: RecipeApiConfig::from_lookup(&lookup),
            server: ServerConfig::from_lookup(&lookup)?,
        })
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).ok_or_else(|| {
        AssistantError::ConfigError(format!("{} environment variable is not set", key))
    })
}

fn parse_optional<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| {
                AssistantError::ConfigError(format!("{} has invalid value '{}': {}", key, raw, e))
            })
        })
        .transpose()
}
