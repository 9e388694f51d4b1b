//! Recipe assistant server
//!
//! Loads `.env` and the environment, connects to Bedrock and serves the chat UI.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use recipe_assistant::apis::RecipeApiClient;
use recipe_assistant::config::AppConfig;
use recipe_assistant::llm::gateways::BedrockGateway;
use recipe_assistant::llm::{ChatManager, CompletionConfig, RecipeTool, ToolRegistry};
use recipe_assistant::ui::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "recipe-assistant", version, about = "Chat with a recipe assistant in your browser")]
struct Args {
    /// Address to bind (overrides SERVER_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides SERVER_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Environment file to load instead of the nearest `.env`
    #[arg(long)]
    env_file: Option<PathBuf>,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Load an environment file whose values replace variables already set
fn load_env_file(path: Option<&Path>) -> dotenvy::Result<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path_override(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv_override(),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Process env is only written here, before any runtime threads exist
    let dotenv = load_env_file(args.env_file.as_deref());
    init_tracing();

    match dotenv {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(e) if e.not_found() => info!("No .env file found, using the process environment"),
        Err(e) => warn!("Could not load .env: {}", e),
    }

    info!("Loading configuration...");
    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Runtime error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Runtime error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!(model = %config.llm.model_id, region = %config.llm.region, "Initializing LLM...");
    let completion = CompletionConfig {
        temperature: config.llm.temperature,
        max_tokens: config.llm.max_tokens,
    };
    let gateway = BedrockGateway::new(config.llm).context("failed to create Bedrock gateway")?;

    if config.recipe_api.api_key.is_empty() {
        warn!("API_NINJA_KEY is not set; recipe lookups will be rejected");
    }
    let recipe_client =
        RecipeApiClient::new(config.recipe_api).context("failed to create recipe API client")?;
    let tools = ToolRegistry::new().with_tool(Box::new(RecipeTool::new(recipe_client)));

    let chat = ChatManager::builder(Arc::new(gateway))
        .tools(tools)
        .completion_config(completion)
        .build();

    info!("Launching chat interface...");
    ui::run(AppState::new(chat), &config.server.bind_addr())
        .await
        .context("server stopped")?;
    Ok(())
}
