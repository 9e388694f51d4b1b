use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::llm::{ChatBubble, ChatManager, ChatUpdate};

const INDEX_HTML: &str = include_str!("index.html");

/// Shared server state: the single conversation of this process
#[derive(Clone)]
pub struct AppState {
    chat: Arc<Mutex<ChatManager>>,
}

impl AppState {
    pub fn new(chat: ChatManager) -> Self {
        Self {
            chat: Arc::new(Mutex::new(chat)),
        }
    }
}

/// Chat request from the UI
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

/// Non-streaming chat reply
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub history: Vec<ChatBubble>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<ChatBubble>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Run the HTTP server until it fails
pub async fn run(state: AppState, bind_addr: &str) -> Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Recipe assistant listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/clear", post(clear_handler))
        .route("/api/history", get(history_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Chat handler - POST /api/chat
async fn chat_handler(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let request_id = Uuid::new_v4();

    if request.message.trim().is_empty() {
        info!(%request_id, "Ignoring empty chat message");
        let history = state.chat.lock().await.chat_bubbles();
        return Json(ChatResponse {
            reply: String::new(),
            history,
        })
        .into_response();
    }

    if request.stream {
        stream_chat(state, request.message, request_id).into_response()
    } else {
        let span = info_span!("chat", %request_id, stream = false);
        complete_chat(state, request.message).instrument(span).await
    }
}

async fn complete_chat(state: AppState, message: String) -> Response {
    let mut chat = state.chat.lock().await;

    match chat.send(&message).await {
        Ok(reply) => Json(ChatResponse {
            reply,
            history: chat.chat_bubbles(),
        })
        .into_response(),
        Err(e) => {
            error!("Chat failed: {}", e);
            let error_response = ErrorResponse {
                error: e.to_string(),
            };
            (StatusCode::BAD_GATEWAY, Json(error_response)).into_response()
        }
    }
}

/// Stream a chat turn as Server-Sent Events.
///
/// The chat lock is held until the stream ends or the client disconnects.
fn stream_chat(
    state: AppState,
    message: String,
    request_id: Uuid,
) -> Sse<impl futures::Stream<Item = std::result::Result<Event, Infallible>>> {
    let span = info_span!("chat", %request_id, stream = true);

    let events = async_stream::stream! {
        let mut chat = state.chat.clone().lock_owned().instrument(span.clone()).await;
        let mut updates = chat.send_stream(&message);

        while let Some(update) = updates.next().instrument(span.clone()).await {
            match update {
                Ok(update) => {
                    yield Ok::<Event, Infallible>(update_event(&update));
                }
                Err(e) => {
                    span.in_scope(|| error!("Chat stream failed: {}", e));
                    yield Ok::<Event, Infallible>(error_event(&e.to_string()));
                    break;
                }
            }
        }
    };

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn update_event(update: &ChatUpdate) -> Event {
    let name = match update {
        ChatUpdate::Text { .. } => "text",
        ChatUpdate::ToolResult { .. } => "tool",
        ChatUpdate::Done { .. } => "done",
    };
    json_event(name, update)
}

fn error_event(message: &str) -> Event {
    json_event(
        "error",
        &ErrorResponse {
            error: message.to_string(),
        },
    )
}

fn json_event<T: Serialize>(name: &str, data: &T) -> Event {
    let data = serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(name).data(data)
}

/// Clear handler - POST /api/clear
async fn clear_handler(State(state): State<AppState>) -> Json<HistoryResponse> {
    let mut chat = state.chat.lock().await;
    chat.clear_history();
    Json(HistoryResponse {
        history: chat.chat_bubbles(),
    })
}

async fn history_handler(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        history: state.chat.lock().await.chat_bubbles(),
    })
}
