//! API routes
//!
//! Three surfaces share the router: the chat API driving the engine, the
//! relay endpoints exposing the raw model/tool contracts for thin clients,
//! and the widget helpers (now-playing, greeting).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::conversation::{Message, Role};
use crate::core::engine::TurnOutcome;
use crate::core::greeting;
use crate::core::store::ConversationSummary;
use crate::providers::{ModelEndpoint, ProviderError};
use crate::render::{self, RenderBlock, RenderedMessage};
use crate::tools::{now_playing, ToolExecutor};
use crate::AppState;

const NO_ART_PLACEHOLDER: &str = "https://placehold.co/64x64/333333/ffffff?text=No+Art";

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
struct FailureBody {
    message: String,
}

fn failure(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<FailureBody>) {
    (
        status,
        Json(FailureBody {
            message: message.into(),
        }),
    )
}

// --- model relay ---

#[derive(Debug, Deserialize)]
struct AssistantRequest {
    history: Option<Vec<Message>>,
    prompt: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssistantResponse {
    response: Message,
}

async fn assistant(
    State(state): State<AppState>,
    Json(request): Json<AssistantRequest>,
) -> Result<Json<AssistantResponse>, (StatusCode, Json<FailureBody>)> {
    let result = match (&request.history, &request.prompt) {
        (Some(history), _) => state.model.send(history).await,
        (None, Some(prompt)) => state.model.one_shot(prompt).await,
        (None, None) => {
            return Err(failure(
                StatusCode::BAD_REQUEST,
                "Request body must contain \"history\" or \"prompt\".",
            ))
        }
    };

    match result {
        Ok(response) => Ok(Json(AssistantResponse { response })),
        Err(err) => {
            tracing::error!(%err, "model relay call failed");
            let status = match &err {
                ProviderError::Service { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                _ => StatusCode::BAD_GATEWAY,
            };
            Err(failure(
                status,
                "An error occurred while communicating with the AI. Please try again.",
            ))
        }
    }
}

// --- tool relay ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallRequest {
    tool_name: String,
    #[serde(default)]
    args: Value,
}

async fn execute_tool(
    State(state): State<AppState>,
    Json(request): Json<ToolCallRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.tools.execute(&request.tool_name, &request.args).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "An internal error occurred.", "details": err.to_string() })),
        )),
    }
}

// --- widgets ---

async fn now_playing_widget(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let Some(config) = &state.lastfm else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Server configuration error for music service." })),
        );
    };

    match now_playing::fetch_now_playing(&state.http, config).await {
        Ok(Some(track)) => (
            StatusCode::OK,
            Json(json!({
                "artist": track.artist,
                "name": track.song,
                "album": track.album,
                "imageUrl": track.image_url.unwrap_or_else(|| NO_ART_PLACEHOLDER.to_string()),
            })),
        ),
        Ok(None) => (
            StatusCode::OK,
            Json(json!({ "message": "No track is currently playing on Last.fm." })),
        ),
        Err(err) => {
            tracing::warn!(%err, "now-playing lookup failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "message": "Could not connect to the music service." })),
            )
        }
    }
}

#[derive(Debug, Serialize)]
struct GreetingResponse {
    greeting: Option<String>,
}

async fn visitor_greeting(State(state): State<AppState>) -> Json<GreetingResponse> {
    let greeting =
        greeting::welcome_back(&state.kv, state.model.as_ref(), &state.config.site_owner).await;
    Json(GreetingResponse { greeting })
}

// --- chat ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatSendRequest {
    conversation_id: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatSendResponse {
    /// "ok", "error", or "ignored" (guard rejected the submission).
    status: &'static str,
    conversation_id: Option<String>,
    reply: Option<String>,
    error: Option<String>,
    tool_calls: Vec<String>,
    blocks: Vec<RenderBlock>,
}

async fn chat_send(
    State(state): State<AppState>,
    Json(request): Json<ChatSendRequest>,
) -> Json<ChatSendResponse> {
    if let Some(id) = &request.conversation_id {
        // unknown ids fall through silently; the engine then uses whatever
        // conversation is current
        let _ = state.store.load_conversation(id).await;
    }

    match state.engine.send_message(&request.message).await {
        Ok(TurnOutcome::Completed(turn)) => {
            let blocks = render::render_message(Role::Model, &turn.reply).blocks;
            Json(ChatSendResponse {
                status: "ok",
                conversation_id: Some(turn.conversation_id),
                reply: Some(turn.reply),
                error: None,
                tool_calls: turn.tool_uses.into_iter().map(|t| t.name).collect(),
                blocks,
            })
        }
        Ok(TurnOutcome::Ignored) => Json(ChatSendResponse {
            status: "ignored",
            conversation_id: state.store.current_id().await,
            reply: None,
            error: None,
            tool_calls: Vec::new(),
            blocks: Vec::new(),
        }),
        Err(err) => Json(ChatSendResponse {
            status: "error",
            conversation_id: state.store.current_id().await,
            reply: None,
            error: Some(format!("Error: {err}")),
            tool_calls: Vec::new(),
            blocks: Vec::new(),
        }),
    }
}

/// Drives the widget's input-disabled / thinking indicator state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatStatusResponse {
    thinking: bool,
    current_conversation_id: Option<String>,
}

async fn chat_status(State(state): State<AppState>) -> Json<ChatStatusResponse> {
    Json(ChatStatusResponse {
        thinking: state.engine.is_thinking(),
        current_conversation_id: state.store.current_id().await,
    })
}

// --- conversation CRUD ---

async fn list_conversations(State(state): State<AppState>) -> Json<Vec<ConversationSummary>> {
    Json(state.store.summaries().await)
}

async fn create_conversation(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<FailureBody>)> {
    match state.store.create_conversation().await {
        Ok(id) => Ok(Json(json!({ "id": id }))),
        Err(err) => {
            tracing::error!(%err, "could not create conversation");
            Err(failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not create a conversation.",
            ))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationView {
    id: String,
    title: String,
    messages: Vec<Message>,
    /// Displayable transcript: only the text-bearing messages, rendered.
    rendered: Vec<RenderedMessage>,
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, StatusCode> {
    // loading also makes it current, like picking it in the history list
    state
        .store
        .load_conversation(&id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    let conversation = state.store.snapshot(&id).await.ok_or(StatusCode::NOT_FOUND)?;

    let rendered = conversation
        .messages
        .iter()
        .filter_map(|m| m.first_text().map(|t| render::render_message(m.role, t)))
        .collect();

    Ok(Json(ConversationView {
        id: conversation.id,
        title: conversation.title,
        messages: conversation.messages,
        rendered,
    }))
}

async fn clear_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<FailureBody>)> {
    match state.store.clear_conversation(&id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(err) => {
            tracing::error!(%err, "could not clear conversation");
            Err(failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not clear the conversation.",
            ))
        }
    }
}

async fn remove_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<FailureBody>)> {
    match state.store.delete_conversation(&id).await {
        Ok(current) => Ok(Json(json!({ "currentConversationId": current }))),
        Err(err) => {
            tracing::error!(%err, "could not delete conversation");
            Err(failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not delete the conversation.",
            ))
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/assistant", post(assistant))
        .route("/api/tools", post(execute_tool))
        .route("/api/now-playing", get(now_playing_widget))
        .route("/api/greeting", get(visitor_greeting))
        .route("/api/chat", post(chat_send))
        .route("/api/chat/status", get(chat_status))
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/api/conversations/:id",
            get(get_conversation).delete(remove_conversation),
        )
        .route("/api/conversations/:id/clear", post(clear_conversation))
}
