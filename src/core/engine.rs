//! Chat engine
//!
//! Drives one user turn through the model, dispatching each reply to either
//! final display or tool execution. The tool round trip is an explicit loop
//! with a depth cap, not recursion: model call, tool run, tool result back
//! into the history, model call again, until a text reply lands.
//!
//! The conversation id is pinned when the turn starts. A reply that arrives
//! after the user switched conversations is appended to the conversation that
//! asked for it, never to whichever happens to be current.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::conversation::{Message, Part};
use crate::core::store::{ConversationStore, StoreError};
use crate::core::title;
use crate::providers::{ModelEndpoint, ProviderError};
use crate::tools::ToolExecutor;

/// Upper bound on model->tool->model round trips within one turn.
const MAX_TOOL_DEPTH: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("could not reach the assistant: {0}")]
    Network(String),

    #[error("the assistant service reported an error: {0}")]
    Service(String),

    #[error("unexpected reply from the assistant: {0}")]
    Format(String),

    #[error("tool `{name}` failed: {message}")]
    Tool { name: String, message: String },

    #[error("the assistant kept requesting tools without answering")]
    ToolDepthExceeded,

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<ProviderError> for ChatError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Network(e) => ChatError::Network(e.to_string()),
            ProviderError::Service { status, message } => {
                ChatError::Service(format!("{status}: {message}"))
            }
            ProviderError::Format(message) => ChatError::Format(message),
        }
    }
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        ChatError::Storage(err.to_string())
    }
}

/// A tool the model used during the turn, in call order.
#[derive(Debug, Clone)]
pub struct ToolUse {
    pub name: String,
}

/// A completed turn: the final text reply and what it took to get there.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub conversation_id: String,
    pub reply: String,
    pub tool_uses: Vec<ToolUse>,
}

#[derive(Debug)]
pub enum TurnOutcome {
    /// Guard rejected the submission: empty input, or a turn already in
    /// flight. Nothing was appended or persisted.
    Ignored,
    Completed(ChatTurn),
}

pub struct ChatEngine {
    store: Arc<ConversationStore>,
    model: Arc<dyn ModelEndpoint>,
    tools: Arc<dyn ToolExecutor>,
    thinking: AtomicBool,
    max_tool_depth: usize,
}

impl ChatEngine {
    pub fn new(
        store: Arc<ConversationStore>,
        model: Arc<dyn ModelEndpoint>,
        tools: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            store,
            model,
            tools,
            thinking: AtomicBool::new(false),
            max_tool_depth: MAX_TOOL_DEPTH,
        }
    }

    pub fn with_max_tool_depth(mut self, depth: usize) -> Self {
        self.max_tool_depth = depth;
        self
    }

    /// Whether a turn is currently in flight.
    pub fn is_thinking(&self) -> bool {
        self.thinking.load(Ordering::SeqCst)
    }

    /// Run one user turn. Errors are recoverable: the conversation keeps
    /// every message appended before the failure and the engine is ready for
    /// the next submission.
    pub async fn send_message(&self, input: &str) -> Result<TurnOutcome, ChatError> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }
        if self
            .thinking
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(TurnOutcome::Ignored);
        }

        let result = self.run_turn(text).await;
        self.thinking.store(false, Ordering::SeqCst);
        result
    }

    async fn run_turn(&self, text: &str) -> Result<TurnOutcome, ChatError> {
        let conversation_id = match self.store.current_id().await {
            Some(id) => id,
            None => self.store.create_conversation().await?,
        };

        self.store
            .append_message(&conversation_id, Message::user(text))
            .await?;

        let mut tool_uses = Vec::new();

        for _ in 0..self.max_tool_depth {
            let history = self.store.history(&conversation_id).await.ok_or_else(|| {
                ChatError::Storage(format!("conversation {conversation_id} disappeared mid-turn"))
            })?;

            let reply = self.model.send(&history).await?;
            // The raw reply goes into the history even when it is a function
            // call; the model needs its own call on the next round.
            self.store
                .append_message(&conversation_id, reply.clone())
                .await?;

            match reply.first_part() {
                Some(Part::Text { text }) => {
                    let reply_text = text.clone();
                    self.maybe_generate_title(&conversation_id).await;
                    return Ok(TurnOutcome::Completed(ChatTurn {
                        conversation_id,
                        reply: reply_text,
                        tool_uses,
                    }));
                }
                Some(Part::FunctionCall { function_call }) => {
                    let call = function_call.clone();
                    debug!(tool = %call.name, "model requested a tool");
                    tool_uses.push(ToolUse {
                        name: call.name.clone(),
                    });

                    let result = self
                        .tools
                        .execute(&call.name, &call.args)
                        .await
                        .map_err(|e| ChatError::Tool {
                            name: call.name.clone(),
                            message: e.to_string(),
                        })?;

                    // A 2xx body carrying `error` is a soft failure; it ends
                    // the turn the same way a hard one does.
                    if let Some(message) = result.get("error").and_then(Value::as_str) {
                        return Err(ChatError::Tool {
                            name: call.name,
                            message: message.to_string(),
                        });
                    }

                    self.store
                        .append_message(
                            &conversation_id,
                            Message::tool_response(&call.name, result),
                        )
                        .await?;
                }
                _ => {
                    return Err(ChatError::Format(
                        "reply had neither text nor a function call".to_string(),
                    ))
                }
            }
        }

        Err(ChatError::ToolDepthExceeded)
    }

    /// Fire-and-forget title generation after the very first exchange. Gated
    /// on the user-message count, so later turns never retrigger it.
    async fn maybe_generate_title(&self, conversation_id: &str) {
        if self.store.user_message_count(conversation_id).await != 1 {
            return;
        }
        let store = self.store.clone();
        let model = self.model.clone();
        let id = conversation_id.to_string();
        tokio::spawn(async move {
            title::generate_and_apply(store, model, id).await;
        });
    }
}
