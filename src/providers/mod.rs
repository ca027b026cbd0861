//! Model endpoint integrations

mod gemini;
mod proxy;

pub use gemini::GeminiEndpoint;
pub use proxy::ProxyEndpoint;

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::Message;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("invalid response: {0}")]
    Format(String),
}

/// A stateless chat model endpoint. The full history travels on every call;
/// nothing is remembered between calls.
#[async_trait]
pub trait ModelEndpoint: Send + Sync {
    /// Continue a conversation. The reply is the model's next message, which
    /// may carry text or a function call.
    async fn send(&self, history: &[Message]) -> Result<Message, ProviderError>;

    /// One-shot, historyless call. Used for titles and greetings.
    async fn one_shot(&self, prompt: &str) -> Result<Message, ProviderError>;
}
