//! Google Gemini `generateContent` endpoint
//!
//! Every call carries the system instruction and the tool declarations, so
//! the model can either answer directly or request a tool by name.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::conversation::Message;
use crate::tools::ToolDeclaration;

use super::{ModelEndpoint, ProviderError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// Shown when the model returns an empty candidate list.
const EMPTY_REPLY: &str = "I'm sorry, I couldn't generate a response. Please try again.";

pub struct GeminiEndpoint {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    system_instruction: String,
    tools: Vec<ToolDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Instruction<'a>,
    contents: &'a [Message],
    tools: Vec<ToolGroup<'a>>,
}

#[derive(Debug, Serialize)]
struct Instruction<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolGroup<'a> {
    function_declarations: &'a [ToolDeclaration],
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Message,
}

impl GeminiEndpoint {
    pub fn new(
        client: Client,
        api_key: impl Into<String>,
        system_instruction: impl Into<String>,
        tools: Vec<ToolDeclaration>,
    ) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            system_instruction: system_instruction.into(),
            tools,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn request_body<'a>(&'a self, contents: &'a [Message]) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Instruction {
                parts: vec![TextPart {
                    text: &self.system_instruction,
                }],
            },
            contents,
            tools: vec![ToolGroup {
                function_declarations: &self.tools,
            }],
        }
    }

    async fn generate(&self, contents: &[Message]) -> Result<Message, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(contents))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Service { status, message });
        }

        let raw = response.text().await?;
        let body: GenerateResponse =
            serde_json::from_str(&raw).map_err(|e| ProviderError::Format(e.to_string()))?;

        Ok(reply_from(body))
    }
}

fn reply_from(body: GenerateResponse) -> Message {
    body.candidates
        .into_iter()
        .next()
        .map(|c| c.content)
        .unwrap_or_else(|| Message::model(EMPTY_REPLY))
}

#[async_trait::async_trait]
impl ModelEndpoint for GeminiEndpoint {
    async fn send(&self, history: &[Message]) -> Result<Message, ProviderError> {
        self.generate(history).await
    }

    async fn one_shot(&self, prompt: &str) -> Result<Message, ProviderError> {
        self.generate(&[Message::user(prompt)]).await
    }
}
