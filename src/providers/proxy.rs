//! Relay endpoint client
//!
//! Speaks the deployment-facing contract: `POST` a JSON body carrying either
//! `history` (conversation continuation) or `prompt` (one-shot), and receive
//! `{ "response": Message }`. Non-2xx replies carry `{ "message": ... }`.
//! Lets the engine run against a remote deployment of this service instead of
//! calling Gemini directly.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::conversation::Message;

use super::{ModelEndpoint, ProviderError};

pub struct ProxyEndpoint {
    client: Client,
    url: String,
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<&'a [Message]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    response: Message,
}

#[derive(Debug, Deserialize)]
struct RelayFailure {
    message: String,
}

impl ProxyEndpoint {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn call(&self, request: RelayRequest<'_>) -> Result<Message, ProviderError> {
        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<RelayFailure>(&raw)
                .map(|f| f.message)
                .unwrap_or(raw);
            return Err(ProviderError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let body: RelayResponse =
            serde_json::from_str(&raw).map_err(|e| ProviderError::Format(e.to_string()))?;
        Ok(body.response)
    }
}

#[async_trait::async_trait]
impl ModelEndpoint for ProxyEndpoint {
    async fn send(&self, history: &[Message]) -> Result<Message, ProviderError> {
        self.call(RelayRequest {
            history: Some(history),
            prompt: None,
        })
        .await
    }

    async fn one_shot(&self, prompt: &str) -> Result<Message, ProviderError> {
        self.call(RelayRequest {
            history: None,
            prompt: Some(prompt),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn one_shot_body_omits_history() {
        let request = RelayRequest {
            history: None,
            prompt: Some("summarize this"),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "prompt": "summarize this" })
        );
    }

    #[test]
    fn history_body_matches_contract() {
        let history = vec![Message::user("hi")];
        let request = RelayRequest {
            history: Some(&history),
            prompt: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "history": [{ "role": "user", "parts": [{ "text": "hi" }] }] })
        );
    }

    #[test]
    fn parses_relay_response() {
        let body: RelayResponse = serde_json::from_value(json!({
            "response": { "role": "model", "parts": [{ "text": "Hi there!" }] }
        }))
        .unwrap();
        assert_eq!(body.response.first_text(), Some("Hi there!"));
    }
}
