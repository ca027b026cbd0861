//! HTTP tool executor
//!
//! Client side of the tool endpoint contract: `POST { toolName, args }`, any
//! 2xx body is the tool result (soft errors included), non-2xx is a hard
//! failure.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::{ToolError, ToolExecutor};

pub struct RelayToolExecutor {
    client: Client,
    url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayCall<'a> {
    tool_name: &'a str,
    args: &'a Value,
}

impl RelayToolExecutor {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ToolExecutor for RelayToolExecutor {
    async fn execute(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        let response = self
            .client
            .post(&self.url)
            .json(&RelayCall {
                tool_name: name,
                args,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Endpoint {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_body_matches_contract() {
        let args = json!({});
        let call = RelayCall {
            tool_name: "get_now_playing",
            args: &args,
        };
        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({ "toolName": "get_now_playing", "args": {} })
        );
    }
}
