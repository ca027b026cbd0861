//! Returning-visitor greeting
//!
//! A fixed storage key remembers when the visitor was last here. Returning
//! visitors get a short generated welcome-back line; first-time visitors get
//! nothing. Cosmetic, so every failure path degrades to `None`.

use chrono::{TimeZone, Utc};
use tracing::debug;

use crate::config::prompts;
use crate::core::storage::{KvStore, LAST_VISIT_KEY};
use crate::providers::ModelEndpoint;

pub async fn welcome_back(kv: &KvStore, model: &dyn ModelEndpoint, owner: &str) -> Option<String> {
    let previous = match kv.get(LAST_VISIT_KEY).await {
        Ok(value) => value
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Err(err) => {
            debug!(%err, "could not read last-visit timestamp");
            None
        }
    };

    // The visit counts whether or not a greeting gets generated.
    let now = Utc::now();
    if let Err(err) = kv
        .put(LAST_VISIT_KEY, &now.timestamp_millis().to_string())
        .await
    {
        debug!(%err, "could not update last-visit timestamp");
    }

    let previous = previous?;
    let prompt = prompts::greeting_prompt(previous, owner);
    match model.one_shot(&prompt).await {
        Ok(reply) => reply.first_text().map(|t| t.trim().to_string()),
        Err(err) => {
            debug!(%err, "greeting generation failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;
    use crate::providers::ProviderError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordedModel {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ModelEndpoint for RecordedModel {
        async fn send(&self, _history: &[Message]) -> Result<Message, ProviderError> {
            Ok(Message::model("unused"))
        }

        async fn one_shot(&self, prompt: &str) -> Result<Message, ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(Message::model("Welcome back!"))
        }
    }

    #[tokio::test]
    async fn first_visit_records_timestamp_without_greeting() {
        let kv = KvStore::new_in_memory().await.unwrap();
        let model = RecordedModel::default();

        let greeting = welcome_back(&kv, &model, "Ada").await;
        assert_eq!(greeting, None);
        assert!(kv.get(LAST_VISIT_KEY).await.unwrap().is_some());
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn return_visit_generates_a_greeting() {
        let kv = KvStore::new_in_memory().await.unwrap();
        let model = RecordedModel::default();

        welcome_back(&kv, &model, "Ada").await;
        let greeting = welcome_back(&kv, &model, "Ada").await;

        assert_eq!(greeting.as_deref(), Some("Welcome back!"));
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("returning to the website"));
    }
}
