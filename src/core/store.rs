//! Conversation store
//!
//! Owns the in-memory conversation map and the current-conversation pointer.
//! Every mutation serializes the whole map and writes it through the
//! [`KvStore`] before returning, so a crash between operations loses at most
//! the in-flight turn. The current pointer itself is derived state and is not
//! persisted; on startup it points at the most recently created conversation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::conversation::{Conversation, Message};
use crate::core::storage::{KvStore, CONVERSATIONS_KEY};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown conversation: {0}")]
    UnknownConversation(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// History-list entry. Listing order is newest-created-first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

#[derive(Default)]
struct State {
    conversations: HashMap<String, Conversation>,
    current: Option<String>,
}

impl State {
    fn newest_id(&self) -> Option<String> {
        self.conversations
            .values()
            .max_by_key(|c| c.created_at)
            .map(|c| c.id.clone())
    }
}

pub struct ConversationStore {
    kv: Arc<KvStore>,
    state: RwLock<State>,
}

impl ConversationStore {
    /// Restore the map from storage. The most recently created conversation
    /// becomes current, mirroring what a returning visitor expects to see.
    pub async fn load(kv: Arc<KvStore>) -> Result<Self, StoreError> {
        let conversations: HashMap<String, Conversation> = match kv.get(CONVERSATIONS_KEY).await? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => HashMap::new(),
        };

        let mut state = State {
            conversations,
            current: None,
        };
        state.current = state.newest_id();

        Ok(Self {
            kv,
            state: RwLock::new(state),
        })
    }

    async fn persist(&self, state: &State) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&state.conversations)?;
        self.kv.put(CONVERSATIONS_KEY, &raw).await?;
        Ok(())
    }

    /// Create an empty conversation, make it current, and return its id.
    pub async fn create_conversation(&self) -> Result<String, StoreError> {
        let mut state = self.state.write().await;
        let conversation = Conversation::new();
        let id = conversation.id.clone();
        state.conversations.insert(id.clone(), conversation);
        state.current = Some(id.clone());
        self.persist(&state).await?;
        Ok(id)
    }

    /// Make a conversation current and return its messages for display.
    /// Unknown ids are a silent no-op.
    pub async fn load_conversation(&self, id: &str) -> Option<Vec<Message>> {
        let mut state = self.state.write().await;
        let messages = state.conversations.get(id)?.messages.clone();
        state.current = Some(id.to_string());
        Some(messages)
    }

    /// Reset a conversation's messages, keeping the entry and its title.
    pub async fn clear_conversation(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let Some(conversation) = state.conversations.get_mut(id) else {
            return Ok(());
        };
        conversation.messages.clear();
        self.persist(&state).await
    }

    /// Remove a conversation. If it was current, the most recently created
    /// remaining conversation takes over (or none). Returns the new current id.
    pub async fn delete_conversation(&self, id: &str) -> Result<Option<String>, StoreError> {
        let mut state = self.state.write().await;
        if state.conversations.remove(id).is_none() {
            return Ok(state.current.clone());
        }
        if state.current.as_deref() == Some(id) {
            state.current = state.newest_id();
        }
        self.persist(&state).await?;
        Ok(state.current.clone())
    }

    /// Append to a conversation's message tail. The only mutation path during
    /// a chat turn; the caller pins the id, so a reply that arrives after the
    /// user switched conversations still lands where it belongs.
    pub async fn append_message(&self, id: &str, message: Message) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let conversation = state
            .conversations
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownConversation(id.to_string()))?;
        conversation.messages.push(message);
        self.persist(&state).await
    }

    /// Title write path for the title generator. Unknown ids are a silent
    /// no-op (the conversation may have been deleted while the call was out).
    pub async fn set_title(&self, id: &str, title: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let Some(conversation) = state.conversations.get_mut(id) else {
            return Ok(());
        };
        conversation.title = title.to_string();
        self.persist(&state).await
    }

    pub async fn current_id(&self) -> Option<String> {
        self.state.read().await.current.clone()
    }

    pub async fn history(&self, id: &str) -> Option<Vec<Message>> {
        let state = self.state.read().await;
        state.conversations.get(id).map(|c| c.messages.clone())
    }

    pub async fn snapshot(&self, id: &str) -> Option<Conversation> {
        let state = self.state.read().await;
        state.conversations.get(id).cloned()
    }

    pub async fn user_message_count(&self, id: &str) -> usize {
        let state = self.state.read().await;
        state
            .conversations
            .get(id)
            .map(|c| c.user_message_count())
            .unwrap_or(0)
    }

    /// History-list entries, newest-created-first.
    pub async fn summaries(&self) -> Vec<ConversationSummary> {
        let state = self.state.read().await;
        let mut summaries: Vec<ConversationSummary> = state
            .conversations
            .values()
            .map(|c| ConversationSummary {
                id: c.id.clone(),
                title: c.title.clone(),
                created_at: c.created_at,
                message_count: c.messages.len(),
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Conversation;
    use serde_json::json;

    async fn fresh_store() -> (Arc<KvStore>, ConversationStore) {
        let kv = Arc::new(KvStore::new_in_memory().await.unwrap());
        let store = ConversationStore::load(kv.clone()).await.unwrap();
        (kv, store)
    }

    #[tokio::test]
    async fn persisted_messages_reload_in_order() {
        let (kv, store) = fresh_store().await;
        let id = store.create_conversation().await.unwrap();

        store.append_message(&id, Message::user("hello")).await.unwrap();
        store
            .append_message(&id, Message::model("hi there"))
            .await
            .unwrap();
        store
            .append_message(
                &id,
                Message::tool_response("get_now_playing", json!({ "artist": "A" })),
            )
            .await
            .unwrap();

        let reloaded = ConversationStore::load(kv).await.unwrap();
        assert_eq!(
            reloaded.history(&id).await.unwrap(),
            store.history(&id).await.unwrap()
        );
        assert_eq!(reloaded.current_id().await.as_deref(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn create_sets_current_and_orders_newest_first() {
        let (_kv, store) = fresh_store().await;
        let first = store.create_conversation().await.unwrap();
        let second = store.create_conversation().await.unwrap();

        assert_eq!(store.current_id().await.as_deref(), Some(second.as_str()));

        let summaries = store.summaries().await;
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, second);
        assert_eq!(summaries[1].id, first);
        assert_eq!(summaries[0].title, Conversation::DEFAULT_TITLE);
    }

    #[tokio::test]
    async fn deleting_current_falls_back_to_newest_remaining() {
        let (_kv, store) = fresh_store().await;
        let first = store.create_conversation().await.unwrap();
        let second = store.create_conversation().await.unwrap();

        let current = store.delete_conversation(&second).await.unwrap();
        assert_eq!(current.as_deref(), Some(first.as_str()));
        assert_eq!(store.current_id().await.as_deref(), Some(first.as_str()));
    }

    #[tokio::test]
    async fn deleting_the_only_conversation_unsets_current() {
        let (_kv, store) = fresh_store().await;
        let id = store.create_conversation().await.unwrap();

        let current = store.delete_conversation(&id).await.unwrap();
        assert_eq!(current, None);
        assert_eq!(store.current_id().await, None);
        assert!(store.summaries().await.is_empty());
    }

    #[tokio::test]
    async fn deleting_non_current_keeps_current() {
        let (_kv, store) = fresh_store().await;
        let first = store.create_conversation().await.unwrap();
        let second = store.create_conversation().await.unwrap();

        store.delete_conversation(&first).await.unwrap();
        assert_eq!(store.current_id().await.as_deref(), Some(second.as_str()));
    }

    #[tokio::test]
    async fn clear_keeps_entry_and_title() {
        let (_kv, store) = fresh_store().await;
        let id = store.create_conversation().await.unwrap();
        store.append_message(&id, Message::user("hello")).await.unwrap();
        store.set_title(&id, "Music Talk").await.unwrap();

        store.clear_conversation(&id).await.unwrap();

        let conversation = store.snapshot(&id).await.unwrap();
        assert!(conversation.messages.is_empty());
        assert_eq!(conversation.title, "Music Talk");
    }

    #[tokio::test]
    async fn loading_unknown_conversation_is_a_no_op() {
        let (_kv, store) = fresh_store().await;
        let id = store.create_conversation().await.unwrap();

        assert!(store.load_conversation("nope").await.is_none());
        assert_eq!(store.current_id().await.as_deref(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn appending_to_unknown_conversation_fails() {
        let (_kv, store) = fresh_store().await;
        let err = store
            .append_message("nope", Message::user("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownConversation(_)));
    }
}
