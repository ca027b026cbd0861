//! Conversation types and wire format
//!
//! Messages use the Gemini "contents" shape: a role plus an ordered list of
//! parts, where each part is tagged by field presence (`text`, `functionCall`,
//! or `functionResponse`). The engine only ever inspects the first part.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A model-issued request to run a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default = "empty_args")]
    pub args: Value,
}

/// The result of a tool run, fed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

fn empty_args() -> Value {
    Value::Object(serde_json::Map::new())
}

/// One segment of a message. Closed union: anything else on the wire is a
/// format error, never a silently misread field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// A tool-role message wrapping the result of a tool run.
    pub fn tool_response(name: impl Into<String>, response: Value) -> Self {
        Self {
            role: Role::Tool,
            parts: vec![Part::FunctionResponse {
                function_response: FunctionResponse {
                    name: name.into(),
                    response,
                },
            }],
        }
    }

    pub fn first_part(&self) -> Option<&Part> {
        self.parts.first()
    }

    /// Text of the first part, if the first part carries text.
    pub fn first_text(&self) -> Option<&str> {
        match self.parts.first() {
            Some(Part::Text { text }) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub const DEFAULT_TITLE: &'static str = "New Chat";

    /// A fresh, empty conversation with a unique id.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: Self::DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Number of user turns so far.
    pub fn user_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_message_wire_shape() {
        let message = Message::user("hi");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value, json!({ "role": "user", "parts": [{ "text": "hi" }] }));
    }

    #[test]
    fn parses_function_call_part() {
        let raw = json!({
            "role": "model",
            "parts": [{ "functionCall": { "name": "get_now_playing", "args": {} } }]
        });
        let message: Message = serde_json::from_value(raw).unwrap();
        match message.first_part() {
            Some(Part::FunctionCall { function_call }) => {
                assert_eq!(function_call.name, "get_now_playing");
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn function_call_args_default_to_empty_object() {
        let raw = json!({
            "role": "model",
            "parts": [{ "functionCall": { "name": "get_current_time" } }]
        });
        let message: Message = serde_json::from_value(raw).unwrap();
        match message.first_part() {
            Some(Part::FunctionCall { function_call }) => {
                assert_eq!(function_call.args, json!({}));
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn tool_response_round_trips() {
        let message = Message::tool_response("get_now_playing", json!({ "artist": "A" }));
        let raw = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, message);
        assert_eq!(back.role, Role::Tool);
    }

    #[test]
    fn unrecognized_part_shape_is_an_error() {
        let raw = json!({
            "role": "model",
            "parts": [{ "inlineData": { "mimeType": "image/png" } }]
        });
        assert!(serde_json::from_value::<Message>(raw).is_err());
    }

    #[test]
    fn counts_user_messages_only() {
        let mut conversation = Conversation::new();
        conversation.messages.push(Message::user("one"));
        conversation.messages.push(Message::model("reply"));
        conversation.messages.push(Message::user("two"));
        assert_eq!(conversation.user_message_count(), 2);
    }
}
