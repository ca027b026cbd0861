//! Prompt templates
//!
//! The built-in system instruction plus the derived prompts (titles,
//! greetings). A deployment can replace the persona with a TOML file:
//!
//! ```toml
//! [persona]
//! name = "Site Assistant"
//!
//! [system_prompt]
//! content = """
//! You are the assistant for ...
//! """
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

use crate::conversation::Conversation;

/// The assistant's default persona.
pub fn system_instruction(owner: &str) -> String {
    format!(
        "You are {owner}'s AI assistant. You are creative, concise, and helpful. \
         You can use tools to get real-time information about the current time in India \
         and what music {owner} is listening to. For general conversation, respond directly."
    )
}

/// Summarization prompt for the title generator. Embeds every text-bearing
/// line of the conversation so far.
pub fn title_prompt(conversation: &Conversation) -> String {
    let transcript = conversation
        .messages
        .iter()
        .filter_map(|m| m.first_text().map(|t| format!("{}: {}", m.role, t)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Based on the following conversation, create a very short, concise title \
         (3-5 words max).\n\nConversation:\n{transcript}"
    )
}

/// Welcome-back prompt for returning visitors.
pub fn greeting_prompt(last_visit: DateTime<Utc>, owner: &str) -> String {
    format!(
        "The user is returning to the website. Their last visit was {}. \
         Generate a very short, friendly, and creative welcome back message \
         (1-2 sentences). You are {owner}'s AI assistant.",
        last_visit.format("%B %-d, %Y at %H:%M UTC")
    )
}

#[derive(Debug, Deserialize)]
pub struct PersonaFile {
    pub persona: PersonaInfo,
    pub system_prompt: SystemPrompt,
}

#[derive(Debug, Deserialize)]
pub struct PersonaInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct SystemPrompt {
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    #[error("could not read persona file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse persona file: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_persona(path: &Path) -> Result<PersonaFile, PersonaError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;

    #[test]
    fn title_prompt_embeds_text_lines_only() {
        let mut conversation = Conversation::new();
        conversation.messages.push(Message::user("hello"));
        conversation.messages.push(Message::model("Hi there!"));
        conversation.messages.push(Message::tool_response(
            "get_now_playing",
            serde_json::json!({ "artist": "A" }),
        ));

        let prompt = title_prompt(&conversation);
        assert!(prompt.contains("user: hello"));
        assert!(prompt.contains("model: Hi there!"));
        assert!(!prompt.contains("get_now_playing"));
    }

    #[test]
    fn greeting_prompt_mentions_last_visit() {
        let last_visit = DateTime::parse_from_rfc3339("2025-06-01T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let prompt = greeting_prompt(last_visit, "Ada");
        assert!(prompt.contains("June 1, 2025"));
        assert!(prompt.contains("Ada's AI assistant"));
    }

    #[test]
    fn parses_persona_file() {
        let raw = r#"
[persona]
name = "Test Persona"

[system_prompt]
content = "You are a test assistant."
"#;
        let persona: PersonaFile = toml::from_str(raw).unwrap();
        assert_eq!(persona.persona.name, "Test Persona");
        assert_eq!(persona.system_prompt.content, "You are a test assistant.");
        assert!(persona.persona.description.is_empty());
    }
}
