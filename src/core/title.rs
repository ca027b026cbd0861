//! Conversation title generation
//!
//! Best-effort: a failed or empty result leaves the default title in place
//! and is only logged. Nothing here blocks the turn that triggered it.

use std::sync::Arc;

use tracing::debug;

use crate::config::prompts;
use crate::core::store::ConversationStore;
use crate::providers::ModelEndpoint;

pub async fn generate_and_apply(
    store: Arc<ConversationStore>,
    model: Arc<dyn ModelEndpoint>,
    conversation_id: String,
) {
    let Some(conversation) = store.snapshot(&conversation_id).await else {
        return;
    };

    let prompt = prompts::title_prompt(&conversation);
    let reply = match model.one_shot(&prompt).await {
        Ok(reply) => reply,
        Err(err) => {
            debug!(%err, "title generation failed");
            return;
        }
    };

    let Some(text) = reply.first_text() else {
        debug!("title reply carried no text");
        return;
    };

    let title = clean_title(text);
    if title.is_empty() {
        return;
    }

    if let Err(err) = store.set_title(&conversation_id, &title).await {
        debug!(%err, "could not persist generated title");
    }
}

/// Models like to decorate titles with quotes and trailing punctuation.
fn clean_title(raw: &str) -> String {
    raw.replace(['"', '*'], "")
        .trim()
        .trim_end_matches(['.', '!'])
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_title_decoration() {
        assert_eq!(clean_title("\"Rust Questions\"."), "Rust Questions");
        assert_eq!(clean_title("**Music Chat**"), "Music Chat");
        assert_eq!(clean_title("  Plain Title  "), "Plain Title");
        assert_eq!(clean_title("Done!"), "Done");
    }

    #[test]
    fn all_decoration_yields_empty() {
        assert_eq!(clean_title("\"\""), "");
    }
}
