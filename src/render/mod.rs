//! Message rendering
//!
//! Turns a role-tagged message text into displayable blocks. Model and tool
//! text is markdown; fenced code blocks are split out so the widget can
//! attach a copy-to-clipboard control to each. User text is escaped verbatim,
//! never interpreted. Rendering has no failure modes: anything the parser
//! cannot make sense of falls through as literal text.

use pulldown_cmark::{escape::escape_html, html, CodeBlockKind, Event, Options, Parser, Tag};
use serde::Serialize;

use crate::conversation::Role;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderBlock {
    /// Rich text rendered from markdown, or escaped plain text.
    Html { html: String },
    /// Fenced code block. `copyable` tells the widget to attach a copy
    /// control.
    Code {
        language: Option<String>,
        code: String,
        copyable: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedMessage {
    pub role: Role,
    pub blocks: Vec<RenderBlock>,
}

pub fn render_message(role: Role, text: &str) -> RenderedMessage {
    let blocks = match role {
        Role::User => vec![escaped_block(text)],
        Role::Model | Role::Tool => markdown_blocks(text),
    };
    RenderedMessage { role, blocks }
}

fn escaped_block(text: &str) -> RenderBlock {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = escape_html(&mut out, text);
    RenderBlock::Html { html: out }
}

fn markdown_blocks(text: &str) -> Vec<RenderBlock> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(text, options);

    let mut blocks = Vec::new();
    let mut pending: Vec<Event> = Vec::new();
    let mut code: Option<(Option<String>, String)> = None;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                flush_html(&mut blocks, &mut pending);
                let language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                code = Some((language, String::new()));
            }
            Event::End(Tag::CodeBlock(_)) => {
                if let Some((language, body)) = code.take() {
                    blocks.push(RenderBlock::Code {
                        language,
                        code: body,
                        copyable: true,
                    });
                }
            }
            Event::Text(chunk) if code.is_some() => {
                if let Some((_, body)) = code.as_mut() {
                    body.push_str(&chunk);
                }
            }
            other => pending.push(other),
        }
    }
    flush_html(&mut blocks, &mut pending);

    if blocks.is_empty() {
        blocks.push(escaped_block(text));
    }
    blocks
}

fn flush_html(blocks: &mut Vec<RenderBlock>, pending: &mut Vec<Event>) {
    if pending.is_empty() {
        return;
    }
    let mut out = String::new();
    html::push_html(&mut out, pending.drain(..));
    if !out.trim().is_empty() {
        blocks.push(RenderBlock::Html { html: out });
    }
}
