//! Append-only chat transcript.

use std::sync::Arc;

use serde::Serialize;

use super::markup;
use super::{ChatView, NullView};

/// Who a message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Bot,
    Error,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Bot => write!(f, "bot"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Message body. User input is always literal so it can never change layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Content {
    Literal(String),
    Markup(String),
}

/// One displayed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Literal(text.into()),
        }
    }

    pub fn bot(markup: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            content: Content::Markup(markup.into()),
        }
    }

    pub fn error(markup: impl Into<String>) -> Self {
        Self {
            role: Role::Error,
            content: Content::Markup(markup.into()),
        }
    }

    /// Text as shown in a terminal.
    pub fn to_plain(&self) -> String {
        match &self.content {
            Content::Literal(text) => text.clone(),
            Content::Markup(markup) => markup::to_plain(markup),
        }
    }

    /// Text as safe inline HTML.
    pub fn to_html(&self) -> String {
        match &self.content {
            Content::Literal(text) => markup::escape_html(text),
            Content::Markup(markup) => markup::to_html(markup),
        }
    }

    /// The unrendered text, whichever kind it is.
    pub fn raw(&self) -> &str {
        match &self.content {
            Content::Literal(text) | Content::Markup(text) => text,
        }
    }
}

/// Ordered log of displayed messages.
pub struct Transcript {
    messages: Vec<Message>,
    /// Index of the message the view is scrolled to.
    scroll_anchor: Option<usize>,
    view: Arc<dyn ChatView>,
}

impl Transcript {
    pub fn new(view: Arc<dyn ChatView>) -> Self {
        Self {
            messages: Vec::new(),
            scroll_anchor: None,
            view,
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.scroll_anchor = Some(self.messages.len() - 1);
        if let Some(latest) = self.messages.last() {
            self.view.message_appended(latest);
        }
    }

    /// Drop every message at once.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.scroll_anchor = None;
        self.view.cleared();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn scroll_anchor(&self) -> Option<usize> {
        self.scroll_anchor
    }

    /// The whole log as an HTML fragment, one `div` per message.
    pub fn to_html(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("<div class=\"message {}\">{}</div>", m.role, m.to_html()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Roles in display order.
    pub fn roles(&self) -> Vec<Role> {
        self.messages.iter().map(|m| m.role).collect()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(Arc::new(NullView))
    }
}
