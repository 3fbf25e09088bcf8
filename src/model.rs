//! Conversation and message records

use serde::Serialize;

/// Title shown for a conversation that has no messages yet
pub const DEFAULT_TITLE: &str = "New Chat";

/// Number of characters of the first user message kept as the title
pub const TITLE_MAX_CHARS: usize = 30;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

/// A reference attached to a model reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

impl Source {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
        }
    }
}

/// A single chat message. Immutable once appended to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            sources: None,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
            sources: None,
        }
    }

    #[must_use]
    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Sources as a slice, empty when the message carries none
    pub fn sources(&self) -> &[Source] {
        self.sources.as_deref().unwrap_or_default()
    }
}

/// A titled, append-only thread of messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    id: String,
    title: String,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message. The first user message of the thread freezes the title.
    pub fn push(&mut self, message: Message) {
        if message.role == Role::User && !self.messages.iter().any(|m| m.role == Role::User) {
            self.title = derive_title(&message.text);
        }
        self.messages.push(message);
    }
}

/// First `TITLE_MAX_CHARS` characters of `text`
pub fn derive_title(text: &str) -> String {
    text.chars().take(TITLE_MAX_CHARS).collect()
}
