//! Message and chat-history domain types.
//!
//! [`Message`] is the wire-level unit exchanged with a provider.
//! [`ChatMessage`] is the persisted conversation unit shown to the user.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Character instructions (the system entry)
    System,
    /// The end user
    User,
    /// A character's reply
    Assistant,
    /// A failed request, shown inline but never replayed to a model
    Error,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Error => "error",
        };
        f.write_str(s)
    }
}

/// A single provider message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Number of whitespace-separated words in the content.
    pub fn word_count(&self) -> usize {
        count_words(&self.content)
    }
}

/// The structured, in-character payload of a chat entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageContent {
    #[serde(default)]
    pub name: String,
    #[serde(alias = "answer")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

impl ChatMessageContent {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            plan: None,
        }
    }

    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    /// The JSON text sent to a provider when this entry is replayed.
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }
}

/// A persisted conversation entry.
///
/// The word count is derived from the content once, when the entry is
/// built, and is never set independently. Entries read back from a
/// snapshot keep the count they were stored with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub contact_id: String,
    pub role: Role,
    content: ChatMessageContent,
    word_count: usize,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ChatMessage {
    /// Build an entry stamped with the current time.
    pub fn new(contact_id: impl Into<String>, role: Role, content: ChatMessageContent) -> Self {
        Self::at(contact_id, role, content, Utc::now().timestamp_millis())
    }

    /// Build an entry with an explicit timestamp.
    pub fn at(
        contact_id: impl Into<String>,
        role: Role,
        content: ChatMessageContent,
        timestamp: i64,
    ) -> Self {
        let word_count = count_words(&content.to_wire());
        Self {
            contact_id: contact_id.into(),
            role,
            content,
            word_count,
            timestamp,
        }
    }

    pub fn content(&self) -> &ChatMessageContent {
        &self.content
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// The same entry carrying different content (word count recomputed).
    pub fn with_content(&self, content: ChatMessageContent) -> Self {
        Self::at(self.contact_id.clone(), self.role, content, self.timestamp)
    }

    /// Project down to a provider message.
    pub fn to_message(&self) -> Message {
        Message::new(self.role, self.content.to_wire())
    }
}

/// Count whitespace-separated words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
