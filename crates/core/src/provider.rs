//! Provider traits: the abstraction over LLM and image backends.
//!
//! A [`Provider`] takes an ordered list of messages and returns one reply.
//! Which provider answers is chosen by a [`TextProvider`] value stored in
//! the settings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// The closed set of text providers a user can select.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextProvider {
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[default]
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gemini-pro")]
    GeminiPro,
}

impl TextProvider {
    pub const ALL: [TextProvider; 3] = [
        TextProvider::Gpt35Turbo,
        TextProvider::Gpt4,
        TextProvider::GeminiPro,
    ];

    /// The model identifier sent on the wire.
    pub fn model(&self) -> &'static str {
        match self {
            TextProvider::Gpt35Turbo => "gpt-3.5-turbo",
            TextProvider::Gpt4 => "gpt-4",
            TextProvider::GeminiPro => "gemini-pro",
        }
    }
}

impl std::fmt::Display for TextProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.model())
    }
}

impl std::str::FromStr for TextProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TextProvider::ALL
            .into_iter()
            .find(|p| p.model() == s)
            .ok_or_else(|| format!("unknown text provider '{s}'"))
    }
}

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The dispatcher calls
/// `complete()` without knowing which provider is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "gemini").
    fn name(&self) -> &str;

    /// Send the messages and get the raw reply.
    async fn complete(&self, messages: Vec<Message>) -> Result<Message, ProviderError>;

    /// Send a single free-form prompt.
    ///
    /// Default implementation wraps the prompt as one user message.
    async fn query(&self, prompt: &str) -> Result<Message, ProviderError> {
        self.complete(vec![Message::user(prompt)]).await
    }

    /// List available models for this provider.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}

/// A base64-encoded image.
pub type B64Image = String;

/// Turns a textual prompt into an avatar image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<B64Image, ProviderError>;
}
