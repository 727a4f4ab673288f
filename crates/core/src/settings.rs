//! User settings: provider selection, credentials and prompt templates.

use serde::{Deserialize, Serialize};

use crate::provider::TextProvider;
use crate::templates;

/// Settings owned by the surrounding application. Read-only to the chat core.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_short_info: String,
    #[serde(default)]
    pub open_ai_key: String,
    #[serde(default)]
    pub gemini_key: String,
    /// Which provider answers live chat turns.
    #[serde(default)]
    pub chat_response: TextProvider,
    /// Which provider generates new character profiles.
    #[serde(default)]
    pub profile_generation: TextProvider,
    /// Default system entry for newly created characters.
    #[serde(default = "default_system_entry")]
    pub system_entry: String,
    #[serde(default = "default_profile_generator_system")]
    pub profile_generator_system_entry: String,
    #[serde(default = "default_profile_generator_message")]
    pub profile_generator_message_entry: String,
    #[serde(default = "default_single_bot_context")]
    pub single_bot_system_entry_context: String,
    #[serde(default = "default_chat_group_context")]
    pub chat_group_system_entry_context: String,
}

fn default_system_entry() -> String {
    templates::DEFAULT_SYSTEM_ENTRY.into()
}
fn default_profile_generator_system() -> String {
    templates::DEFAULT_PROFILE_GENERATOR_SYSTEM.into()
}
fn default_profile_generator_message() -> String {
    templates::DEFAULT_PROFILE_GENERATOR_MESSAGE.into()
}
fn default_single_bot_context() -> String {
    templates::DEFAULT_SINGLE_BOT_CONTEXT.into()
}
fn default_chat_group_context() -> String {
    templates::DEFAULT_CHAT_GROUP_CONTEXT.into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_name: String::new(),
            user_short_info: String::new(),
            open_ai_key: String::new(),
            gemini_key: String::new(),
            chat_response: TextProvider::default(),
            profile_generation: TextProvider::default(),
            system_entry: default_system_entry(),
            profile_generator_system_entry: default_profile_generator_system(),
            profile_generator_message_entry: default_profile_generator_message(),
            single_bot_system_entry_context: default_single_bot_context(),
            chat_group_system_entry_context: default_chat_group_context(),
        }
    }
}

fn redact(s: &str) -> &'static str {
    if s.is_empty() { "None" } else { "[REDACTED]" }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("user_name", &self.user_name)
            .field("user_short_info", &self.user_short_info)
            .field("open_ai_key", &redact(&self.open_ai_key))
            .field("gemini_key", &redact(&self.gemini_key))
            .field("chat_response", &self.chat_response)
            .field("profile_generation", &self.profile_generation)
            .finish_non_exhaustive()
    }
}
