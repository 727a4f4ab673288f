//! # CharChat Chat
//!
//! The conversation core: system-entry assembly, the word-budgeted
//! history window and the orchestration of chat turns, group turns and
//! character creation.

pub mod dispatch;
pub mod history;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use dispatch::ChatDispatcher;
pub use history::{MAX_WORD_BUDGET, clean_and_limit_messages_size};
pub use prompt::{TemplateTokens, replace_all_tokens, write_system_entry};
