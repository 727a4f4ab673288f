//! # CharChat Core
//!
//! Domain types, traits, and error definitions shared by every CharChat
//! crate: provider messages, persisted chat entries, character profiles,
//! contacts, settings and the application state snapshot.
//!
//! Every collaborator (LLM provider, image generator, state store,
//! application store) is a trait here. Implementations live in their
//! respective crates.

pub mod contact;
pub mod error;
pub mod event;
pub mod message;
pub mod profile;
pub mod provider;
pub mod settings;
pub mod state;
pub mod templates;

// Re-export key types at crate root for ergonomics
pub use contact::{BotContact, Contact, GroupChatContact, LoadingContact};
pub use error::{Error, MigrationError, ParseError, ProviderError, Result, StateError};
pub use event::{ActionBus, StoreAction, StoreDispatch};
pub use message::{ChatMessage, ChatMessageContent, Message, Role, count_words};
pub use profile::{AvatarMeta, GroupMeta, MetaFromAI};
pub use provider::{B64Image, ImageGenerator, Provider, TextProvider};
pub use settings::Settings;
pub use state::{AppState, CURRENT_VERSION, CURRENT_VERSION_KEY, StateStore};
