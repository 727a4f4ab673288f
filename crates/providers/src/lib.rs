//! LLM provider implementations for CharChat.
//!
//! All providers implement the `charchat_core::Provider` trait.
//! The dispatcher selects the provider and extractor from the settings.

pub mod dispatch;
pub mod extract;
pub mod gemini;
pub mod openai;

pub use dispatch::{
    BindingResolver, ChatBinding, ProfileBinding, ProfileQuery, ProviderDispatcher,
    ProviderEndpoints,
};
pub use gemini::GeminiProvider;
pub use openai::{OpenAiImageGenerator, OpenAiProvider};
