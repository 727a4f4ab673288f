//! Provider dispatch: resolves the settings' provider selection to a
//! completion client plus the matching response extractor.
//!
//! Two independent axes are resolved: `chat_response` for live chat turns
//! and `profile_generation` for new characters. Both are exhaustive
//! matches over [`TextProvider`], so adding a variant without a binding is
//! a compile error.

use std::sync::Arc;
use std::time::Duration;

use charchat_config::AppConfig;
use charchat_core::error::{ParseError, ProviderError};
use charchat_core::message::{ChatMessageContent, Message};
use charchat_core::profile::MetaFromAI;
use charchat_core::provider::{Provider, TextProvider};
use charchat_core::settings::Settings;

use crate::extract::{self, ChatExtractor, ProfileExtractor};
use crate::gemini::GeminiProvider;
use crate::openai::OpenAiProvider;

/// The placeholder replaced with the user's description in the profile prompt.
pub const PROFILE_TOKEN: &str = "%PROFILE%";

/// A completion client bound to the extractor for its output.
#[derive(Clone)]
pub struct ChatBinding {
    provider: Arc<dyn Provider>,
    extractor: ChatExtractor,
}

impl ChatBinding {
    pub fn new(provider: Arc<dyn Provider>, extractor: ChatExtractor) -> Self {
        Self { provider, extractor }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send the assembled prompt.
    pub async fn complete(&self, messages: Vec<Message>) -> Result<Message, ProviderError> {
        self.provider.complete(messages).await
    }

    /// Parse a reply produced by this binding's provider.
    pub fn extract(&self, reply: &Message) -> Result<ChatMessageContent, ParseError> {
        (self.extractor)(reply)
    }
}

/// How the profile prompt is handed to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileQuery {
    /// A system message followed by a user message.
    Messages,
    /// Both instructions joined into a single free-form prompt.
    Flattened,
}

/// A profile-generation client, its prompt templates and its extractor.
#[derive(Clone)]
pub struct ProfileBinding {
    provider: Arc<dyn Provider>,
    extractor: ProfileExtractor,
    query: ProfileQuery,
    system_entry: String,
    message_entry: String,
}

impl ProfileBinding {
    pub fn new(
        provider: Arc<dyn Provider>,
        extractor: ProfileExtractor,
        query: ProfileQuery,
        system_entry: impl Into<String>,
        message_entry: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            extractor,
            query,
            system_entry: system_entry.into(),
            message_entry: message_entry.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Ask the provider for a profile matching `description`.
    pub async fn generate(&self, description: &str) -> Result<Message, ProviderError> {
        match self.query {
            ProfileQuery::Messages => {
                let messages =
                    profile_messages(description, &self.system_entry, &self.message_entry);
                self.provider.complete(messages).await
            }
            ProfileQuery::Flattened => {
                let prompt = profile_query(description, &self.system_entry, &self.message_entry);
                self.provider.query(&prompt).await
            }
        }
    }

    pub fn extract(&self, reply: &Message) -> Result<MetaFromAI, ParseError> {
        (self.extractor)(reply)
    }
}

/// The profile prompt as a system + user message pair.
pub fn profile_messages(description: &str, system_entry: &str, message_entry: &str) -> Vec<Message> {
    vec![
        Message::system(system_entry),
        Message::user(message_entry.replace(PROFILE_TOKEN, description)),
    ]
}

/// The profile prompt flattened into one string.
pub fn profile_query(description: &str, system_entry: &str, message_entry: &str) -> String {
    let messages = profile_messages(description, system_entry, message_entry);
    format!("{} {}", messages[0].content, messages[1].content)
}

/// Resolves settings to bindings.
///
/// The orchestration layer depends on this trait rather than on concrete
/// providers.
pub trait BindingResolver: Send + Sync {
    fn chat(&self, settings: &Settings) -> ChatBinding;
    fn profile(&self, settings: &Settings) -> ProfileBinding;
}

/// Where each provider lives.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub openai_url: String,
    pub gemini_url: String,
    pub timeout: Duration,
}

impl ProviderEndpoints {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            openai_url: config.openai_url.clone(),
            gemini_url: config.gemini_url.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openai_url: crate::openai::DEFAULT_BASE_URL.into(),
            gemini_url: crate::gemini::DEFAULT_BASE_URL.into(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Builds real HTTP providers from the settings' selections.
#[derive(Debug, Clone, Default)]
pub struct ProviderDispatcher {
    endpoints: ProviderEndpoints,
}

impl ProviderDispatcher {
    pub fn new(endpoints: ProviderEndpoints) -> Self {
        Self { endpoints }
    }

    fn openai(&self, settings: &Settings, model: TextProvider) -> Arc<dyn Provider> {
        Arc::new(
            OpenAiProvider::new(&self.endpoints.openai_url, &settings.open_ai_key, model.model())
                .with_timeout(self.endpoints.timeout),
        )
    }

    fn gemini(&self, settings: &Settings) -> Arc<dyn Provider> {
        Arc::new(
            GeminiProvider::new(&self.endpoints.gemini_url, &settings.gemini_key)
                .with_model(TextProvider::GeminiPro.model())
                .with_timeout(self.endpoints.timeout),
        )
    }
}

impl BindingResolver for ProviderDispatcher {
    fn chat(&self, settings: &Settings) -> ChatBinding {
        match settings.chat_response {
            p @ (TextProvider::Gpt35Turbo | TextProvider::Gpt4) => ChatBinding::new(
                self.openai(settings, p),
                extract::extract_chat_response_openai,
            ),
            TextProvider::GeminiPro => ChatBinding::new(
                self.gemini(settings),
                extract::extract_chat_response_gemini,
            ),
        }
    }

    fn profile(&self, settings: &Settings) -> ProfileBinding {
        let system = &settings.profile_generator_system_entry;
        let message = &settings.profile_generator_message_entry;
        match settings.profile_generation {
            p @ (TextProvider::Gpt35Turbo | TextProvider::Gpt4) => ProfileBinding::new(
                self.openai(settings, p),
                extract::extract_profile_response_openai,
                ProfileQuery::Messages,
                system,
                message,
            ),
            TextProvider::GeminiPro => ProfileBinding::new(
                self.gemini(settings),
                extract::extract_profile_response_gemini,
                ProfileQuery::Flattened,
                system,
                message,
            ),
        }
    }
}
