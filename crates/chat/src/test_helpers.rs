//! Shared test helpers for dispatch tests.

use async_trait::async_trait;
use charchat_core::error::ProviderError;
use charchat_core::event::{StoreAction, StoreDispatch};
use charchat_core::message::Message;
use charchat_core::provider::{B64Image, ImageGenerator, Provider};
use charchat_core::settings::Settings;
use charchat_providers::dispatch::{
    BindingResolver, ChatBinding, ProfileBinding, ProfileQuery,
};
use charchat_providers::extract;
use std::sync::{Arc, Mutex};

/// A mock provider that returns a sequence of scripted replies.
///
/// Each call to `complete` or `query` returns the next reply in the queue
/// and records the prompt it was given. Panics if more calls are made
/// than replies provided.
pub struct SequentialMockProvider {
    replies: Mutex<Vec<Result<Message, ProviderError>>>,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl SequentialMockProvider {
    pub fn new(replies: Vec<Result<Message, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(Message::assistant(text))])
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Every prompt received so far.
    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().unwrap().clone()
    }

    fn next(&self, prompt: Vec<Message>) -> Result<Message, ProviderError> {
        let count = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt);
            prompts.len()
        };
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| panic!("SequentialMockProvider: no more replies (call #{count})"))
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<Message, ProviderError> {
        self.next(messages)
    }

    async fn query(&self, prompt: &str) -> Result<Message, ProviderError> {
        self.next(vec![Message::user(prompt)])
    }
}

/// Resolves every selection to the same scripted providers.
pub struct MockResolver {
    pub chat: Arc<SequentialMockProvider>,
    pub profile: Arc<SequentialMockProvider>,
}

impl MockResolver {
    pub fn chat_only(chat: SequentialMockProvider) -> Self {
        Self {
            chat: Arc::new(chat),
            profile: Arc::new(SequentialMockProvider::new(vec![])),
        }
    }

    pub fn profile_only(profile: SequentialMockProvider) -> Self {
        Self {
            chat: Arc::new(SequentialMockProvider::new(vec![])),
            profile: Arc::new(profile),
        }
    }
}

impl BindingResolver for MockResolver {
    fn chat(&self, _settings: &Settings) -> ChatBinding {
        ChatBinding::new(self.chat.clone(), extract::extract_chat_response_openai)
    }

    fn profile(&self, settings: &Settings) -> ProfileBinding {
        ProfileBinding::new(
            self.profile.clone(),
            extract::extract_profile_response_openai,
            ProfileQuery::Messages,
            &settings.profile_generator_system_entry,
            &settings.profile_generator_message_entry,
        )
    }
}

/// Returns a fixed image, or fails when built with `None`.
pub struct MockImages {
    image: Option<B64Image>,
    prompts: Mutex<Vec<String>>,
}

impl MockImages {
    pub fn new(image: Option<&str>) -> Self {
        Self {
            image: image.map(String::from),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for MockImages {
    async fn generate(&self, prompt: &str) -> Result<B64Image, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.image
            .clone()
            .ok_or_else(|| ProviderError::network("image service unreachable"))
    }
}

/// Records every action, with batch boundaries.
#[derive(Default)]
pub struct RecordingDispatch {
    batches: Mutex<Vec<Vec<StoreAction>>>,
}

impl RecordingDispatch {
    pub fn batches(&self) -> Vec<Vec<StoreAction>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<StoreAction> {
        self.batches().into_iter().flatten().collect()
    }
}

impl StoreDispatch for RecordingDispatch {
    fn dispatch(&self, action: StoreAction) {
        self.batches.lock().unwrap().push(vec![action]);
    }

    fn batch(&self, actions: Vec<StoreAction>) {
        self.batches.lock().unwrap().push(actions);
    }
}
