//! Shared setup for commands that work on the stored state.

use std::sync::Arc;
use std::time::Duration;

use charchat_chat::ChatDispatcher;
use charchat_config::AppConfig;
use charchat_core::state::AppState;
use charchat_providers::{OpenAiImageGenerator, ProviderDispatcher, ProviderEndpoints};
use charchat_state::{FileStore, ReloadOutcome, reload_state, save_app_state};

use crate::app_store::AppStore;

/// Config, store and loaded state for one invocation.
pub struct Runtime {
    pub config: AppConfig,
    pub store: Arc<FileStore>,
    pub app: Arc<AppStore>,
}

impl Runtime {
    /// Load config and state, migrating if needed.
    ///
    /// Fails with the diagnostic when the state cannot be migrated.
    pub async fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
        Self::open_with(config).await
    }

    pub async fn open_with(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = Arc::new(FileStore::new(&config.data_dir));
        let outcome = reload_state(store.as_ref(), &config.settings).await?;

        if let ReloadOutcome::Failed(state) = &outcome {
            return Err(format!(
                "{}\n  Run `charchat migrate --delete` to start over.",
                state.volatile_state.error_message
            )
            .into());
        }

        let mut state = outcome.into_state();
        apply_credentials(&mut state, &config);

        Ok(Self {
            config,
            store,
            app: Arc::new(AppStore::new(state)),
        })
    }

    /// The orchestrator wired to real providers and this invocation's store.
    pub fn dispatcher(&self) -> ChatDispatcher {
        let settings = self.app.snapshot().settings;
        let images = OpenAiImageGenerator::new(&self.config.openai_url, &settings.open_ai_key)
            .with_timeout(Duration::from_secs(self.config.request_timeout_secs));
        ChatDispatcher::new(
            Arc::new(ProviderDispatcher::new(ProviderEndpoints::from_config(&self.config))),
            Arc::new(images),
            self.store.clone(),
            self.app.clone(),
        )
        .with_word_budget(self.config.word_budget)
    }

    pub fn state(&self) -> AppState {
        self.app.snapshot()
    }

    /// Persist the state under the current version.
    pub async fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let mut state = self.app.snapshot();
        state.volatile_state.waiting_answer = false;
        save_app_state(self.store.as_ref(), &state).await?;
        Ok(())
    }
}

/// Keys from config or the environment win over stored ones when set.
fn apply_credentials(state: &mut AppState, config: &AppConfig) {
    if !config.settings.open_ai_key.is_empty() {
        state.settings.open_ai_key = config.settings.open_ai_key.clone();
    }
    if !config.settings.gemini_key.is_empty() {
        state.settings.gemini_key = config.settings.gemini_key.clone();
    }
    if std::env::var("CHARCHAT_CHAT_PROVIDER").is_ok() {
        state.settings.chat_response = config.settings.chat_response;
    }
}
