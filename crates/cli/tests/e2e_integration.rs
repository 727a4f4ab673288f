//! End-to-end integration tests for CharChat.
//!
//! These tests exercise the pipeline from a user message to the recorded
//! reply, and from stored snapshots to the loaded state, with scripted
//! providers standing in for the network.

use std::sync::{Arc, Mutex};

use charchat_chat::{ChatDispatcher, TemplateTokens, clean_and_limit_messages_size, write_system_entry};
use charchat_core::contact::{BotContact, Contact};
use charchat_core::error::ProviderError;
use charchat_core::event::{StoreAction, StoreDispatch};
use charchat_core::message::{ChatMessage, ChatMessageContent, Message, Role};
use charchat_core::profile::{AvatarMeta, MetaFromAI};
use charchat_core::provider::{B64Image, ImageGenerator, Provider, TextProvider};
use charchat_core::settings::Settings;
use charchat_core::state::{AppState, StateStore};
use charchat_providers::extract;
use charchat_providers::{
    BindingResolver, ChatBinding, ProfileBinding, ProfileQuery, ProviderDispatcher,
};
use charchat_state::{
    FileStore, InMemoryStore, Migrator, ReloadOutcome, load_app_state, reload_state,
    save_app_state,
};
use serde_json::json;

// ── Scripted collaborators ───────────────────────────────────────────────

/// Returns scripted replies in order and records every prompt.
struct ScriptedProvider {
    replies: Mutex<Vec<Result<Message, ProviderError>>>,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Result<Message, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn text(reply: &str) -> Self {
        Self::new(vec![Ok(Message::assistant(reply))])
    }

    fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<Message, ProviderError> {
        self.prompts.lock().unwrap().push(messages);
        self.replies
            .lock()
            .unwrap()
            .pop()
            .expect("ScriptedProvider exhausted")
    }
}

struct ScriptedResolver {
    chat: Arc<ScriptedProvider>,
    profile: Arc<ScriptedProvider>,
}

impl BindingResolver for ScriptedResolver {
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

struct FixedImage;

#[async_trait::async_trait]
impl ImageGenerator for FixedImage {
    async fn generate(&self, _prompt: &str) -> Result<B64Image, ProviderError> {
        Ok("aW1hZ2U=".into())
    }
}

/// Applies actions to an in-process state, like the CLI's store does.
struct StateRecorder {
    state: Mutex<AppState>,
    chat_id: String,
}

impl StateRecorder {
    fn new(state: AppState, chat_id: &str) -> Self {
        Self {
            state: Mutex::new(state),
            chat_id: chat_id.into(),
        }
    }

    fn snapshot(&self) -> AppState {
        self.state.lock().unwrap().clone()
    }
}

impl StoreDispatch for StateRecorder {
    fn dispatch(&self, action: StoreAction) {
        let mut state = self.state.lock().unwrap();
        match action {
            StoreAction::AddMessage(m) => {
                if let Some(c) = state.contacts.get_mut(&self.chat_id) {
                    c.chats_mut().push(m);
                }
            }
            StoreAction::SetStatus(s) => {
                if let Some(c) = state.contacts.get_mut(&self.chat_id) {
                    c.set_status(s);
                }
            }
            StoreAction::SetWaitingAnswer(w) => state.volatile_state.waiting_answer = w,
            StoreAction::AddContact(c) => {
                state.contacts.insert(c.id().to_string(), c);
            }
            StoreAction::RemoveContact(id) => {
                state.contacts.remove(&id);
            }
            StoreAction::ReloadState(s) => *state = *s,
        }
    }
}

fn eve() -> BotContact {
    BotContact {
        id: "1bot".into(),
        meta: MetaFromAI {
            name: "Eve".into(),
            user_profile: "A retired sailor".into(),
            ..MetaFromAI::default()
        },
        avatar_meta: AvatarMeta::default(),
        chats: Vec::new(),
        loaded: true,
        status: String::new(),
        contact_system_entry_template: "You are %NAME% talking to %USER_NAME%.".into(),
        context_template: String::new(),
    }
}

fn sam_settings() -> Settings {
    Settings {
        user_name: "Sam".into(),
        chat_response: TextProvider::Gpt4,
        ..Settings::default()
    }
}

fn words(n: usize) -> String {
    vec!["w"; n].join(" ")
}

// ── Prompt assembly ──────────────────────────────────────────────────────

#[test]
fn e2e_first_turn_prompt_is_only_the_system_entry() {
    let settings = sam_settings();
    let bot = eve();
    let tokens = TemplateTokens::new(
        &bot.meta.name,
        &bot.meta.to_json(),
        None,
        &settings.user_name,
        &settings.user_short_info,
    );

    let system = write_system_entry(&tokens, &bot.contact_system_entry_template, "");
    let prompt = clean_and_limit_messages_size(system, &[], 2000);

    assert_eq!(prompt.len(), 1);
    assert_eq!(prompt[0].role, Role::System);
    assert_eq!(prompt[0].content, "You are Eve talking to Sam.");

    let binding = ProviderDispatcher::default().chat(&settings);
    assert_eq!(binding.provider_name(), "openai");
}

#[test]
fn e2e_history_window_keeps_contiguous_tail_under_budget() {
    let system = Message::system(words(100));
    let history: Vec<ChatMessage> = (0..5)
        .map(|i| {
            ChatMessage::at("1bot", Role::Assistant, ChatMessageContent::new("Eve", words(500)), i)
        })
        .collect();
    assert_eq!(history[0].word_count(), 500);

    let prompt = clean_and_limit_messages_size(system, &history, 2000);

    // 100 + 3 * 500 = 1600 fits, a fourth entry would reach 2100
    assert_eq!(prompt.len(), 4);
    assert_eq!(prompt[0].role, Role::System);
    assert!(prompt[1..].iter().all(|m| m.role == Role::Assistant));
}

// ── Chat turns ───────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_send_message_records_structured_reply() {
    let chat = Arc::new(ScriptedProvider::text(
        r#"{"name": "Eve", "plan": "be salty", "message": "Ahoy, Sam!"}"#,
    ));
    let resolver = ScriptedResolver {
        chat: chat.clone(),
        profile: Arc::new(ScriptedProvider::new(vec![])),
    };

    let mut state = AppState::initial(sam_settings());
    state.contacts.insert("1bot".into(), Contact::Bot(eve()));
    let app = Arc::new(StateRecorder::new(state, "1bot"));
    let store = Arc::new(InMemoryStore::new());
    let dispatcher = ChatDispatcher::new(Arc::new(resolver), Arc::new(FixedImage), store, app.clone());

    let reply = dispatcher
        .send_message(
            &eve(),
            &sam_settings(),
            &[],
            ChatMessageContent::new("Sam", "Hello there"),
            "",
            None,
        )
        .await;

    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.content().message, "Ahoy, Sam!");

    let prompts = chat.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].len(), 2);
    assert_eq!(prompts[0][0].content, "You are Eve talking to Sam.");
    assert!(prompts[0][1].content.contains("Hello there"));

    let state = app.snapshot();
    let contact = state.contact("1bot").unwrap();
    assert_eq!(contact.chats().len(), 2);
    assert_eq!(contact.chats()[0].role, Role::User);
    assert!(!state.volatile_state.waiting_answer);
}

#[tokio::test]
async fn e2e_failed_turn_is_recorded_and_not_replayed() {
    let chat = Arc::new(ScriptedProvider::new(vec![
        Err(ProviderError::network("connection reset")),
        Ok(Message::assistant(r#"{"name": "Eve", "message": "Sorry, lost you"}"#)),
    ]));
    let resolver = ScriptedResolver {
        chat: chat.clone(),
        profile: Arc::new(ScriptedProvider::new(vec![])),
    };

    let mut state = AppState::initial(sam_settings());
    state.contacts.insert("1bot".into(), Contact::Bot(eve()));
    let app = Arc::new(StateRecorder::new(state, "1bot"));
    let dispatcher = ChatDispatcher::new(
        Arc::new(resolver),
        Arc::new(FixedImage),
        Arc::new(InMemoryStore::new()),
        app.clone(),
    );

    let failed = dispatcher
        .send_message(&eve(), &sam_settings(), &[], ChatMessageContent::new("Sam", "Hi"), "", None)
        .await;
    assert_eq!(failed.role, Role::Error);
    assert!(!app.snapshot().volatile_state.waiting_answer);

    let history = app.snapshot().contact("1bot").unwrap().chats().to_vec();
    let reply = dispatcher
        .send_message(
            &eve(),
            &sam_settings(),
            &history,
            ChatMessageContent::new("Sam", "Still there?"),
            "",
            None,
        )
        .await;
    assert_eq!(reply.content().message, "Sorry, lost you");

    let second_prompt = &chat.prompts()[1];
    assert!(second_prompt.iter().all(|m| m.role != Role::Error));
    // system, first user message, second user message
    assert_eq!(second_prompt.len(), 3);
}

#[tokio::test]
async fn e2e_create_contact_then_group() {
    let profile = Arc::new(ScriptedProvider::text(
        r#"{"name": "Max", "userProfile": "A grumpy chef", "avatar": "a chef with a hat"}"#,
    ));
    let resolver = ScriptedResolver {
        chat: Arc::new(ScriptedProvider::new(vec![])),
        profile,
    };
    let store = Arc::new(InMemoryStore::new());
    let app = Arc::new(StateRecorder::new(AppState::initial(sam_settings()), ""));
    let dispatcher = ChatDispatcher::new(
        Arc::new(resolver),
        Arc::new(FixedImage),
        store.clone(),
        app.clone(),
    );

    let max = dispatcher.create_contact(&sam_settings(), "a grumpy chef").await.unwrap();
    assert_eq!(max.meta.name, "Max");
    assert!(max.id.ends_with("bot"));
    assert_eq!(
        store.get_avatar(&max.avatar_meta.id).await.unwrap().as_deref(),
        Some("aW1hZ2U=")
    );

    save_app_state(store.as_ref(), &app.snapshot()).await.unwrap();

    let group = dispatcher
        .create_group_chat(&sam_settings(), "Kitchen", "Cooking talk", &[max.id.clone()])
        .await
        .unwrap();
    assert_eq!(group.contacts.len(), 1);
    assert_eq!(group.contacts[0].meta.name, "Max");
    assert!(matches!(app.snapshot().contact(&group.id), Some(Contact::Group(_))));
}

// ── Persisted state ──────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_migrate_two_to_four() {
    let store = InMemoryStore::new();
    store
        .set(
            "2",
            &json!({
                "version": "2",
                "settings": {"userName": "Sam"},
                "contacts": {"1bot": {"id": "1bot", "meta": {"name": "Eve"}, "contactSystemEntry": "old"}}
            }),
        )
        .await
        .unwrap();
    store.set_current_version("2").await.unwrap();

    let applied = Migrator::new(&store).run(2, 4).await.unwrap();

    assert_eq!(applied, vec![2, 3]);
    assert_eq!(store.current_version().await.unwrap().as_deref(), Some("4"));
    let v4 = store.get("4").await.unwrap().unwrap();
    assert_eq!(v4["version"], "4");
    assert_eq!(v4["contacts"]["1bot"]["type"], "bot");
    assert!(v4["contacts"]["1bot"].get("contactSystemEntry").is_none());
    // Earlier snapshots are left in place
    assert!(store.get("2").await.unwrap().is_some());
}

#[tokio::test]
async fn e2e_reload_from_disk_migrates_to_current() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    store
        .set(
            "3",
            &json!({
                "version": "3",
                "settings": {"userName": "Sam"},
                "contacts": {
                    "1bot": {
                        "id": "1bot",
                        "meta": {"name": "Eve"},
                        "avatarMeta": {"prompt": "", "id": ""},
                        "chats": [],
                        "lastMessage": "see you",
                        "contactSystemEntryTemplate": ""
                    }
                }
            }),
        )
        .await
        .unwrap();
    store.set_current_version("3").await.unwrap();

    let outcome = reload_state(&store, &Settings::default()).await.unwrap();

    let ReloadOutcome::Loaded(state) = outcome else {
        panic!("expected the migrated state to load");
    };
    assert_eq!(state.version, "6");
    assert_eq!(state.settings.user_name, "Sam");
    assert!(state.group_chats_participants.is_empty());
    match state.contact("1bot") {
        Some(Contact::Bot(bot)) => assert_eq!(bot.status, "see you"),
        other => panic!("expected a bot contact, got {other:?}"),
    }

    let reopened = FileStore::new(dir.path());
    assert_eq!(reopened.current_version().await.unwrap().as_deref(), Some("6"));
    assert_eq!(load_app_state(&reopened, 6).await.unwrap(), Some(state));
}

#[tokio::test]
async fn e2e_broken_snapshot_reports_failure_and_keeps_marker() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    store.set("4", &json!(["not", "an", "object"])).await.unwrap();
    store.set_current_version("4").await.unwrap();

    let outcome = reload_state(&store, &Settings::default()).await.unwrap();

    assert!(outcome.is_failed());
    let message = &outcome.state().volatile_state.error_message;
    assert!(message.starts_with("Migration failed for version 4"));
    assert_eq!(store.current_version().await.unwrap().as_deref(), Some("4"));
    assert!(store.get("5").await.unwrap().is_none());
}
