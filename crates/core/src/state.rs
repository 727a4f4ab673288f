//! Persisted application state and the storage collaborator trait.
//!
//! Snapshots are stored under their schema version (`"1"`, `"2"`, ...)
//! next to a separate current-version marker. Older snapshots are read as
//! raw JSON because their shape predates [`AppState`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::contact::Contact;
use crate::error::StateError;
use crate::settings::Settings;

/// The schema version this build reads and writes.
pub const CURRENT_VERSION: u32 = 6;

/// Storage key of the current-version marker.
pub const CURRENT_VERSION_KEY: &str = "currentVersion";

/// Which screen the front end should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Screen {
    Welcome,
    Contacts,
    Chat,
    /// Startup failed; the only way forward is deleting the state.
    ErrorWithDelete,
}

/// State that is never meaningful across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatileState {
    pub current_screen: Screen,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub waiting_answer: bool,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub screen_stack: Vec<Screen>,
}

impl VolatileState {
    pub fn welcome() -> Self {
        Self {
            current_screen: Screen::Welcome,
            chat_id: String::new(),
            waiting_answer: false,
            error_message: String::new(),
            screen_stack: vec![Screen::Contacts],
        }
    }

    pub fn error_with_delete(error_message: impl Into<String>) -> Self {
        Self {
            current_screen: Screen::ErrorWithDelete,
            chat_id: String::new(),
            waiting_answer: false,
            error_message: error_message.into(),
            screen_stack: vec![Screen::ErrorWithDelete],
        }
    }
}

impl Default for VolatileState {
    fn default() -> Self {
        Self {
            current_screen: Screen::Contacts,
            chat_id: String::new(),
            waiting_answer: false,
            error_message: String::new(),
            screen_stack: vec![Screen::Contacts],
        }
    }
}

/// The application state at [`CURRENT_VERSION`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub version: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub contacts: BTreeMap<String, Contact>,
    #[serde(default)]
    pub group_chats_participants: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub volatile_state: VolatileState,
}

impl AppState {
    /// The state a first-time user starts with.
    pub fn initial(settings: Settings) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            settings,
            contacts: BTreeMap::new(),
            group_chats_participants: BTreeMap::new(),
            volatile_state: VolatileState::welcome(),
        }
    }

    pub fn contact(&self, id: &str) -> Option<&Contact> {
        self.contacts.get(id)
    }
}

/// The persistence collaborator.
///
/// Reads must return the most recent committed write, and a write must be
/// durable before the call returns.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// The backend name (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Snapshot stored under a version key.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StateError>;

    /// Store a snapshot under a version key.
    async fn set(&self, key: &str, snapshot: &serde_json::Value) -> Result<(), StateError>;

    /// The current-version marker, `None` if the state was never initialised.
    async fn current_version(&self) -> Result<Option<String>, StateError>;

    async fn set_current_version(&self, version: &str) -> Result<(), StateError>;

    /// The version key the live state is read from and saved under.
    ///
    /// [`CURRENT_VERSION`], or the marker when it is higher (state written
    /// by a newer build). A missing or unreadable marker gives
    /// [`CURRENT_VERSION`].
    async fn snapshot_version(&self) -> Result<u32, StateError> {
        let stored = self
            .current_version()
            .await?
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(CURRENT_VERSION);
        Ok(stored.max(CURRENT_VERSION))
    }

    /// Every key the store holds, for diagnostics.
    async fn keys(&self) -> Result<Vec<String>, StateError>;

    /// Store an avatar image blob.
    async fn put_avatar(&self, id: &str, image: &str) -> Result<(), StateError>;

    async fn get_avatar(&self, id: &str) -> Result<Option<String>, StateError>;

    /// Remove every snapshot, avatar and the marker.
    async fn clear(&self) -> Result<(), StateError>;
}
