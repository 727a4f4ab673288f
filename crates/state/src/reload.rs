//! Startup path: read the version marker, migrate, load the snapshot.

use charchat_core::error::StateError;
use charchat_core::event::{StoreAction, StoreDispatch};
use charchat_core::settings::Settings;
use charchat_core::state::{AppState, CURRENT_VERSION, StateStore, VolatileState};
use tracing::{error, info, warn};

use crate::migrations::{MigrationFailure, Migrator};

/// What the startup path produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadOutcome {
    /// No usable state existed; the welcome screen is shown.
    Fresh(AppState),
    /// The persisted state at the current version.
    Loaded(AppState),
    /// Startup failed; the state carries the error screen and message.
    Failed(AppState),
}

impl ReloadOutcome {
    pub fn state(&self) -> &AppState {
        match self {
            Self::Fresh(s) | Self::Loaded(s) | Self::Failed(s) => s,
        }
    }

    pub fn into_state(self) -> AppState {
        match self {
            Self::Fresh(s) | Self::Loaded(s) | Self::Failed(s) => s,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Bring persisted state up to [`CURRENT_VERSION`] and load it.
///
/// `settings` seed the initial state when nothing usable is stored.
/// Storage errors while reading the marker are returned; everything after
/// that is reported through [`ReloadOutcome::Failed`].
pub async fn reload_state(
    store: &dyn StateStore,
    settings: &Settings,
) -> Result<ReloadOutcome, StateError> {
    let Some(marker) = store.current_version().await? else {
        info!("No stored state, starting fresh");
        return fresh(store, settings).await;
    };

    let stored_version: u32 = match marker.parse() {
        Ok(v) => v,
        Err(_) => {
            let message = format!("Stored version marker {marker:?} is not a version number");
            error!(marker = %marker, "Unreadable version marker");
            return Ok(failed(settings, message));
        }
    };

    if stored_version > CURRENT_VERSION {
        error!(
            stored = stored_version,
            current = CURRENT_VERSION,
            "Stored state version is higher than current version"
        );
    }

    if let Err(failure) = Migrator::new(store).run_to_current(stored_version).await {
        let message = failure_message(store, stored_version, &failure).await;
        error!(version = failure.version, error = %failure.source, "Migration failed");
        return Ok(failed(settings, message));
    }

    let load_version = stored_version.max(CURRENT_VERSION);
    info!(version = load_version, "Reloading state");
    match load_app_state(store, load_version).await {
        Ok(Some(state)) => Ok(ReloadOutcome::Loaded(state)),
        Ok(None) => {
            warn!(version = load_version, "Version marker exists but no snapshot, starting fresh");
            fresh(store, settings).await
        }
        Err(e) => {
            error!(version = load_version, error = %e, "Stored state is unreadable");
            Ok(failed(
                settings,
                format!("Stored state for version {load_version} is unreadable: {e}"),
            ))
        }
    }
}

/// Run [`reload_state`] and hand the result to the application store.
pub async fn dispatch_reload_state(
    store: &dyn StateStore,
    settings: &Settings,
    actions: &dyn StoreDispatch,
) -> Result<ReloadOutcome, StateError> {
    let outcome = reload_state(store, settings).await?;
    actions.dispatch(StoreAction::ReloadState(Box::new(outcome.state().clone())));
    Ok(outcome)
}

/// Read and decode the snapshot stored under `version`.
pub async fn load_app_state(
    store: &dyn StateStore,
    version: u32,
) -> Result<Option<AppState>, StateError> {
    let Some(snapshot) = store.get(&version.to_string()).await? else {
        return Ok(None);
    };
    serde_json::from_value(snapshot)
        .map(Some)
        .map_err(|e| StateError::Serialization(e.to_string()))
}

/// Persist `state` under the key [`reload_state`] loads it from.
///
/// That is the current version, or the stored one when state written by a
/// newer build was loaded.
pub async fn save_app_state(store: &dyn StateStore, state: &AppState) -> Result<(), StateError> {
    let snapshot =
        serde_json::to_value(state).map_err(|e| StateError::Serialization(e.to_string()))?;
    let version = store.snapshot_version().await?;
    store.set(&version.to_string(), &snapshot).await
}

/// Remove everything the store holds.
pub async fn delete_state(store: &dyn StateStore) -> Result<(), StateError> {
    warn!(store = store.name(), "Deleting all stored state");
    store.clear().await
}

async fn fresh(store: &dyn StateStore, settings: &Settings) -> Result<ReloadOutcome, StateError> {
    store.set_current_version(&CURRENT_VERSION.to_string()).await?;
    Ok(ReloadOutcome::Fresh(AppState::initial(settings.clone())))
}

fn failed(settings: &Settings, message: String) -> ReloadOutcome {
    let mut state = AppState::initial(settings.clone());
    state.volatile_state = VolatileState::error_with_delete(message);
    ReloadOutcome::Failed(state)
}

/// The diagnostic shown on the error screen.
///
/// Includes the snapshot the chain started from and, when the store ran
/// out of room, every key it holds.
async fn failure_message(
    store: &dyn StateStore,
    stored_version: u32,
    failure: &MigrationFailure,
) -> String {
    let stored = match store.get(&stored_version.to_string()).await {
        Ok(Some(snapshot)) => snapshot.to_string(),
        _ => "nothing found".to_string(),
    };
    let mut message = format!("{failure} {stored}");

    if failure.source.is_quota() {
        let keys = store.keys().await.unwrap_or_default();
        message.push_str(" keys:");
        message.push_str(&keys.join(","));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryStore;
    use charchat_core::event::ActionBus;
    use charchat_core::state::Screen;
    use serde_json::json;

    fn v5_state() -> serde_json::Value {
        json!({
            "version": "5",
            "settings": {"userName": "Sam"},
            "contacts": {
                "1bot": {
                    "type": "bot",
                    "id": "1bot",
                    "meta": {"name": "Eve"},
                    "avatarMeta": {"prompt": "", "id": ""},
                    "chats": [],
                    "loaded": true,
                    "lastMessage": "see you",
                    "contactSystemEntryTemplate": ""
                }
            },
            "groupChatsParticipants": {}
        })
    }

    #[tokio::test]
    async fn first_run_is_fresh_and_writes_marker() {
        let store = InMemoryStore::new();
        let settings = Settings {
            user_name: "Sam".into(),
            ..Settings::default()
        };

        let outcome = reload_state(&store, &settings).await.unwrap();

        let ReloadOutcome::Fresh(state) = outcome else {
            panic!("expected fresh state");
        };
        assert_eq!(state.volatile_state.current_screen, Screen::Welcome);
        assert_eq!(state.settings.user_name, "Sam");
        assert_eq!(store.current_version().await.unwrap().as_deref(), Some("6"));
    }

    #[tokio::test]
    async fn migrates_and_loads() {
        let store = InMemoryStore::new();
        store.set("5", &v5_state()).await.unwrap();
        store.set_current_version("5").await.unwrap();

        let outcome = reload_state(&store, &Settings::default()).await.unwrap();

        let ReloadOutcome::Loaded(state) = outcome else {
            panic!("expected loaded state");
        };
        assert_eq!(state.version, "6");
        assert_eq!(state.contact("1bot").unwrap().display_name(), "Eve");
        match state.contact("1bot").unwrap() {
            charchat_core::Contact::Bot(bot) => assert_eq!(bot.status, "see you"),
            other => panic!("expected bot, got {other:?}"),
        }
        assert_eq!(store.current_version().await.unwrap().as_deref(), Some("6"));
    }

    #[tokio::test]
    async fn current_marker_without_snapshot_is_fresh() {
        let store = InMemoryStore::new();
        store.set_current_version("6").await.unwrap();

        let outcome = reload_state(&store, &Settings::default()).await.unwrap();
        assert!(matches!(outcome, ReloadOutcome::Fresh(_)));
    }

    #[tokio::test]
    async fn failure_shows_error_screen() {
        let store = InMemoryStore::new();
        store.set("2", &json!({"version": "2"})).await.unwrap();
        store.set_current_version("2").await.unwrap();

        let outcome = reload_state(&store, &Settings::default()).await.unwrap();

        assert!(outcome.is_failed());
        let volatile = &outcome.state().volatile_state;
        assert_eq!(volatile.current_screen, Screen::ErrorWithDelete);
        assert!(volatile.error_message.starts_with("Migration failed for version 2"));
        assert!(volatile.error_message.ends_with(r#"{"version":"2"}"#));
        assert!(!volatile.error_message.contains("keys:"));
    }

    #[tokio::test]
    async fn version_zero_cannot_migrate() {
        let store = InMemoryStore::new();
        store.set_current_version("0").await.unwrap();

        let outcome = reload_state(&store, &Settings::default()).await.unwrap();

        let message = &outcome.state().volatile_state.error_message;
        assert!(message.starts_with("Migration failed for version 0"));
        assert!(message.ends_with("nothing found"));
    }

    #[tokio::test]
    async fn quota_failure_lists_keys() {
        let store = InMemoryStore::new();
        store.set("5", &v5_state()).await.unwrap();
        store.set_current_version("5").await.unwrap();
        store.set_quota(Some(1));

        let outcome = reload_state(&store, &Settings::default()).await.unwrap();

        let message = &outcome.state().volatile_state.error_message;
        assert!(message.contains("Migration failed for version 5"));
        assert!(message.ends_with(" keys:5,currentVersion"));
    }

    #[tokio::test]
    async fn newer_state_loads_without_migrating() {
        let store = InMemoryStore::new();
        let mut state = AppState::initial(Settings::default());
        state.version = "7".into();
        store.set("7", &serde_json::to_value(&state).unwrap()).await.unwrap();
        store.set_current_version("7").await.unwrap();

        let outcome = reload_state(&store, &Settings::default()).await.unwrap();

        let ReloadOutcome::Loaded(loaded) = outcome else {
            panic!("expected loaded state");
        };
        assert_eq!(loaded.version, "7");
        assert_eq!(store.current_version().await.unwrap().as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn newer_state_saves_where_it_was_loaded() {
        let store = InMemoryStore::new();
        let mut state = AppState::initial(Settings::default());
        state.version = "7".into();
        store.set("7", &serde_json::to_value(&state).unwrap()).await.unwrap();
        store.set_current_version("7").await.unwrap();

        let mut loaded = reload_state(&store, &Settings::default()).await.unwrap().into_state();
        loaded.settings.user_name = "Changed".into();
        save_app_state(&store, &loaded).await.unwrap();

        let reloaded = reload_state(&store, &Settings::default()).await.unwrap().into_state();
        assert_eq!(reloaded.settings.user_name, "Changed");
        assert!(store.get("6").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn garbage_marker_fails() {
        let store = InMemoryStore::new();
        store.set_current_version("six").await.unwrap();
        let outcome = reload_state(&store, &Settings::default()).await.unwrap();
        assert!(outcome.is_failed());
    }

    #[tokio::test]
    async fn dispatch_reload_sends_state() {
        let store = InMemoryStore::new();
        let bus = ActionBus::new(4);
        let mut rx = bus.subscribe();

        let outcome = dispatch_reload_state(&store, &Settings::default(), &bus).await.unwrap();

        let action = rx.recv().await.unwrap();
        assert_eq!(*action, StoreAction::ReloadState(Box::new(outcome.into_state())));
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = InMemoryStore::new();
        let state = AppState::initial(Settings::default());
        save_app_state(&store, &state).await.unwrap();
        assert_eq!(load_app_state(&store, CURRENT_VERSION).await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn delete_clears_store() {
        let store = InMemoryStore::new();
        store.set("6", &json!({})).await.unwrap();
        store.set_current_version("6").await.unwrap();

        delete_state(&store).await.unwrap();

        assert!(store.keys().await.unwrap().is_empty());
        let outcome = reload_state(&store, &Settings::default()).await.unwrap();
        assert!(matches!(outcome, ReloadOutcome::Fresh(_)));
    }
}
