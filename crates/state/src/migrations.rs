//! Schema migrations for persisted state snapshots.
//!
//! Each step is a pure function from the snapshot at version `i` to the
//! snapshot at version `i + 1`. The [`Migrator`] owns every side effect:
//! it reads key `i`, applies the step, writes key `i + 1` and only then
//! advances the current-version marker. A failed step writes nothing, so
//! the chain can be retried from the last committed version.

use charchat_core::error::MigrationError;
use charchat_core::state::{CURRENT_VERSION, StateStore};
use charchat_core::templates;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

/// A pure upgrade from one schema version to the next.
pub type MigrationStep = fn(Value) -> Result<Value, MigrationError>;

/// One entry of the migration registry.
#[derive(Clone, Copy)]
pub struct Migration {
    /// The version this step upgrades from.
    pub from: u32,
    pub description: &'static str,
    pub step: MigrationStep,
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("from", &self.from)
            .field("description", &self.description)
            .finish()
    }
}

/// The built-in steps, indexed by source version.
pub fn registry() -> Vec<Migration> {
    vec![
        Migration {
            from: 0,
            description: "no schema predates version 1",
            step: from_nothing,
        },
        Migration {
            from: 1,
            description: "bump version",
            step: v1_to_v2,
        },
        Migration {
            from: 2,
            description: "per-contact system entry template",
            step: v2_to_v3,
        },
        Migration {
            from: 3,
            description: "contact type tag",
            step: v3_to_v4,
        },
        Migration {
            from: 4,
            description: "group chat participants",
            step: v4_to_v5,
        },
        Migration {
            from: 5,
            description: "context templates and contact status",
            step: v5_to_v6,
        },
    ]
}

/// A step that failed, with the version it was upgrading from.
#[derive(Debug, Error)]
#[error("Migration failed for version {version} {source}")]
pub struct MigrationFailure {
    pub version: u32,
    #[source]
    pub source: MigrationError,
}

/// Runs registered steps against a store.
pub struct Migrator<'a> {
    store: &'a dyn StateStore,
    steps: Vec<Migration>,
}

impl<'a> Migrator<'a> {
    pub fn new(store: &'a dyn StateStore) -> Self {
        Self::with_steps(store, registry())
    }

    pub fn with_steps(store: &'a dyn StateStore, steps: Vec<Migration>) -> Self {
        Self { store, steps }
    }

    /// Upgrade the snapshot at `version` to `version + 1` and advance the marker.
    pub async fn apply_step(&self, version: u32) -> Result<(), MigrationError> {
        let migration = self
            .steps
            .iter()
            .find(|m| m.from == version)
            .ok_or(MigrationError::MissingStep { version })?;

        info!(from = version, to = version + 1, description = migration.description, "Applying migration");

        let snapshot = self
            .store
            .get(&version.to_string())
            .await?
            .unwrap_or_else(|| Value::Object(Map::new()));

        let upgraded = (migration.step)(snapshot)?;

        let next = (version + 1).to_string();
        self.store.set(&next, &upgraded).await?;
        self.store.set_current_version(&next).await?;
        debug!(version = %next, "Migration committed");
        Ok(())
    }

    /// Apply every step from `from` up to `to`, stopping at the first failure.
    ///
    /// Returns the versions that were upgraded. Runs nothing when `from >= to`.
    pub async fn run(&self, from: u32, to: u32) -> Result<Vec<u32>, MigrationFailure> {
        let mut applied = Vec::new();
        for version in from..to {
            self.apply_step(version)
                .await
                .map_err(|source| MigrationFailure { version, source })?;
            applied.push(version);
        }
        Ok(applied)
    }

    /// Migrate from `from` to [`CURRENT_VERSION`].
    pub async fn run_to_current(&self, from: u32) -> Result<Vec<u32>, MigrationFailure> {
        self.run(from, CURRENT_VERSION).await
    }
}

// --- Steps ---

fn from_nothing(_snapshot: Value) -> Result<Value, MigrationError> {
    Err(MigrationError::NoSourceSchema { version: 0 })
}

fn v1_to_v2(snapshot: Value) -> Result<Value, MigrationError> {
    let mut state = into_object(snapshot, 1)?;
    set_version(&mut state, 2);
    Ok(Value::Object(state))
}

fn v2_to_v3(snapshot: Value) -> Result<Value, MigrationError> {
    let mut state = into_object(snapshot, 2)?;
    for contact in contacts_mut(&mut state, 2)? {
        contact.insert(
            "contactSystemEntryTemplate".into(),
            Value::String(templates::DEFAULT_SYSTEM_ENTRY.into()),
        );
        contact.remove("contactSystemEntry");
    }
    set_version(&mut state, 3);
    Ok(Value::Object(state))
}

fn v3_to_v4(snapshot: Value) -> Result<Value, MigrationError> {
    let mut state = into_object(snapshot, 3)?;
    for contact in contacts_mut(&mut state, 3)? {
        contact.insert("type".into(), Value::String("bot".into()));
    }
    set_version(&mut state, 4);
    Ok(Value::Object(state))
}

fn v4_to_v5(snapshot: Value) -> Result<Value, MigrationError> {
    let mut state = into_object(snapshot, 4)?;
    state.insert("groupChatsParticipants".into(), Value::Object(Map::new()));
    set_version(&mut state, 5);
    Ok(Value::Object(state))
}

fn v5_to_v6(snapshot: Value) -> Result<Value, MigrationError> {
    let mut state = into_object(snapshot, 5)?;

    let settings = state
        .get_mut("settings")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| invalid(5, "settings is missing"))?;
    settings.insert(
        "singleBotSystemEntryContext".into(),
        Value::String(templates::DEFAULT_SINGLE_BOT_CONTEXT.into()),
    );
    settings.insert(
        "chatGroupSystemEntryContext".into(),
        Value::String(templates::DEFAULT_CHAT_GROUP_CONTEXT.into()),
    );

    for contact in contacts_mut(&mut state, 5)? {
        let status = contact
            .remove("lastMessage")
            .unwrap_or_else(|| Value::String(String::new()));
        contact.insert("status".into(), status);
        contact.insert(
            "contextTemplate".into(),
            Value::String(templates::DEFAULT_SINGLE_BOT_CONTEXT.into()),
        );
    }

    set_version(&mut state, 6);
    Ok(Value::Object(state))
}

// --- Helpers ---

fn invalid(version: u32, reason: impl Into<String>) -> MigrationError {
    MigrationError::InvalidSnapshot {
        version,
        reason: reason.into(),
    }
}

fn into_object(snapshot: Value, version: u32) -> Result<Map<String, Value>, MigrationError> {
    match snapshot {
        Value::Object(map) => Ok(map),
        other => Err(invalid(version, format!("expected an object, found {other}"))),
    }
}

fn set_version(state: &mut Map<String, Value>, version: u32) {
    state.insert("version".into(), Value::String(version.to_string()));
}

fn contacts_mut(
    state: &mut Map<String, Value>,
    version: u32,
) -> Result<Vec<&mut Map<String, Value>>, MigrationError> {
    let contacts = state
        .get_mut("contacts")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| invalid(version, "contacts is missing"))?;

    contacts
        .iter_mut()
        .map(|(id, contact)| {
            contact
                .as_object_mut()
                .ok_or_else(|| invalid(version, format!("contact {id} is not an object")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryStore;
    use serde_json::json;

    fn v2_snapshot() -> Value {
        json!({
            "version": "2",
            "settings": {"userName": "Sam"},
            "contacts": {
                "1bot": {"id": "1bot", "meta": {"name": "Eve"}, "contactSystemEntry": "old", "lastMessage": "bye"}
            }
        })
    }

    #[test]
    fn step_zero_always_fails() {
        let err = from_nothing(json!({"version": "0"})).unwrap_err();
        assert!(matches!(err, MigrationError::NoSourceSchema { version: 0 }));
    }

    #[test]
    fn v1_only_bumps_version() {
        let upgraded = v1_to_v2(json!({"version": "1", "contacts": {"a": {}}})).unwrap();
        assert_eq!(upgraded, json!({"version": "2", "contacts": {"a": {}}}));
    }

    #[test]
    fn v1_accepts_missing_snapshot() {
        assert_eq!(v1_to_v2(json!({})).unwrap(), json!({"version": "2"}));
    }

    #[test]
    fn v2_sets_template_and_drops_old_entry() {
        let upgraded = v2_to_v3(v2_snapshot()).unwrap();
        let contact = &upgraded["contacts"]["1bot"];
        assert_eq!(contact["contactSystemEntryTemplate"], templates::DEFAULT_SYSTEM_ENTRY);
        assert!(contact.get("contactSystemEntry").is_none());
        assert_eq!(upgraded["version"], "3");
    }

    #[test]
    fn v3_tags_every_contact_as_bot() {
        let upgraded = v3_to_v4(json!({"contacts": {"a": {}, "b": {"type": "x"}}})).unwrap();
        assert_eq!(upgraded["contacts"]["a"]["type"], "bot");
        assert_eq!(upgraded["contacts"]["b"]["type"], "bot");
        assert_eq!(upgraded["version"], "4");
    }

    #[test]
    fn v4_adds_group_participants() {
        let upgraded = v4_to_v5(json!({"version": "4"})).unwrap();
        assert_eq!(upgraded["groupChatsParticipants"], json!({}));
        assert_eq!(upgraded["version"], "5");
    }

    #[test]
    fn v5_moves_last_message_to_status() {
        let upgraded = v5_to_v6(json!({
            "settings": {"userName": "Sam"},
            "contacts": {"1bot": {"lastMessage": "see you"}, "2bot": {}}
        }))
        .unwrap();

        assert_eq!(upgraded["settings"]["singleBotSystemEntryContext"], templates::DEFAULT_SINGLE_BOT_CONTEXT);
        assert_eq!(upgraded["settings"]["chatGroupSystemEntryContext"], templates::DEFAULT_CHAT_GROUP_CONTEXT);
        assert_eq!(upgraded["settings"]["userName"], "Sam");

        let first = &upgraded["contacts"]["1bot"];
        assert_eq!(first["status"], "see you");
        assert!(first.get("lastMessage").is_none());
        assert_eq!(first["contextTemplate"], templates::DEFAULT_SINGLE_BOT_CONTEXT);
        assert_eq!(upgraded["contacts"]["2bot"]["status"], "");
        assert_eq!(upgraded["version"], "6");
    }

    #[test]
    fn steps_reject_missing_collections() {
        assert!(matches!(
            v2_to_v3(json!({})),
            Err(MigrationError::InvalidSnapshot { version: 2, .. })
        ));
        assert!(matches!(
            v5_to_v6(json!({"contacts": {}})),
            Err(MigrationError::InvalidSnapshot { version: 5, .. })
        ));
        assert!(matches!(
            v1_to_v2(json!([1, 2])),
            Err(MigrationError::InvalidSnapshot { version: 1, .. })
        ));
    }

    #[tokio::test]
    async fn apply_step_writes_next_key_and_marker() {
        let store = InMemoryStore::new();
        store.set("4", &json!({"version": "4"})).await.unwrap();
        store.set_current_version("4").await.unwrap();

        Migrator::new(&store).apply_step(4).await.unwrap();

        assert_eq!(store.current_version().await.unwrap().as_deref(), Some("5"));
        let v5 = store.get("5").await.unwrap().unwrap();
        assert_eq!(v5["version"], "5");
        // The source snapshot is kept
        assert_eq!(store.get("4").await.unwrap().unwrap()["version"], "4");
    }

    #[tokio::test]
    async fn run_stops_at_first_failure() {
        let store = InMemoryStore::new();
        // Without contacts 2 -> 3 cannot run
        store.set("2", &json!({"version": "2"})).await.unwrap();
        store.set_current_version("2").await.unwrap();

        let failure = Migrator::new(&store).run(2, 6).await.unwrap_err();
        assert_eq!(failure.version, 2);
        assert!(failure.to_string().starts_with("Migration failed for version 2"));
        assert_eq!(store.current_version().await.unwrap().as_deref(), Some("2"));
        assert!(store.get("3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_step_can_be_retried() {
        let store = InMemoryStore::new();
        store.set("2", &v2_snapshot()).await.unwrap();
        store.set_current_version("2").await.unwrap();

        // Not enough room for the upgraded snapshot
        store.set_quota(Some(10));
        let failure = Migrator::new(&store).run(2, 3).await.unwrap_err();
        assert!(failure.source.is_quota());
        assert_eq!(store.current_version().await.unwrap().as_deref(), Some("2"));
        assert!(store.get("3").await.unwrap().is_none());

        store.set_quota(None);
        let applied = Migrator::new(&store).run(2, 3).await.unwrap();
        assert_eq!(applied, vec![2]);
        assert_eq!(store.get("3").await.unwrap().unwrap()["version"], "3");
    }

    #[tokio::test]
    async fn missing_step_is_reported() {
        let store = InMemoryStore::new();
        let failure = Migrator::with_steps(&store, Vec::new()).run(1, 2).await.unwrap_err();
        assert!(matches!(failure.source, MigrationError::MissingStep { version: 1 }));
    }

    #[tokio::test]
    async fn nothing_runs_when_already_current() {
        let store = InMemoryStore::new();
        let applied = Migrator::new(&store).run(7, 6).await.unwrap();
        assert!(applied.is_empty());
        assert!(store.keys().await.unwrap().is_empty());
    }
}
