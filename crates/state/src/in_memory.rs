//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use charchat_core::error::StateError;
use charchat_core::state::{CURRENT_VERSION_KEY, StateStore};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    snapshots: BTreeMap<String, Value>,
    current_version: Option<String>,
    avatars: BTreeMap<String, String>,
}

impl Inner {
    fn used_bytes(&self) -> usize {
        let snapshots: usize = self
            .snapshots
            .iter()
            .map(|(k, v)| k.len() + v.to_string().len())
            .sum();
        let avatars: usize = self.avatars.iter().map(|(k, v)| k.len() + v.len()).sum();
        snapshots + avatars
    }
}

/// A store that keeps everything in process memory.
///
/// An optional byte quota makes writes fail the way a full browser or
/// disk store would.
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
    quota: Mutex<Option<usize>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            quota: Mutex::new(None),
        }
    }

    /// Limit the bytes held by snapshots and avatars. `None` removes the limit.
    pub fn set_quota(&self, quota: Option<usize>) {
        if let Ok(mut q) = self.quota.lock() {
            *q = quota;
        }
    }

    fn check_quota(&self, used: usize, extra: usize) -> Result<(), StateError> {
        let quota = self.quota.lock().map(|q| *q).unwrap_or(None);
        match quota {
            Some(limit) if used + extra > limit => Err(StateError::QuotaExceeded(format!(
                "{} bytes requested, {} of {limit} in use",
                extra, used
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StateError> {
        Ok(self.inner.read().await.snapshots.get(key).cloned())
    }

    async fn set(&self, key: &str, snapshot: &Value) -> Result<(), StateError> {
        let mut inner = self.inner.write().await;
        let replaced = inner
            .snapshots
            .get(key)
            .map(|v| key.len() + v.to_string().len())
            .unwrap_or(0);
        let used = inner.used_bytes() - replaced;
        self.check_quota(used, key.len() + snapshot.to_string().len())?;
        inner.snapshots.insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    async fn current_version(&self) -> Result<Option<String>, StateError> {
        Ok(self.inner.read().await.current_version.clone())
    }

    async fn set_current_version(&self, version: &str) -> Result<(), StateError> {
        self.inner.write().await.current_version = Some(version.to_string());
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StateError> {
        let inner = self.inner.read().await;
        let mut keys: Vec<String> = inner.snapshots.keys().cloned().collect();
        if inner.current_version.is_some() {
            keys.push(CURRENT_VERSION_KEY.to_string());
        }
        Ok(keys)
    }

    async fn put_avatar(&self, id: &str, image: &str) -> Result<(), StateError> {
        let mut inner = self.inner.write().await;
        let replaced = inner.avatars.get(id).map(|v| id.len() + v.len()).unwrap_or(0);
        let used = inner.used_bytes() - replaced;
        self.check_quota(used, id.len() + image.len())?;
        inner.avatars.insert(id.to_string(), image.to_string());
        Ok(())
    }

    async fn get_avatar(&self, id: &str) -> Result<Option<String>, StateError> {
        Ok(self.inner.read().await.avatars.get(id).cloned())
    }

    async fn clear(&self) -> Result<(), StateError> {
        *self.inner.write().await = Inner::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charchat_core::state::CURRENT_VERSION;
    use serde_json::json;

    #[tokio::test]
    async fn set_and_get() {
        let store = InMemoryStore::new();
        store.set("6", &json!({"version": "6"})).await.unwrap();
        assert_eq!(store.get("6").await.unwrap(), Some(json!({"version": "6"})));
        assert!(store.get("5").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn marker_is_separate_from_snapshots() {
        let store = InMemoryStore::new();
        assert!(store.current_version().await.unwrap().is_none());
        store.set_current_version("3").await.unwrap();
        assert_eq!(store.current_version().await.unwrap().as_deref(), Some("3"));
        assert!(store.get(CURRENT_VERSION_KEY).await.unwrap().is_none());
        assert_eq!(store.keys().await.unwrap(), vec![CURRENT_VERSION_KEY.to_string()]);
    }

    #[tokio::test]
    async fn quota_rejects_oversized_writes() {
        let store = InMemoryStore::new();
        store.set_quota(Some(20));
        store.set("1", &json!({"a": 1})).await.unwrap();

        let err = store.set("2", &json!({"long": "xxxxxxxxxxxxxxxx"})).await.unwrap_err();
        assert!(matches!(err, StateError::QuotaExceeded(_)));
        assert!(store.get("2").await.unwrap().is_none());

        // Overwriting an existing key only counts the difference
        store.set("1", &json!({"b": 2})).await.unwrap();
    }

    #[tokio::test]
    async fn snapshot_version_follows_newer_marker() {
        let store = InMemoryStore::new();
        assert_eq!(store.snapshot_version().await.unwrap(), CURRENT_VERSION);

        store.set_current_version("3").await.unwrap();
        assert_eq!(store.snapshot_version().await.unwrap(), CURRENT_VERSION);

        store.set_current_version("9").await.unwrap();
        assert_eq!(store.snapshot_version().await.unwrap(), 9);

        store.set_current_version("six").await.unwrap();
        assert_eq!(store.snapshot_version().await.unwrap(), CURRENT_VERSION);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = InMemoryStore::new();
        store.set("6", &json!({})).await.unwrap();
        store.set_current_version("6").await.unwrap();
        store.put_avatar("1bot", "aW1n").await.unwrap();

        store.clear().await.unwrap();

        assert!(store.keys().await.unwrap().is_empty());
        assert!(store.get_avatar("1bot").await.unwrap().is_none());
        assert!(store.current_version().await.unwrap().is_none());
    }
}
