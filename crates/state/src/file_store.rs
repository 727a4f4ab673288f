//! File-based store: one JSON file per snapshot version.
//!
//! Layout under the data directory:
//!
//! ```text
//! currentVersion          the version marker, plain text
//! snapshots/<version>.json
//! avatars/<id>            base64 image data
//! ```
//!
//! Every write goes to a uniquely named temporary file that is then
//! renamed over the target, so a crash never leaves a half-written key.

use async_trait::async_trait;
use charchat_core::error::StateError;
use charchat_core::state::{CURRENT_VERSION_KEY, StateStore};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// A store rooted at a data directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!(path = %root.display(), "File state store opened");
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot_path(&self, key: &str) -> Result<PathBuf, StateError> {
        validate_key(key)?;
        Ok(self.root.join("snapshots").join(format!("{key}.json")))
    }

    fn avatar_path(&self, id: &str) -> Result<PathBuf, StateError> {
        validate_key(id)?;
        Ok(self.root.join("avatars").join(id))
    }

    fn marker_path(&self) -> PathBuf {
        self.root.join(CURRENT_VERSION_KEY)
    }
}

/// Keys become file names, so path syntax is rejected.
fn validate_key(key: &str) -> Result<(), StateError> {
    let valid = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StateError::Storage(format!("Invalid storage key {key:?}")))
    }
}

fn io_error(context: &str, path: &Path, e: std::io::Error) -> StateError {
    match e.kind() {
        ErrorKind::StorageFull | ErrorKind::QuotaExceeded => {
            StateError::QuotaExceeded(format!("{context} {}: {e}", path.display()))
        }
        _ => StateError::Storage(format!("{context} {}: {e}", path.display())),
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>, StateError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error("Failed to read", path, e)),
    }
}

async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StateError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error("Failed to create directory", parent, e))?;
    }

    let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
    if let Err(e) = tokio::fs::write(&tmp, content).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_error("Failed to write", &tmp, e));
    }

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_error("Failed to replace", path, e))
}

#[async_trait]
impl StateStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StateError> {
        let path = self.snapshot_path(key)?;
        let Some(content) = read_optional(&path).await? else {
            return Ok(None);
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StateError::Serialization(format!("{}: {e}", path.display())))
    }

    async fn set(&self, key: &str, snapshot: &Value) -> Result<(), StateError> {
        let path = self.snapshot_path(key)?;
        let content = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        write_atomic(&path, &content).await?;
        debug!(key, bytes = content.len(), "Snapshot written");
        Ok(())
    }

    async fn current_version(&self) -> Result<Option<String>, StateError> {
        Ok(read_optional(&self.marker_path())
            .await?
            .map(|v| v.trim().to_string()))
    }

    async fn set_current_version(&self, version: &str) -> Result<(), StateError> {
        write_atomic(&self.marker_path(), version.as_bytes()).await
    }

    async fn keys(&self) -> Result<Vec<String>, StateError> {
        let mut keys = Vec::new();
        let dir = self.root.join("snapshots");
        match tokio::fs::read_dir(&dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries
                    .next_entry()
                    .await
                    .map_err(|e| io_error("Failed to list", &dir, e))?
                {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if let Some(key) = name.strip_suffix(".json") {
                        keys.push(key.to_string());
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error("Failed to list", &dir, e)),
        }
        keys.sort();

        let marker = self.marker_path();
        if tokio::fs::try_exists(&marker)
            .await
            .map_err(|e| io_error("Failed to check", &marker, e))?
        {
            keys.push(CURRENT_VERSION_KEY.to_string());
        }
        Ok(keys)
    }

    async fn put_avatar(&self, id: &str, image: &str) -> Result<(), StateError> {
        write_atomic(&self.avatar_path(id)?, image.as_bytes()).await
    }

    async fn get_avatar(&self, id: &str) -> Result<Option<String>, StateError> {
        read_optional(&self.avatar_path(id)?).await
    }

    async fn clear(&self) -> Result<(), StateError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.root.display(), error = %e, "Failed to delete state");
                return Err(io_error("Failed to delete", &self.root, e));
            }
        }
        debug!(path = %self.root.display(), "State deleted");
        Ok(())
    }
}
