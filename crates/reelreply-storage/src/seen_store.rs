use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use reelreply_core::error::ReelReplyError;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
struct SeenFile {
    replied_to: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SeenFileRef<'a> {
    replied_to: &'a [String],
}

/// What a state file currently holds, as seen without modifying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateFileStatus {
    Missing,
    Valid { entries: usize },
    Corrupt { reason: String },
}

pub fn inspect(path: &Path) -> Result<StateFileStatus, ReelReplyError> {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<SeenFile>(&content) {
            Ok(file) => Ok(StateFileStatus::Valid {
                entries: file.replied_to.len(),
            }),
            Err(e) => Ok(StateFileStatus::Corrupt {
                reason: e.to_string(),
            }),
        },
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(StateFileStatus::Missing),
        Err(e) => Err(ReelReplyError::State(format!(
            "Failed to read {}: {e}",
            path.display()
        ))),
    }
}

/// Set of already-processed message ids mirrored to a JSON file.
///
/// The file is rewritten in full on every new id, so the durable copy never
/// lags the in-memory set by more than one failed flush.
#[derive(Debug)]
pub struct SeenStore {
    path: PathBuf,
    order: Vec<String>,
    index: HashSet<String>,
}

impl SeenStore {
    /// Loads the set from `path`.
    ///
    /// A missing file is created empty and an unparsable one is overwritten
    /// with an empty set. Any other read or write failure is returned, since
    /// continuing without a usable state file risks duplicate replies.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ReelReplyError> {
        let path = path.into();
        let mut store = SeenStore {
            path,
            order: Vec::new(),
            index: HashSet::new(),
        };

        let content = match std::fs::read_to_string(&store.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "{} not found, initializing new file",
                    store.path.display()
                );
                store.persist()?;
                return Ok(store);
            }
            Err(e) => {
                return Err(ReelReplyError::State(format!(
                    "Unexpected error loading {}: {e}",
                    store.path.display()
                )));
            }
        };

        match serde_json::from_str::<SeenFile>(&content) {
            Ok(file) => {
                for id in file.replied_to {
                    store.insert(id);
                }
            }
            Err(e) => {
                warn!(
                    "Error decoding {}: {e}, resetting file",
                    store.path.display()
                );
                store.persist()?;
            }
        }
        Ok(store)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Adds `id` and flushes the whole set before returning.
    ///
    /// Returns `false` when the id was already present, in which case nothing
    /// is written. A failed flush is logged and the in-memory mark is kept.
    pub fn mark_seen(&mut self, id: &str) -> bool {
        if !self.insert(id.to_string()) {
            return false;
        }
        if let Err(e) = self.persist() {
            error!("Error writing to {}: {e}", self.path.display());
        }
        true
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn insert(&mut self, id: String) -> bool {
        if self.index.contains(&id) {
            return false;
        }
        self.index.insert(id.clone());
        self.order.push(id);
        true
    }

    fn persist(&self) -> Result<(), ReelReplyError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string(&SeenFileRef {
            replied_to: &self.order,
        })?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir() -> PathBuf {
        std::env::temp_dir().join(format!(
            "reelreply_seen_store_test_{}",
            uuid::Uuid::new_v4()
        ))
    }

    fn cleanup(dir: &Path) {
        let _ = std::fs::remove_dir_all(dir);
    }

    fn read_ids(path: &Path) -> Vec<String> {
        let content = std::fs::read_to_string(path).unwrap();
        let file: SeenFile = serde_json::from_str(&content).unwrap();
        file.replied_to
    }

    #[test]
    fn test_missing_file_is_created_empty() {
        let dir = test_dir();
        let path = dir.join("store.json");
        let store = SeenStore::load(&path).unwrap();
        assert!(store.is_empty());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"replied_to":[]}"#
        );
        cleanup(&dir);
    }

    #[test]
    fn test_roundtrip_preserves_ids() {
        let dir = test_dir();
        let path = dir.join("store.json");
        let mut store = SeenStore::load(&path).unwrap();
        assert!(store.mark_seen("a"));
        assert!(store.mark_seen("b"));
        drop(store);

        let reloaded = SeenStore::load(&path).unwrap();
        let ids: HashSet<&str> = reloaded.ids().iter().map(String::as_str).collect();
        assert_eq!(ids, HashSet::from(["a", "b"]));
        assert_eq!(reloaded.len(), 2);
        cleanup(&dir);
    }

    #[test]
    fn test_mark_seen_flushes_before_returning() {
        let dir = test_dir();
        let path = dir.join("store.json");
        let mut store = SeenStore::load(&path).unwrap();
        store.mark_seen("msg-1");
        assert_eq!(read_ids(&path), vec!["msg-1"]);
        store.mark_seen("msg-2");
        assert_eq!(read_ids(&path), vec!["msg-1", "msg-2"]);
        cleanup(&dir);
    }

    #[test]
    fn test_mark_seen_is_idempotent() {
        let dir = test_dir();
        let path = dir.join("store.json");
        let mut store = SeenStore::load(&path).unwrap();
        assert!(store.mark_seen("a"));
        assert!(!store.mark_seen("a"));
        assert_eq!(store.len(), 1);
        assert_eq!(read_ids(&path), vec!["a"]);
        cleanup(&dir);
    }

    #[test]
    fn test_corrupt_file_is_reset() {
        let dir = test_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = SeenStore::load(&path).unwrap();
        assert!(store.is_empty());
        assert!(read_ids(&path).is_empty());
        cleanup(&dir);
    }

    #[test]
    fn test_wrong_shape_is_treated_as_corrupt() {
        let dir = test_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("store.json");
        std::fs::write(&path, r#"{"replied_to": [1, 2]}"#).unwrap();

        let store = SeenStore::load(&path).unwrap();
        assert!(store.is_empty());
        assert_eq!(inspect(&path).unwrap(), StateFileStatus::Valid { entries: 0 });
        cleanup(&dir);
    }

    #[test]
    fn test_duplicate_ids_in_file_are_collapsed() {
        let dir = test_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("store.json");
        std::fs::write(&path, r#"{"replied_to": ["a", "a", "b"]}"#).unwrap();

        let store = SeenStore::load(&path).unwrap();
        assert_eq!(store.ids(), &["a".to_string(), "b".to_string()]);
        cleanup(&dir);
    }

    #[test]
    fn test_unreadable_location_is_an_error() {
        let dir = test_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("not_a_dir");
        std::fs::write(&blocker, "file").unwrap();

        let result = SeenStore::load(blocker.join("store.json"));
        assert!(matches!(result, Err(ReelReplyError::State(_))));
        cleanup(&dir);
    }

    #[test]
    fn test_flush_failure_keeps_in_memory_mark() {
        let dir = test_dir();
        let path = dir.join("store.json");
        let mut store = SeenStore::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        assert!(store.mark_seen("kept"));
        assert!(store.contains("kept"));
        cleanup(&dir);
    }

    #[test]
    fn test_inspect_reports_without_modifying() {
        let dir = test_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("store.json");
        assert_eq!(inspect(&path).unwrap(), StateFileStatus::Missing);
        assert!(!path.exists());

        std::fs::write(&path, "garbage").unwrap();
        assert!(matches!(
            inspect(&path).unwrap(),
            StateFileStatus::Corrupt { .. }
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "garbage");

        std::fs::write(&path, r#"{"replied_to": ["x"]}"#).unwrap();
        assert_eq!(inspect(&path).unwrap(), StateFileStatus::Valid { entries: 1 });
        cleanup(&dir);
    }
}
