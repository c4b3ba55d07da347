//! Snapshot file for change tracking.

use std::path::{Path, PathBuf};

use promptkit_shared::{PromptKitError, Result, Snapshot};
use tracing::warn;

use crate::write_json_atomic;

/// Persists a [`Snapshot`] as pretty JSON.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous snapshot. Missing or unreadable files load as empty.
    pub fn load(&self) -> Snapshot {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Snapshot::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "snapshot unreadable, treating as empty");
                return Snapshot::new();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "snapshot corrupt, treating as empty");
            Snapshot::new()
        })
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        write_json_atomic(&self.path, snapshot)
            .map_err(|e| PromptKitError::Storage(format!("saving snapshot: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_corrupt_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("last_state.json"));
        assert!(store.load().is_empty());

        std::fs::write(store.path(), "[1, 2").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("last_state.json"));

        let mut snapshot = Snapshot::new();
        snapshot.insert("main.rs".into(), "fn main() {}\n".into());
        store.save(&snapshot).unwrap();

        assert_eq!(store.load(), snapshot);
    }
}
