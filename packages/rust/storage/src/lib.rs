//! Flat-file persistence for promptkit pipelines.
//!
//! Every file that is rewritten goes through [`write_atomic`]: the new
//! contents land in a sibling temp file which is then renamed over the
//! target, so a crash leaves either the old or the new file, never a torn
//! one.
//!
//! - [`JsonSink`]: deduplicating, append-only JSON record file
//! - [`csv_file`]: header/row access and row appends for CSV files
//! - [`SnapshotStore`]: path → contents snapshots for change tracking
//! - [`journal`]: append-only markdown log and numbered report files

pub mod csv_file;
pub mod journal;
pub mod sink;
pub mod snapshot;

use std::path::{Path, PathBuf};

use promptkit_shared::{PromptKitError, Result};
use serde::Serialize;
use tracing::debug;

pub use csv_file::CsvTable;
pub use sink::{JsonSink, SinkReport, merge_records, renumber_minimal};
pub use snapshot::SnapshotStore;

/// Write `contents` to `path` via a temp file and rename.
///
/// Parent directories are created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| PromptKitError::io(&parent, e))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| PromptKitError::Storage(format!("not a file path: {}", path.display())))?
        .to_string_lossy();
    let temp = parent.join(format!(".{file_name}.tmp"));

    std::fs::write(&temp, contents).map_err(|e| PromptKitError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| PromptKitError::io(path, e))?;

    debug!(path = %path.display(), size = contents.len(), "wrote file");
    Ok(())
}

/// Write a value as pretty-printed JSON, atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| PromptKitError::Storage(format!("JSON serialization failed: {e}")))?;
    write_atomic(path, json.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out.txt");

        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "second");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn json_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data.json");
        write_json_atomic(&target, &serde_json::json!({"a": [1, 2]})).unwrap();
        let text = std::fs::read_to_string(&target).unwrap();
        assert!(text.contains("\n  \"a\""));
    }
}
