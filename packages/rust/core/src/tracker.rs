//! Change tracker: snapshot the tracked files of a directory, diff against
//! the previous snapshot and log a model-written summary to the progress
//! journal.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Local;
use promptkit_providers::{ChatModel, ChatRequest};
use promptkit_reports::{PROGRESS_HEADER, render_progress_entry};
use promptkit_shared::{PromptKitError, Result, Snapshot, TrackerConfig};
use promptkit_storage::{SnapshotStore, journal};
use similar::TextDiff;
use tracing::{debug, info, instrument, warn};

use crate::pipeline::ask;
use crate::prompts::{self, fill};

/// File names that are never snapshotted.
const SKIPPED_NAMES: &[&str] = &["target", "__pycache__"];

/// Prefix of git metadata files, also never snapshotted.
const GIT_PREFIX: &str = ".git";

/// Where and what to track.
#[derive(Debug, Clone)]
pub struct Tracker {
    pub root: PathBuf,
    pub tracked_extensions: Vec<String>,
    pub snapshot_file: PathBuf,
    pub progress_file: PathBuf,
    /// Model writing the change summary.
    pub model: String,
}

impl Tracker {
    /// Tracker for `root`, with the snapshot and journal resolved inside it.
    pub fn new(root: impl Into<PathBuf>, config: &TrackerConfig, model: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            snapshot_file: root.join(&config.snapshot_file),
            progress_file: root.join(&config.progress_file),
            tracked_extensions: config.tracked_extensions.clone(),
            model: model.into(),
            root,
        }
    }
}

/// One difference between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Created(String),
    Deleted(String),
    Modified { path: String, diff: String },
}

impl fmt::Display for FileChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(path) => write!(f, "New file created: {path}"),
            Self::Deleted(path) => write!(f, "File deleted: {path}"),
            Self::Modified { path, diff } => write!(f, "\nChanges in {path}:\n{diff}"),
        }
    }
}

/// Result of a tracker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeReport {
    /// No previous snapshot existed; the current one was saved.
    InitialState,
    NoChanges,
    Summary(String),
}

/// Read every tracked file directly inside the root.
///
/// The snapshot and the journal themselves are left out, and files that
/// are not valid UTF-8 are skipped.
pub fn take_snapshot(tracker: &Tracker) -> Result<Snapshot> {
    let entries =
        std::fs::read_dir(&tracker.root).map_err(|e| PromptKitError::io(&tracker.root, e))?;
    let own_files = [tracker.snapshot_file.file_name(), tracker.progress_file.file_name()];

    let mut snapshot = Snapshot::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || own_files.iter().any(|own| *own == path.file_name()) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(GIT_PREFIX) || SKIPPED_NAMES.contains(&name.as_str()) {
            continue;
        }

        let tracked = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| tracker.tracked_extensions.iter().any(|t| t == ext));
        if !tracked {
            continue;
        }

        match std::fs::read(&path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => {
                    snapshot.insert(name, text);
                }
                Err(_) => warn!(file = %name, "skipping non-UTF-8 file"),
            },
            Err(e) => warn!(file = %name, error = %e, "skipping unreadable file"),
        }
    }

    debug!(files = snapshot.len(), "snapshot taken");
    Ok(snapshot)
}

/// Compare two snapshots over the sorted union of their paths.
pub fn diff_snapshots(previous: &Snapshot, current: &Snapshot) -> Vec<FileChange> {
    let mut paths: Vec<&String> = previous.keys().chain(current.keys()).collect();
    paths.sort();
    paths.dedup();

    paths
        .into_iter()
        .filter_map(|path| match (previous.get(path), current.get(path)) {
            (None, Some(_)) => Some(FileChange::Created(path.clone())),
            (Some(_), None) => Some(FileChange::Deleted(path.clone())),
            (Some(old), Some(new)) if old != new => {
                let diff = unified_diff(path, old, new);
                (!diff.is_empty()).then(|| FileChange::Modified {
                    path: path.clone(),
                    diff,
                })
            }
            _ => None,
        })
        .collect()
}

fn unified_diff(path: &str, old: &str, new: &str) -> String {
    let name = Path::new(path)
        .file_name()
        .map_or_else(|| path.to_string(), |n| n.to_string_lossy().into_owned());

    TextDiff::from_lines(old, new)
        .unified_diff()
        .missing_newline_hint(false)
        .header(&format!("previous/{name}"), &format!("current/{name}"))
        .to_string()
        .trim_end()
        .to_string()
}

/// Render changes the way they are shown to the model.
pub fn format_changes(changes: &[FileChange]) -> String {
    changes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask the model for a summary. A failed request yields the raw changes
/// behind an error line instead.
#[instrument(skip_all, fields(model = %model, changes = changes.len()))]
pub async fn analyze_changes(chat: &dyn ChatModel, model: &str, changes: &[FileChange]) -> String {
    let raw = format_changes(changes);
    let request =
        ChatRequest::new(model).user(fill(prompts::CHANGE_SUMMARY_PROMPT, &[("changes", &raw)]));

    match ask(chat, request).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!(error = %e, "change analysis failed, logging raw changes");
            format!("Error analyzing changes: {e}\n\nRaw changes:\n{raw}")
        }
    }
}

/// Append a summary to the progress journal. Reports without a summary
/// are not logged.
pub fn append_progress(path: &Path, report: &ChangeReport) -> Result<()> {
    let ChangeReport::Summary(summary) = report else {
        return Ok(());
    };
    let entry = render_progress_entry(Local::now().naive_local(), summary);
    journal::append_entry(path, PROGRESS_HEADER, &entry)
}

/// Snapshot, compare, summarize and log.
///
/// The current snapshot is saved before comparing, so the next run diffs
/// against this one whatever happens afterwards.
#[instrument(skip_all, fields(root = %tracker.root.display()))]
pub async fn run(chat: &dyn ChatModel, tracker: &Tracker) -> Result<ChangeReport> {
    let store = SnapshotStore::new(&tracker.snapshot_file);
    let previous = store.load();
    let current = take_snapshot(tracker)?;
    store.save(&current)?;

    if previous.is_empty() {
        info!(files = current.len(), "initial state saved");
        return Ok(ChangeReport::InitialState);
    }

    let changes = diff_snapshots(&previous, &current);
    if changes.is_empty() {
        info!("no changes detected");
        return Ok(ChangeReport::NoChanges);
    }

    info!(changes = changes.len(), "changes detected");
    let report = ChangeReport::Summary(analyze_changes(chat, &tracker.model, &changes).await);
    append_progress(&tracker.progress_file, &report)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedChat;

    fn tracker(root: &Path) -> Tracker {
        Tracker::new(root, &TrackerConfig::default(), "gpt-4o")
    }

    fn snapshot(files: &[(&str, &str)]) -> Snapshot {
        files
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn snapshot_filters_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("main.rs"), "fn main() {}\n").unwrap();
        std::fs::write(root.join("notes.md"), "# notes\n").unwrap();
        std::fs::write(root.join("image.png"), "png").unwrap();
        std::fs::write(root.join("last_state.json"), "{}").unwrap();
        std::fs::write(root.join("PROGRESS.md"), "# log").unwrap();
        std::fs::write(root.join("blob.txt"), [0xff, 0xfe, 0x00]).unwrap();
        std::fs::create_dir(root.join("src.rs")).unwrap();

        let snap = take_snapshot(&tracker(root)).unwrap();
        assert_eq!(snap.keys().collect::<Vec<_>>(), vec!["main.rs", "notes.md"]);
    }

    #[test]
    fn skip_list_matches_whole_names() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("targets.md"), "goals\n").unwrap();
        std::fs::write(root.join("retarget.rs"), "fn f() {}\n").unwrap();
        std::fs::write(root.join(".gitnotes.md"), "private\n").unwrap();

        let snap = take_snapshot(&tracker(root)).unwrap();
        assert_eq!(snap.keys().collect::<Vec<_>>(), vec!["retarget.rs", "targets.md"]);
    }

    #[test]
    fn diff_lists_created_deleted_and_modified() {
        let previous = snapshot(&[("a.md", "one\ntwo\n"), ("gone.txt", "x"), ("same.md", "s")]);
        let current = snapshot(&[("a.md", "one\nthree\n"), ("new.rs", "y"), ("same.md", "s")]);

        let changes = diff_snapshots(&previous, &current);
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[1], FileChange::Deleted("gone.txt".into()));
        assert_eq!(changes[2], FileChange::Created("new.rs".into()));

        let FileChange::Modified { path, diff } = &changes[0] else {
            panic!("expected a modification, got {:?}", changes[0]);
        };
        assert_eq!(path, "a.md");
        assert!(diff.starts_with("--- previous/a.md\n+++ current/a.md\n@@"));
        assert!(diff.contains("\n-two\n+three"));

        let text = format_changes(&changes);
        assert!(text.contains("\nChanges in a.md:\n--- previous/a.md"));
        assert!(text.contains("File deleted: gone.txt\nNew file created: new.rs"));
    }

    #[tokio::test]
    async fn failed_analysis_keeps_raw_changes() {
        let chat = ScriptedChat::new(vec![Err(PromptKitError::provider("openai", "HTTP 503"))]);
        let changes = vec![FileChange::Created("x.md".into())];
        let summary = analyze_changes(&chat, "gpt-4o", &changes).await;
        assert!(summary.starts_with("Error analyzing changes: openai error: HTTP 503"));
        assert!(summary.ends_with("Raw changes:\nNew file created: x.md"));
    }

    #[tokio::test]
    async fn runs_progress_through_states() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let t = tracker(root);
        std::fs::write(root.join("notes.md"), "v1\n").unwrap();
        let chat = ScriptedChat::always("- notes updated");

        assert_eq!(run(&chat, &t).await.unwrap(), ChangeReport::InitialState);
        assert_eq!(run(&chat, &t).await.unwrap(), ChangeReport::NoChanges);
        assert!(!t.progress_file.exists());

        std::fs::write(root.join("notes.md"), "v2\n").unwrap();
        assert_eq!(
            run(&chat, &t).await.unwrap(),
            ChangeReport::Summary("- notes updated".into())
        );
        assert!(chat.user_messages()[0].contains("+v2"));

        let progress = std::fs::read_to_string(&t.progress_file).unwrap();
        assert!(progress.starts_with("# Development Progress"));
        assert!(progress.contains("## Update "));
        assert!(progress.contains("- notes updated\n\n---\n"));
    }

    #[test]
    fn non_summary_reports_are_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PROGRESS.md");
        append_progress(&path, &ChangeReport::NoChanges).unwrap();
        append_progress(&path, &ChangeReport::InitialState).unwrap();
        assert!(!path.exists());
    }
}
