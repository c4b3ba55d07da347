//! Deduplicating append-only JSON sink.
//!
//! The file holds one JSON array. Appending a batch keeps every existing
//! record, adds only records whose natural key is not yet present (also
//! collapsing duplicates inside the batch), optionally re-sorts by
//! relevance, and rewrites the file atomically. A batch that adds nothing
//! and leaves the order alone does not touch the file.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use promptkit_shared::{MinimalLead, NaturalKey, PromptKitError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::write_json_atomic;

/// Result of one append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkReport {
    /// Records newly written by this append.
    pub added: usize,
    /// Records in the file afterwards.
    pub total: usize,
}

/// A JSON array file of records deduplicated by [`NaturalKey`].
pub struct JsonSink<T> {
    path: PathBuf,
    sort_by_relevance: bool,
    _records: PhantomData<fn() -> T>,
}

impl<T> JsonSink<T>
where
    T: NaturalKey + Serialize + DeserializeOwned + PartialEq + Clone,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sort_by_relevance: false,
            _records: PhantomData,
        }
    }

    /// Keep the file sorted by descending relevance.
    pub fn sorted_by_relevance(mut self) -> Self {
        self.sort_by_relevance = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted records.
    ///
    /// A missing file is empty. A file that is not a JSON array (including
    /// one that is not UTF-8) is moved aside to `<name>.corrupt` and treated
    /// as empty. Inside an array, records that do not decode are skipped and
    /// the original file is copied to `<name>.corrupt` first.
    pub fn load(&self) -> Result<Vec<T>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PromptKitError::io(&self.path, e)),
        };

        let values = match serde_json::from_slice::<Vec<serde_json::Value>>(&bytes) {
            Ok(values) => values,
            Err(e) => {
                let aside = corrupt_path(&self.path);
                warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "existing sink file is not a valid record array, starting empty"
                );
                std::fs::rename(&self.path, &aside).map_err(|e| PromptKitError::io(&aside, e))?;
                return Ok(Vec::new());
            }
        };

        let total = values.len();
        let records: Vec<T> = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<T>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "skipping undecodable record");
                    None
                }
            })
            .collect();

        if records.len() < total {
            let aside = corrupt_path(&self.path);
            std::fs::write(&aside, &bytes).map_err(|e| PromptKitError::io(&aside, e))?;
            warn!(
                kept = records.len(),
                skipped = total - records.len(),
                copied_to = %aside.display(),
                "some stored records could not be read"
            );
        }

        Ok(records)
    }

    /// Append `batch`, skipping records whose key is already stored.
    pub fn append(&self, batch: Vec<T>) -> Result<SinkReport> {
        self.append_with(batch, |_| {})
    }

    /// Like [`append`](Self::append), running `finalize` over the merged
    /// records before they are compared and written.
    #[instrument(skip_all, fields(path = %self.path.display(), batch = batch.len()))]
    pub fn append_with(
        &self,
        batch: Vec<T>,
        finalize: impl FnOnce(&mut [T]),
    ) -> Result<SinkReport> {
        let existing = self.load()?;
        let (mut merged, added) = merge_records(existing.clone(), batch, self.sort_by_relevance);
        finalize(&mut merged);

        let report = SinkReport {
            added,
            total: merged.len(),
        };

        if merged == existing {
            debug!("nothing new, file left untouched");
            return Ok(report);
        }

        write_json_atomic(&self.path, &merged)?;
        info!(added = report.added, total = report.total, "sink updated");
        Ok(report)
    }
}

/// Merge `incoming` into `existing` by natural key.
///
/// Returns the merged list and how many records were added. Records without
/// a key are always added. With `sort_by_relevance` the result is stably
/// sorted by descending [`NaturalKey::relevance`].
pub fn merge_records<T: NaturalKey>(
    existing: Vec<T>,
    incoming: Vec<T>,
    sort_by_relevance: bool,
) -> (Vec<T>, usize) {
    let mut seen: HashSet<String> = existing
        .iter()
        .filter_map(|r| r.natural_key().map(str::to_owned))
        .collect();

    let mut merged = existing;
    let before = merged.len();

    for record in incoming {
        let duplicate = record
            .natural_key()
            .is_some_and(|key| !seen.insert(key.to_owned()));
        if duplicate {
            debug!(key = record.natural_key().unwrap_or_default(), "duplicate record skipped");
        } else {
            merged.push(record);
        }
    }

    let added = merged.len() - before;

    if sort_by_relevance {
        merged.sort_by(|a, b| b.relevance().total_cmp(&a.relevance()));
    }

    (merged, added)
}

/// Number minimal leads 1..n in file order.
pub fn renumber_minimal(records: &mut [MinimalLead]) {
    for (i, record) in records.iter_mut().enumerate() {
        record.number = i + 1;
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptkit_shared::Lead;

    fn lead(handle: &str, score: f64) -> Lead {
        serde_json::from_value(serde_json::json!({
            "profile_url": format!("https://www.instagram.com/{handle}/"),
            "instagram_handle": handle,
            "business_name": handle,
            "relevance_score": score,
        }))
        .unwrap()
    }

    fn handles(records: &[Lead]) -> Vec<&str> {
        records
            .iter()
            .map(|l| l.instagram_handle.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn merge_skips_existing_keys_and_sorts() {
        // Existing a(5); batch [a(7), b(9)] -> [b, a], one added.
        let (merged, added) = merge_records(vec![lead("a", 5.0)], vec![lead("a", 7.0), lead("b", 9.0)], true);
        assert_eq!(added, 1);
        assert_eq!(handles(&merged), vec!["b", "a"]);
        assert_eq!(merged[1].relevance_score, 5.0);
    }

    #[test]
    fn merge_collapses_duplicates_within_batch() {
        let (merged, added) = merge_records(Vec::new(), vec![lead("x", 1.0), lead("x", 2.0)], false);
        assert_eq!(added, 1);
        assert_eq!(merged[0].relevance_score, 1.0);
    }

    #[test]
    fn relevance_sort_is_stable() {
        let batch = vec![lead("first", 3.0), lead("second", 3.0), lead("top", 8.0), lead("third", 3.0)];
        let (merged, _) = merge_records(Vec::new(), batch, true);
        assert_eq!(handles(&merged), vec!["top", "first", "second", "third"]);
    }

    #[test]
    fn append_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonSink::<Lead>::new(dir.path().join("leads.json")).sorted_by_relevance();

        let report = sink.append(vec![lead("a", 5.0)]).unwrap();
        assert_eq!(report, SinkReport { added: 1, total: 1 });

        let report = sink.append(vec![lead("a", 7.0), lead("b", 9.0)]).unwrap();
        assert_eq!(report, SinkReport { added: 1, total: 2 });

        let stored = sink.load().unwrap();
        assert_eq!(handles(&stored), vec!["b", "a"]);
    }

    #[test]
    fn all_duplicate_append_leaves_file_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        let sink = JsonSink::<Lead>::new(&path).sorted_by_relevance();
        sink.append(vec![lead("a", 5.0), lead("b", 9.0)]).unwrap();

        let before = std::fs::read(&path).unwrap();
        let modified = std::fs::metadata(&path).unwrap().modified().unwrap();

        let report = sink.append(vec![lead("b", 1.0), lead("a", 2.0)]).unwrap();
        assert_eq!(report, SinkReport { added: 0, total: 2 });
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), modified);
    }

    #[test]
    fn unknown_fields_survive_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        std::fs::write(
            &path,
            r#"[{"profile_url":"https://www.instagram.com/old/","instagram_handle":"old","crm_status":"contacted"}]"#,
        )
        .unwrap();

        let sink = JsonSink::<Lead>::new(&path);
        sink.append(vec![lead("new", 1.0)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"crm_status\": \"contacted\""));
    }

    #[test]
    fn corrupt_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        std::fs::write(&path, "{ not json").unwrap();

        let sink = JsonSink::<Lead>::new(&path);
        let report = sink.append(vec![lead("a", 1.0)]).unwrap();

        assert_eq!(report, SinkReport { added: 1, total: 1 });
        assert_eq!(
            std::fs::read_to_string(dir.path().join("leads.json.corrupt")).unwrap(),
            "{ not json"
        );
        assert_eq!(sink.load().unwrap().len(), 1);
    }

    #[test]
    fn non_utf8_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        std::fs::write(&path, [0xff, 0xfe, b'[', b']']).unwrap();

        let sink = JsonSink::<Lead>::new(&path);
        let report = sink.append(vec![lead("a", 1.0)]).unwrap();

        assert_eq!(report, SinkReport { added: 1, total: 1 });
        assert_eq!(
            std::fs::read(dir.path().join("leads.json.corrupt")).unwrap(),
            vec![0xff, 0xfe, b'[', b']']
        );
    }

    #[test]
    fn leads_from_older_writers_are_kept_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        std::fs::write(
            &path,
            r#"[{"profile_url":"https://www.instagram.com/old/","instagram_handle":"old","business_name":"Old","description":null,"relevance_score":0.4,"niche":"yoga","location":"Oslo","found_at":"2024-05-01T12:34:56.123456"}]"#,
        )
        .unwrap();

        let sink = JsonSink::<Lead>::new(&path).sorted_by_relevance();
        let report = sink.append(vec![lead("old", 0.9), lead("new", 0.1)]).unwrap();

        assert_eq!(report, SinkReport { added: 1, total: 2 });
        assert!(!dir.path().join("leads.json.corrupt").exists());
        let stored = sink.load().unwrap();
        assert_eq!(handles(&stored), vec!["old", "new"]);
        assert!(stored[0].found_at.is_some());
    }

    #[test]
    fn undecodable_records_are_skipped_and_file_copied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        let original = r#"[{"profile_url":"https://www.instagram.com/a/","instagram_handle":"a"},{"handle":"no-url"}]"#;
        std::fs::write(&path, original).unwrap();

        let stored = JsonSink::<Lead>::new(&path).load().unwrap();
        assert_eq!(handles(&stored), vec!["a"]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("leads.json.corrupt")).unwrap(),
            original
        );
    }

    #[test]
    fn minimal_mode_converts_full_lead_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        JsonSink::<Lead>::new(&path)
            .append(vec![lead("a", 2.0), lead("b", 1.0)])
            .unwrap();

        let sink = JsonSink::<MinimalLead>::new(&path);
        let report = sink
            .append_with(
                vec![MinimalLead {
                    number: 0,
                    profile_url: "https://www.instagram.com/a/".into(),
                }],
                renumber_minimal,
            )
            .unwrap();

        assert_eq!(report, SinkReport { added: 0, total: 2 });
        assert!(!dir.path().join("leads.json.corrupt").exists());
        let stored = sink.load().unwrap();
        assert_eq!(
            stored,
            vec![
                MinimalLead {
                    number: 1,
                    profile_url: "https://www.instagram.com/a/".into()
                },
                MinimalLead {
                    number: 2,
                    profile_url: "https://www.instagram.com/b/".into()
                },
            ]
        );
        assert!(!std::fs::read_to_string(&path).unwrap().contains("instagram_handle"));
    }

    #[test]
    fn minimal_leads_are_renumbered() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonSink::<MinimalLead>::new(dir.path().join("leads.json"));
        let batch = |urls: &[&str]| {
            urls.iter()
                .map(|u| MinimalLead {
                    number: 0,
                    profile_url: (*u).to_string(),
                })
                .collect::<Vec<_>>()
        };

        sink.append_with(batch(&["u1", "u2"]), renumber_minimal).unwrap();
        let report = sink.append_with(batch(&["u2", "u3"]), renumber_minimal).unwrap();
        assert_eq!(report.added, 1);

        let numbers: Vec<usize> = sink.load().unwrap().iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
