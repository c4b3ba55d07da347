//! Append-only markdown journal and sequentially numbered report files.

use std::path::{Path, PathBuf};

use promptkit_shared::{PromptKitError, Result};
use tracing::{debug, info};

use crate::write_atomic;

/// Append `entry` to the journal at `path`, starting it with `header` when
/// the file does not exist yet.
pub fn append_entry(path: &Path, header: &str, entry: &str) -> Result<()> {
    let mut content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => header.to_string(),
        Err(e) => return Err(PromptKitError::io(path, e)),
    };
    content.push_str(entry);
    write_atomic(path, content.as_bytes())?;
    debug!(path = %path.display(), "journal entry appended");
    Ok(())
}

/// Next free number for files named `{prefix}NNNN.{ext}` in `dir`.
///
/// One past the highest existing number, starting at 1.
pub fn next_number(dir: &Path, prefix: &str, ext: &str) -> Result<u32> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(1),
        Err(e) => return Err(PromptKitError::io(dir, e)),
    };

    let suffix = format!(".{ext}");
    let highest = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name.strip_prefix(prefix)?
                .strip_suffix(suffix.as_str())?
                .parse::<u32>()
                .ok()
        })
        .max()
        .unwrap_or(0);

    Ok(highest + 1)
}

/// Write `content` to the next numbered file in `dir` and return its path
/// and number. Numbers are zero-padded to four digits.
pub fn write_numbered(
    dir: &Path,
    prefix: &str,
    ext: &str,
    content: impl FnOnce(u32) -> String,
) -> Result<(PathBuf, u32)> {
    let number = next_number(dir, prefix, ext)?;
    let path = dir.join(format!("{prefix}{number:04}.{ext}"));
    write_atomic(&path, content(number).as_bytes())?;
    info!(path = %path.display(), "report saved");
    Ok((path, number))
}
