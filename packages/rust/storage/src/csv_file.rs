//! CSV source files: read header and rows, append generated rows.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use promptkit_shared::{PromptKitError, Result};
use tracing::{debug, instrument};

use crate::write_atomic;

/// A CSV file loaded into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Read a CSV file whose first record is the header.
    pub fn read(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| PromptKitError::io(path, e))?;
        Self::from_reader(file)
            .map_err(|e| PromptKitError::parse(format!("{}: {e}", path.display())))
    }

    fn from_reader<R: Read>(reader: R) -> std::result::Result<Self, String> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let header: Vec<String> = rdr
            .headers()
            .map_err(|e| e.to_string())?
            .iter()
            .map(str::to_owned)
            .collect();

        if header.iter().all(|h| h.trim().is_empty()) {
            return Err("file has no header row".into());
        }

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| e.to_string())?;
            rows.push(record.iter().map(str::to_owned).collect());
        }

        Ok(Self { header, rows })
    }

    /// Number of columns every row must have.
    pub fn arity(&self) -> usize {
        self.header.len()
    }

    /// Header plus the first `n` rows rendered back to CSV text.
    pub fn sample(&self, n: usize) -> Result<String> {
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        let records = std::iter::once(&self.header).chain(self.rows.iter().take(n));
        for record in records {
            wtr.write_record(record)
                .map_err(|e| PromptKitError::Storage(format!("rendering CSV sample: {e}")))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| PromptKitError::Storage(format!("rendering CSV sample: {}", e.error())))?;
        String::from_utf8(bytes)
            .map_err(|e| PromptKitError::Storage(format!("rendering CSV sample: {e}")))
    }
}

/// Append `rows` to an existing CSV file, quoting fields where needed.
#[instrument(skip_all, fields(path = %path.display(), rows = rows.len()))]
pub fn append_rows(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .open(path)
        .map_err(|e| PromptKitError::io(path, e))?;

    if needs_leading_newline(&mut file).map_err(|e| PromptKitError::io(path, e))? {
        file.write_all(b"\n").map_err(|e| PromptKitError::io(path, e))?;
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(file);

    for row in rows {
        wtr.write_record(row)
            .map_err(|e| PromptKitError::Storage(format!("{}: {e}", path.display())))?;
    }
    wtr.flush().map_err(|e| PromptKitError::io(path, e))?;

    debug!("rows appended");
    Ok(())
}

/// Copy the whole CSV file (header and rows) to `dest`.
pub fn copy_table(src: &Path, dest: &Path) -> Result<()> {
    let bytes = std::fs::read(src).map_err(|e| PromptKitError::io(src, e))?;
    write_atomic(dest, &bytes)
}

/// Whether a non-empty file is missing its trailing newline.
fn needs_leading_newline(file: &mut std::fs::File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
