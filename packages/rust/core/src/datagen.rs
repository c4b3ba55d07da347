//! CSV data generation: analyze a sample of an existing table, then have
//! the model write new rows until enough valid ones are collected or the
//! attempts run out.

use std::path::{Path, PathBuf};

use promptkit_providers::{ChatModel, ChatRequest};
use promptkit_shared::Result;
use promptkit_storage::CsvTable;
use promptkit_storage::csv_file::{append_rows, copy_table};
use tracing::{debug, info, instrument, warn};

use crate::pipeline::{ProgressReporter, ask};
use crate::prompts::{self, fill};

/// Generation requests per run, at most.
pub const MAX_ATTEMPTS: u32 = 5;

/// Rows of the source table shown to the model.
const SAMPLE_ROWS: usize = 3;

/// Settings of one generation run.
#[derive(Debug, Clone)]
pub struct DatagenRun {
    pub model: String,
    /// Table the rows are modelled on and appended to.
    pub source: PathBuf,
    /// Where the grown table is copied afterwards.
    pub output_file: PathBuf,
    pub rows: usize,
}

/// Rows collected by [`generate_rows`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub rows: Vec<Vec<String>>,
    pub attempts: u32,
    pub requested: usize,
}

impl Generation {
    /// How many requested rows are missing.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.rows.len())
    }
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct DatagenOutcome {
    pub analysis: String,
    pub summary: String,
    pub generation: Generation,
}

/// Ask for an analysis of the header and first rows.
#[instrument(skip_all, fields(model = %model))]
pub async fn analyze_table(chat: &dyn ChatModel, model: &str, table: &CsvTable) -> Result<String> {
    let sample = table.sample(SAMPLE_ROWS)?;
    let request = ChatRequest::new(model)
        .system(prompts::DATAGEN_ANALYZER_SYSTEM)
        .user(fill(prompts::DATAGEN_ANALYZER_PROMPT, &[("sample", &sample)]))
        .max_tokens(1000)
        .temperature(0.1);
    ask(chat, request).await
}

/// One-paragraph summary of an analysis.
pub async fn summarize_analysis(chat: &dyn ChatModel, model: &str, analysis: &str) -> Result<String> {
    let request = ChatRequest::new(model)
        .system(prompts::DATAGEN_SUMMARY_SYSTEM)
        .user(fill(prompts::DATAGEN_SUMMARY_PROMPT, &[("analysis", analysis)]))
        .max_tokens(300)
        .temperature(0.1);
    ask(chat, request).await
}

/// Parse model output as CSV rows of exactly `arity` fields.
///
/// Blank rows, rows with a field starting with `#`, rows of the wrong width
/// and malformed records are dropped.
pub fn parse_generated_rows(text: &str, arity: usize) -> Vec<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "dropping malformed generated row");
                continue;
            }
        };

        let row: Vec<String> = record.iter().map(|f| f.trim().to_string()).collect();
        if row.iter().all(|f| f.is_empty()) {
            continue;
        }
        if row.iter().any(|f| f.starts_with('#')) {
            debug!(?row, "dropping comment row");
            continue;
        }
        if row.len() != arity {
            warn!(expected = arity, found = row.len(), ?row, "dropping row with wrong column count");
            continue;
        }
        rows.push(row);
    }
    rows
}

/// Request rows until `requested` valid ones are collected, at most
/// [`MAX_ATTEMPTS`] times. Each attempt asks only for the remaining count;
/// extra rows are cut off. A failed attempt counts as one that produced no
/// rows, so the rows collected so far are always returned.
#[instrument(skip_all, fields(model = %model, requested = requested))]
pub async fn generate_rows(
    chat: &dyn ChatModel,
    model: &str,
    table: &CsvTable,
    analysis: &str,
    requested: usize,
    progress: &dyn ProgressReporter,
) -> Result<Generation> {
    let arity = table.arity();
    let arity_text = arity.to_string();
    let columns = table.header.join(", ");
    let sample = table.sample(SAMPLE_ROWS)?;
    let system = fill(
        prompts::DATAGEN_GENERATOR_SYSTEM,
        &[("arity", &arity_text), ("columns", &columns)],
    );

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut attempts = 0;

    while rows.len() < requested && attempts < MAX_ATTEMPTS {
        attempts += 1;
        let remaining = (requested - rows.len()).to_string();
        info!(attempt = attempts, remaining = %remaining, "generating rows");

        let request = ChatRequest::new(model)
            .system(system.clone())
            .user(fill(
                prompts::DATAGEN_GENERATOR_PROMPT,
                &[
                    ("count", &remaining),
                    ("arity", &arity_text),
                    ("columns", &columns),
                    ("sample", &sample),
                    ("analysis", analysis),
                ],
            ))
            .max_tokens(1500)
            .temperature(1.0);
        match ask(chat, request).await {
            Ok(text) => rows.extend(parse_generated_rows(&text, arity)),
            Err(e) => warn!(attempt = attempts, error = %e, "generation attempt failed"),
        }
        rows.truncate(requested);
        progress.step(rows.len(), requested);
    }

    let generation = Generation {
        rows,
        attempts,
        requested,
    };
    if generation.shortfall() > 0 {
        warn!(
            generated = generation.rows.len(),
            requested, "could not generate every requested row"
        );
    }
    Ok(generation)
}

/// Analyze, summarize, generate, then append to the source and copy it to
/// the output file.
#[instrument(skip_all, fields(source = %job.source.display(), rows = job.rows))]
pub async fn run(
    chat: &dyn ChatModel,
    job: &DatagenRun,
    progress: &dyn ProgressReporter,
) -> Result<DatagenOutcome> {
    let table = CsvTable::read(&job.source)?;
    info!(rows = table.rows.len(), columns = table.arity(), "source table read");

    progress.phase("Analyzing data patterns and structure");
    let analysis = analyze_table(chat, &job.model, &table).await?;

    progress.phase("Summarizing analysis");
    let summary = summarize_analysis(chat, &job.model, &analysis).await?;

    progress.phase(&format!("Generating {} new rows", job.rows));
    let generation = generate_rows(chat, &job.model, &table, &analysis, job.rows, progress).await?;

    if !generation.rows.is_empty() {
        save_rows(&job.source, &job.output_file, &generation.rows)?;
    }
    progress.done(&format!(
        "Generated {} of {} rows",
        generation.rows.len(),
        generation.requested
    ));

    Ok(DatagenOutcome {
        analysis,
        summary,
        generation,
    })
}

fn save_rows(source: &Path, output: &Path, rows: &[Vec<String>]) -> Result<()> {
    append_rows(source, rows)?;
    copy_table(source, output)?;
    info!(output = %output.display(), "table copied");
    Ok(())
}
