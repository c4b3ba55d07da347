//! Research pipeline: question → query plan → concurrent web searches →
//! synthesis → numbered markdown report.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use promptkit_providers::{ChatModel, ChatRequest};
use promptkit_reports::{ResearchReport, render_research_report};
use promptkit_shared::{
    FanoutConfig, PromptKitError, ProviderConfig, QueryPlan, Result, SearchFinding, SearchOutcome,
};
use promptkit_storage::journal;
use tracing::{info, instrument};

use crate::fanout::{Outcome, fan_out};
use crate::pipeline::{ProgressReporter, ask, require_output, strip_code_fence};
use crate::prompts::{self, fill};

/// Report files are `research_NNNN.md`.
const REPORT_PREFIX: &str = "research_";

/// Which search model to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResearchMode {
    /// The provider's default (larger) model.
    #[default]
    Quality,
    /// The provider's lighter model.
    Fast,
}

impl ResearchMode {
    /// Pick the search model for this mode.
    pub fn search_model<'a>(&self, provider: &'a ProviderConfig) -> &'a str {
        match self {
            Self::Quality => &provider.default_model,
            Self::Fast => provider.fast_or_default(),
        }
    }
}

/// Inputs of one research run.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// Model that plans queries and writes the synthesis.
    pub planner_model: String,
    /// Online model that answers each search query.
    pub search_model: String,
    pub fanout: FanoutConfig,
    /// Directory the numbered reports go to.
    pub report_dir: PathBuf,
}

/// What a research run produced.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub plan: QueryPlan,
    pub findings: Vec<SearchFinding>,
    pub answer: String,
    pub report_path: PathBuf,
    pub elapsed: Duration,
}

/// Ask the planner for a [`QueryPlan`]. An empty query list aborts.
#[instrument(skip_all, fields(model = %model))]
pub async fn generate_queries(chat: &dyn ChatModel, model: &str, question: &str) -> Result<QueryPlan> {
    let request = ChatRequest::new(model)
        .user(fill(prompts::RESEARCH_QUERY_PROMPT, &[("query", question)]))
        .json_mode();
    let text = ask(chat, request).await?;

    let mut plan: QueryPlan = serde_json::from_str(strip_code_fence(&text))
        .map_err(|e| PromptKitError::parse(format!("query plan is not valid JSON: {e}")))?;

    if plan.user_prompt.trim().is_empty() {
        plan.user_prompt = question.to_string();
    }
    plan.search_queries = require_output(
        plan.search_queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect(),
        "query generation",
    )?;

    info!(queries = plan.search_queries.len(), "query plan ready");
    Ok(plan)
}

/// Run every query against the search model with bounded concurrency.
///
/// Failed or timed-out searches become [`SearchOutcome::Error`] findings;
/// the returned list always matches `queries` in length and order.
#[instrument(skip_all, fields(queries = queries.len(), model = %model))]
pub async fn search_all(
    search: Arc<dyn ChatModel>,
    model: &str,
    queries: &[String],
    fanout: &FanoutConfig,
    progress: &dyn ProgressReporter,
) -> Vec<SearchFinding> {
    let model = model.to_string();
    let outcomes = fan_out(queries.to_vec(), fanout, progress, move |query| {
        let search = search.clone();
        let request = ChatRequest::new(model.clone())
            .system(prompts::RESEARCH_SEARCH_SYSTEM)
            .user(query);
        async move { ask(search.as_ref(), request).await }
    })
    .await;

    let findings: Vec<SearchFinding> = queries
        .iter()
        .zip(outcomes)
        .map(|(query, outcome)| SearchFinding {
            query: query.clone(),
            outcome: match outcome {
                Outcome::Done(text) => SearchOutcome::Answer(text),
                Outcome::Failed(reason) => SearchOutcome::Error(reason),
            },
        })
        .collect();

    let failed = findings.iter().filter(|f| !f.is_ok()).count();
    info!(total = findings.len(), failed, "searches finished");
    findings
}

/// Synthesize the findings into the final answer.
#[instrument(skip_all, fields(model = %model, findings = findings.len()))]
pub async fn synthesize(
    chat: &dyn ChatModel,
    model: &str,
    question: &str,
    findings: &[SearchFinding],
) -> Result<String> {
    let findings_json = serde_json::to_string_pretty(findings)
        .map_err(|e| PromptKitError::parse(format!("serializing findings: {e}")))?;
    let prompt = fill(
        prompts::RESEARCH_SYNTHESIS_PROMPT,
        &[("query", question), ("findings", &findings_json)],
    );
    ask(chat, ChatRequest::new(model).user(prompt)).await
}

/// Save the report under the next free number in `dir`.
pub fn save_report(
    dir: &Path,
    question: &str,
    plan: &QueryPlan,
    answer: &str,
    elapsed: Duration,
) -> Result<PathBuf> {
    let generated_at = Local::now().naive_local();
    let (path, _) = journal::write_numbered(dir, REPORT_PREFIX, "md", |number| {
        render_research_report(&ResearchReport {
            number,
            generated_at,
            execution_time: elapsed,
            query: question.to_string(),
            topic_analysis: plan.topic_analysis.clone(),
            findings: answer.to_string(),
        })
    })?;
    Ok(path)
}

/// Run the whole research pipeline.
#[instrument(skip_all)]
pub async fn run(
    planner: &dyn ChatModel,
    search: Arc<dyn ChatModel>,
    config: &ResearchConfig,
    question: &str,
    progress: &dyn ProgressReporter,
) -> Result<ResearchOutcome> {
    let started = Instant::now();

    progress.phase("Generating research queries");
    let plan = generate_queries(planner, &config.planner_model, question).await?;

    progress.phase("Searching the web");
    let findings = search_all(
        search,
        &config.search_model,
        &plan.search_queries,
        &config.fanout,
        progress,
    )
    .await;

    progress.phase("Synthesizing findings");
    let answer = synthesize(planner, &config.planner_model, question, &findings).await?;

    let elapsed = started.elapsed();
    let report_path = save_report(&config.report_dir, question, &plan, &answer, elapsed)?;
    progress.done(&format!("Results saved to {}", report_path.display()));

    Ok(ResearchOutcome {
        plan,
        findings,
        answer,
        report_path,
        elapsed,
    })
}
