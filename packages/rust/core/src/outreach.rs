//! Outreach pipeline: industry → search queries → market searches →
//! cold-outreach drafts.

use std::path::Path;

use promptkit_providers::{ChatModel, ChatRequest};
use promptkit_shared::{OutreachDraft, Result};
use tracing::{info, instrument};

use crate::pipeline::{ProgressReporter, ask, require_output};
use crate::prompts::{self, fill};

/// Models used by the outreach stages.
#[derive(Debug, Clone)]
pub struct OutreachConfig {
    /// Writes the queries and the drafts.
    pub writer_model: String,
    /// Online model answering the market searches.
    pub search_model: String,
}

/// Market findings for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketFinding {
    pub query: String,
    pub results: String,
}

/// Ask for five search queries and clean up the list.
#[instrument(skip_all, fields(model = %model))]
pub async fn generate_search_queries(
    chat: &dyn ChatModel,
    model: &str,
    industry: &str,
) -> Result<Vec<String>> {
    let request = ChatRequest::new(model)
        .system(prompts::OUTREACH_QUERY_SYSTEM)
        .user(fill(prompts::OUTREACH_QUERY_PROMPT, &[("industry", industry)]));
    let text = ask(chat, request).await?;

    let queries = require_output(parse_query_lines(&text), "search query generation")?;
    info!(queries = queries.len(), "search queries generated");
    Ok(queries)
}

/// One query per non-blank line, without list markers or wrapping quotes.
pub fn parse_query_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(clean_query_line)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

fn clean_query_line(line: &str) -> &str {
    let line = line.trim();
    let line = line
        .strip_prefix(['-', '*', '•'])
        .map(str::trim_start)
        .unwrap_or(line);

    // "1." / "2)" numbering
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let line = if digits > 0 {
        line[digits..]
            .strip_prefix(['.', ')'])
            .map(str::trim_start)
            .unwrap_or(line)
    } else {
        line
    };

    line.trim_matches(|c: char| c == '"' || c == '\'' || c == '“' || c == '”')
        .trim()
}

/// Search each query in turn.
#[instrument(skip_all, fields(queries = queries.len(), model = %model))]
pub async fn search_markets(
    search: &dyn ChatModel,
    model: &str,
    queries: &[String],
    progress: &dyn ProgressReporter,
) -> Result<Vec<MarketFinding>> {
    let mut findings = Vec::with_capacity(queries.len());
    for (i, query) in queries.iter().enumerate() {
        info!(%query, "performing search");
        let request = ChatRequest::new(model)
            .system(prompts::OUTREACH_SEARCH_SYSTEM)
            .user(fill(prompts::OUTREACH_SEARCH_PROMPT, &[("query", query)]));
        let results = ask(search, request).await?;
        findings.push(MarketFinding {
            query: query.clone(),
            results,
        });
        progress.step(i + 1, queries.len());
    }
    Ok(findings)
}

/// Draft outreach messages for each market finding, in turn.
#[instrument(skip_all, fields(findings = findings.len(), model = %model))]
pub async fn draft_outreach(
    chat: &dyn ChatModel,
    model: &str,
    findings: Vec<MarketFinding>,
    progress: &dyn ProgressReporter,
) -> Result<Vec<OutreachDraft>> {
    let total = findings.len();
    let mut drafts = Vec::with_capacity(total);
    for (i, finding) in findings.into_iter().enumerate() {
        let request = ChatRequest::new(model)
            .system(prompts::OUTREACH_DRAFT_SYSTEM)
            .user(fill(
                prompts::OUTREACH_DRAFT_PROMPT,
                &[("query", &finding.query), ("results", &finding.results)],
            ));
        let outreach_messages = ask(chat, request).await?;
        drafts.push(OutreachDraft {
            query: finding.query,
            search_results: finding.results,
            outreach_messages,
        });
        progress.step(i + 1, total);
    }
    Ok(drafts)
}

/// Run the whole outreach pipeline, optionally saving the drafts as JSON.
#[instrument(skip_all)]
pub async fn run(
    writer: &dyn ChatModel,
    search: &dyn ChatModel,
    config: &OutreachConfig,
    industry: &str,
    save_to: Option<&Path>,
    progress: &dyn ProgressReporter,
) -> Result<Vec<OutreachDraft>> {
    progress.phase("Generating search queries");
    let queries = generate_search_queries(writer, &config.writer_model, industry).await?;

    progress.phase("Performing web searches");
    let findings = search_markets(search, &config.search_model, &queries, progress).await?;

    progress.phase("Drafting outreach messages");
    let drafts = draft_outreach(writer, &config.writer_model, findings, progress).await?;

    if let Some(path) = save_to {
        promptkit_storage::write_json_atomic(path, &drafts)?;
        info!(path = %path.display(), "outreach drafts saved");
    }

    progress.done(&format!("{} outreach drafts ready", drafts.len()));
    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::test_support::ScriptedChat;
    use promptkit_shared::PromptKitError;

    #[test]
    fn query_lines_are_cleaned() {
        let text = "1. \"dental clinic scheduling problems\"\n\n2) patient no-shows\n- 'billing software pain'\n• insurance claims\n   \n10. 24/7 booking demand";
        assert_eq!(
            parse_query_lines(text),
            vec![
                "dental clinic scheduling problems",
                "patient no-shows",
                "billing software pain",
                "insurance claims",
                "24/7 booking demand",
            ]
        );
    }

    #[test]
    fn leading_numbers_without_marker_are_kept() {
        assert_eq!(parse_query_lines("2024 retail trends"), vec!["2024 retail trends"]);
    }

    #[tokio::test]
    async fn blank_answer_aborts() {
        let chat = ScriptedChat::always("\n  \n");
        let err = generate_search_queries(&chat, "gpt-4o", "dentists").await;
        // A blank completion trims to empty, which aborts the pipeline.
        assert!(matches!(err, Err(PromptKitError::Validation { .. })));
    }

    #[tokio::test]
    async fn full_run_is_sequential_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("drafts.json");

        let writer = ScriptedChat::from_fn(|req| {
            let user = req.last_user_message().unwrap_or_default();
            if user.starts_with("Generate a list") {
                Ok("1. q one\n2. q two".into())
            } else {
                Ok(format!("draft for {}", user.lines().next().unwrap_or_default()))
            }
        });
        let search = ScriptedChat::from_fn(|req| {
            Ok(format!("results: {}", req.last_user_message().unwrap_or_default().lines().next().unwrap_or_default()))
        });
        let config = OutreachConfig {
            writer_model: "gpt-4o".into(),
            search_model: "sonar".into(),
        };

        let drafts = run(&writer, &search, &config, "dentists", Some(&out), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].query, "q one");
        assert_eq!(drafts[0].search_results, "results: Search the web for: q one");
        assert!(drafts[1].outreach_messages.starts_with("draft for Based on these search results about 'q two'"));
        assert_eq!(search.calls(), 2);

        let saved: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(saved.len(), 2);
        assert!(saved[0].get("outreach_messages").is_some());
    }
}
