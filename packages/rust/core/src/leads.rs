//! Instagram lead collection: repeated web searches feeding the
//! deduplicating lead file until a round turns up nothing new.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use promptkit_providers::{SearchDepth, SearchEngine, SearchRequest, SearchResponse};
use promptkit_shared::{Lead, LeadsConfig, MinimalLead, Result};
use promptkit_storage::{JsonSink, SinkReport, renumber_minimal};
use tracing::{info, instrument, warn};

use crate::pipeline::ProgressReporter;

/// Parameters of one collection run.
#[derive(Debug, Clone)]
pub struct LeadSearch {
    pub niche: String,
    pub location: String,
    /// Store only numbered profile URLs.
    pub minimal: bool,
    pub output_file: PathBuf,
    pub max_rounds: u32,
    pub max_results: u32,
    pub include_domains: Vec<String>,
}

impl LeadSearch {
    pub fn new(niche: &str, location: &str, minimal: bool, config: &LeadsConfig, output_file: PathBuf) -> Self {
        Self {
            niche: niche.to_string(),
            location: location.to_string(),
            minimal,
            output_file,
            max_rounds: config.max_rounds.max(1),
            max_results: config.max_results,
            include_domains: config.include_domains.clone(),
        }
    }

    fn query(&self) -> String {
        format!("instagram {} business in {}", self.niche, self.location)
    }
}

/// Why the collection loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    NoNewLeads,
    NoResults,
    SearchFailed(String),
    MaxRounds,
}

/// Totals of a collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadsSummary {
    pub rounds: u32,
    pub new_leads: usize,
    pub total: usize,
    pub stop: StopReason,
}

/// Run one lead search.
#[instrument(skip_all, fields(niche = %search.niche, location = %search.location))]
pub async fn search_leads(engine: &dyn SearchEngine, search: &LeadSearch) -> Result<SearchResponse> {
    let request = SearchRequest {
        query: search.query(),
        depth: SearchDepth::Advanced,
        include_answer: true,
        include_domains: search.include_domains.clone(),
        max_results: search.max_results,
    };
    engine.search(&request).await
}

/// Turn search hits into leads.
///
/// Only instagram.com URLs count. The handle is the path after
/// `instagram.com/` without slashes; post links (`/p/...`) and bare domain
/// links are skipped. The business name is the title up to the first `•`.
pub fn process_leads(
    response: &SearchResponse,
    niche: &str,
    location: &str,
    found_at: DateTime<Utc>,
) -> Vec<Lead> {
    response
        .results
        .iter()
        .filter_map(|hit| {
            let (_, rest) = hit.url.split_once("instagram.com/")?;
            let handle = rest.trim_matches('/');
            if handle.is_empty() || handle == "p" || handle.starts_with("p/") {
                return None;
            }

            let business_name = hit.title.split('•').next().unwrap_or_default().trim();
            Some(Lead {
                profile_url: hit.url.clone(),
                instagram_handle: Some(handle.to_string()),
                business_name: business_name.to_string(),
                description: hit.content.clone(),
                relevance_score: hit.score,
                niche: niche.to_string(),
                location: location.to_string(),
                found_at: Some(found_at),
                extra: Default::default(),
            })
        })
        .collect()
}

fn to_minimal(leads: Vec<Lead>) -> Vec<MinimalLead> {
    leads
        .into_iter()
        .map(|l| MinimalLead {
            number: 0,
            profile_url: l.profile_url,
        })
        .collect()
}

fn save(search: &LeadSearch, leads: Vec<Lead>) -> Result<SinkReport> {
    if search.minimal {
        JsonSink::<MinimalLead>::new(&search.output_file).append_with(to_minimal(leads), renumber_minimal)
    } else {
        JsonSink::<Lead>::new(&search.output_file)
            .sorted_by_relevance()
            .append(leads)
    }
}

/// Check the engine, then search and save until nothing new turns up.
#[instrument(skip_all, fields(niche = %search.niche, location = %search.location))]
pub async fn run(
    engine: &dyn SearchEngine,
    search: &LeadSearch,
    progress: &dyn ProgressReporter,
) -> Result<LeadsSummary> {
    progress.phase("Testing search API connection");
    engine.ping().await?;

    let mut summary = LeadsSummary {
        rounds: 0,
        new_leads: 0,
        total: 0,
        stop: StopReason::MaxRounds,
    };

    while summary.rounds < search.max_rounds {
        summary.rounds += 1;
        progress.phase(&format!("Query iteration {}", summary.rounds));

        let response = match search_leads(engine, search).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "lead search failed, stopping");
                summary.stop = StopReason::SearchFailed(e.to_string());
                break;
            }
        };

        if response.results.is_empty() {
            summary.stop = StopReason::NoResults;
            break;
        }

        let leads = process_leads(&response, &search.niche, &search.location, Utc::now());
        let report = save(search, leads)?;
        summary.new_leads += report.added;
        summary.total = report.total;
        info!(round = summary.rounds, added = report.added, total = report.total, "round saved");

        if report.added == 0 {
            summary.stop = StopReason::NoNewLeads;
            break;
        }
    }

    progress.done(&format!("Total new leads found: {}", summary.new_leads));
    Ok(summary)
}
