//! Ads-library link collection: one page fetch per keyword, profile links
//! merged into a timestamped text file.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::Local;
use promptkit_reports::render_links;
use promptkit_scrape::{PageFetcher, ads_search_url, extract_profile_links};
use promptkit_shared::{AdsConfig, Result};
use promptkit_storage::write_atomic;
use tracing::{info, instrument, warn};

use crate::pipeline::ProgressReporter;

/// What a collection run produced.
#[derive(Debug, Clone)]
pub struct AdsOutcome {
    pub links: BTreeSet<String>,
    pub output_file: PathBuf,
    /// Keywords whose page could not be fetched.
    pub failed_keywords: Vec<String>,
}

/// Fetch the ads-library results for each keyword and save the links.
///
/// A keyword whose fetch fails is logged and skipped.
#[instrument(skip_all, fields(keywords = keywords.len()))]
pub async fn run(
    fetcher: &PageFetcher,
    config: &AdsConfig,
    results_dir: PathBuf,
    keywords: &[String],
    progress: &dyn ProgressReporter,
) -> Result<AdsOutcome> {
    let mut links = BTreeSet::new();
    let mut failed_keywords = Vec::new();

    for (i, keyword) in keywords.iter().enumerate() {
        progress.phase(&format!("Searching for keyword: {keyword}"));
        let url = ads_search_url(&config.library_url, keyword, &config.country)?;

        match fetcher.fetch_html(&url).await {
            Ok(html) => {
                let found = extract_profile_links(&html);
                info!(%keyword, found = found.len(), "keyword searched");
                links.extend(found);
            }
            Err(e) => {
                warn!(%keyword, error = %e, "keyword search failed, skipping");
                failed_keywords.push(keyword.clone());
            }
        }
        progress.step(i + 1, keywords.len());
    }

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let output_file = results_dir.join(format!("profile_links_{stamp}.txt"));
    write_atomic(&output_file, render_links(&links).as_bytes())?;

    info!(links = links.len(), path = %output_file.display(), "profile links saved");
    progress.done(&format!("Saved {} unique profile links", links.len()));

    Ok(AdsOutcome {
        links,
        output_file,
        failed_keywords,
    })
}
