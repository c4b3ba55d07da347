//! Channel video analysis: rank scraped videos by view count and have the
//! model write a markdown report about the top ones.

use std::path::{Path, PathBuf};

use promptkit_providers::{ChatModel, ChatRequest};
use promptkit_reports::{render_video_analysis, render_video_summary};
use promptkit_shared::{PromptKitError, Result, Video};
use promptkit_storage::write_atomic;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::pipeline::{ProgressReporter, ask, require_output};
use crate::prompts::{self, fill};

/// Number of videos kept by default.
pub const DEFAULT_TOP_N: usize = 10;

/// Settings of one analysis run.
#[derive(Debug, Clone)]
pub struct VideosConfig {
    pub model: String,
    pub top_n: usize,
    pub output_file: PathBuf,
}

/// A scraped video list, either bare or wrapped with its channel URL.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VideosFile {
    Wrapped {
        channel_url: String,
        videos: Vec<Video>,
    },
    Bare(Vec<Video>),
}

/// Load a scraped video list. Returns the channel URL when the file has one.
pub fn load_videos(path: &Path) -> Result<(Option<String>, Vec<Video>)> {
    let content = std::fs::read_to_string(path).map_err(|e| PromptKitError::io(path, e))?;
    let file: VideosFile = serde_json::from_str(&content)
        .map_err(|e| PromptKitError::parse(format!("{}: {e}", path.display())))?;

    Ok(match file {
        VideosFile::Wrapped {
            channel_url,
            videos,
        } => (Some(channel_url), videos),
        VideosFile::Bare(videos) => (None, videos),
    })
}

/// Parse a displayed view count such as `1.2M`, `1,2 tys.` or `12,345 views`.
///
/// Recognizes the `K`/`M`/`B` and `TYS`/`MLN`/`MLD` suffixes. Without a
/// suffix, a comma followed only by three-digit groups is a thousands
/// separator; any other comma is a decimal point. Unparsable text counts
/// as 0.
pub fn parse_views(text: &str) -> u64 {
    let compact: String = text
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let number_len = compact
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(compact.len());
    let (number, rest) = compact.split_at(number_len);

    let multiplier = [
        ("TYS", 1e3),
        ("MLN", 1e6),
        ("MLD", 1e9),
        ("K", 1e3),
        ("M", 1e6),
        ("B", 1e9),
    ]
    .iter()
    .find(|(suffix, _)| rest.starts_with(suffix))
    .map_or(1.0, |(_, m)| *m);

    let thousands = multiplier == 1.0
        && number.contains(',')
        && number
            .split(',')
            .skip(1)
            .all(|group| group.len() == 3 && group.chars().all(|c| c.is_ascii_digit()));
    let normalized = if thousands {
        number.replace(',', "")
    } else {
        number.replace(',', ".")
    };

    match normalized.parse::<f64>() {
        Ok(value) => (value * multiplier).round() as u64,
        Err(_) => {
            warn!(views = %text, "could not parse view count, using 0");
            0
        }
    }
}

/// Sort by parsed views, highest first, keeping ties in input order, and
/// keep the first `top_n`.
pub fn rank_videos(mut videos: Vec<Video>, top_n: usize) -> Vec<Video> {
    videos.sort_by_cached_key(|v| std::cmp::Reverse(parse_views(&v.views)));
    videos.truncate(top_n);
    videos
}

/// Ask the model for a markdown analysis of the ranked videos.
#[instrument(skip_all, fields(model = %model, videos = videos.len()))]
pub async fn analyze(
    chat: &dyn ChatModel,
    model: &str,
    channel: &str,
    videos: &[Video],
) -> Result<String> {
    let summary = render_video_summary(videos);
    let count = videos.len().to_string();
    let request = ChatRequest::new(model)
        .system(format!("{}\n\nVideo data:\n{summary}", prompts::VIDEO_ANALYSIS_SYSTEM))
        .user(fill(
            prompts::VIDEO_ANALYSIS_PROMPT,
            &[("channel", channel), ("count", &count), ("summary", &summary)],
        ));
    ask(chat, request).await
}

/// Rank, analyze and save. Returns the analysis text.
#[instrument(skip_all, fields(channel = %channel))]
pub async fn run(
    chat: &dyn ChatModel,
    config: &VideosConfig,
    channel: &str,
    videos: Vec<Video>,
    progress: &dyn ProgressReporter,
) -> Result<String> {
    let videos = require_output(videos, "video scraping")?;

    progress.phase("Ranking videos by views");
    let ranked = rank_videos(videos, config.top_n);
    info!(kept = ranked.len(), "videos ranked");

    progress.phase("Analyzing channel");
    let analysis = analyze(chat, &config.model, channel, &ranked).await?;

    write_atomic(
        &config.output_file,
        render_video_analysis(channel, &analysis).as_bytes(),
    )?;
    progress.done(&format!("Analysis saved to {}", config.output_file.display()));

    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::test_support::ScriptedChat;

    fn video(title: &str, views: &str) -> Video {
        Video {
            video_title: title.into(),
            views: views.into(),
            upload_date: "1 year ago".into(),
        }
    }

    #[test]
    fn view_counts() {
        assert_eq!(parse_views("1.2M views"), 1_200_000);
        assert_eq!(parse_views("1,2 tys. wyświetleń"), 1_200);
        assert_eq!(parse_views("3,4 mln"), 3_400_000);
        assert_eq!(parse_views("2 mld"), 2_000_000_000);
        assert_eq!(parse_views("15K"), 15_000);
        assert_eq!(parse_views("12,345 views"), 12_345);
        assert_eq!(parse_views("1,234,567"), 1_234_567);
        assert_eq!(parse_views("800"), 800);
        assert_eq!(parse_views("No views"), 0);
        assert_eq!(parse_views(""), 0);
    }

    #[test]
    fn ranking_is_stable_and_truncated() {
        let videos = vec![
            video("a", "1K"),
            video("b", "2M"),
            video("c", "1,000"),
            video("d", "5"),
        ];
        let ranked = rank_videos(videos, 3);
        let titles: Vec<_> = ranked.iter().map(|v| v.video_title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a", "c"]);
    }

    #[test]
    fn both_file_shapes_load() {
        let dir = tempfile::tempdir().unwrap();
        let bare = dir.path().join("bare.json");
        std::fs::write(&bare, r#"[{"video_title":"x","views":"1K","upload_date":"today"}]"#).unwrap();
        let (channel, videos) = load_videos(&bare).unwrap();
        assert!(channel.is_none());
        assert_eq!(videos.len(), 1);

        let wrapped = dir.path().join("wrapped.json");
        std::fs::write(
            &wrapped,
            r#"{"channel_url":"https://www.youtube.com/@c/videos","videos":[{"video_title":"x"}]}"#,
        )
        .unwrap();
        let (channel, videos) = load_videos(&wrapped).unwrap();
        assert_eq!(channel.as_deref(), Some("https://www.youtube.com/@c/videos"));
        assert_eq!(videos[0].views, "");
    }

    #[tokio::test]
    async fn run_writes_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let chat = ScriptedChat::always("## Top content\nTutorials win.");
        let config = VideosConfig {
            model: "grok-beta".into(),
            top_n: 1,
            output_file: dir.path().join("youtube_analysis.md"),
        };
        let videos = vec![video("small", "10"), video("big", "1M")];

        let analysis = run(&chat, &config, "https://yt/@c", videos, &SilentProgress)
            .await
            .unwrap();
        assert!(analysis.starts_with("## Top content"));

        let prompt = &chat.user_messages()[0];
        assert!(prompt.contains("Total Videos Analyzed: 1"));
        assert!(prompt.contains("Title: big, Views: 1M"));
        assert!(!prompt.contains("Title: small"));

        let doc = std::fs::read_to_string(&config.output_file).unwrap();
        assert!(doc.contains("Analysis generated for: https://yt/@c"));
    }

    #[tokio::test]
    async fn empty_list_aborts() {
        let chat = ScriptedChat::always("unused");
        let config = VideosConfig {
            model: "grok-beta".into(),
            top_n: DEFAULT_TOP_N,
            output_file: PathBuf::from("unused.md"),
        };
        let err = run(&chat, &config, "c", Vec::new(), &SilentProgress).await.unwrap_err();
        assert!(matches!(err, PromptKitError::Validation { .. }));
        assert_eq!(chat.calls(), 0);
    }
}
