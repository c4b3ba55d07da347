use promptkit_shared::Video;

/// One line per video: title, raw view text, upload date.
pub fn render_video_summary(videos: &[Video]) -> String {
    videos
        .iter()
        .map(|v| {
            format!(
                "Title: {}, Views: {}, Upload Date: {}",
                v.video_title, v.views, v.upload_date
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap the model's analysis in the saved document layout.
pub fn render_video_analysis(channel: &str, analysis: &str) -> String {
    format!("# YouTube Channel Analysis\n\nAnalysis generated for: {channel}\n\n---\n\n{analysis}")
}
