//! Markdown and plain-text rendering for pipeline outputs.
//!
//! Everything here is a pure function of its inputs; callers pass in
//! timestamps so output is reproducible.

mod progress;
mod research;
mod text;
mod videos;

pub use progress::{PROGRESS_HEADER, render_progress_entry};
pub use research::{ResearchReport, render_research_report};
pub use text::{render_links, render_outreach, render_tasks};
pub use videos::{render_video_analysis, render_video_summary};

/// Timestamp layout used in every rendered document.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
