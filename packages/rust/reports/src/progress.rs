use chrono::NaiveDateTime;

use crate::TIMESTAMP_FORMAT;

/// First lines of a fresh progress journal.
pub const PROGRESS_HEADER: &str =
    "# Development Progress\n\nLog of changes detected between tracker runs.\n\n";

/// One `## Update` section for the progress journal.
pub fn render_progress_entry(at: NaiveDateTime, summary: &str) -> String {
    format!(
        "\n## Update {}\n\n{}\n\n---\n",
        at.format(TIMESTAMP_FORMAT),
        summary.trim_end()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn entry_layout() {
        let at = NaiveDate::from_ymd_opt(2025, 1, 31)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(
            render_progress_entry(at, "- added parser\n"),
            "\n## Update 2025-01-31 08:00:00\n\n- added parser\n\n---\n"
        );
    }
}
