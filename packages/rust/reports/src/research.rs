use std::time::Duration;

use chrono::NaiveDateTime;

use crate::TIMESTAMP_FORMAT;

/// Everything a saved research report contains.
#[derive(Debug, Clone)]
pub struct ResearchReport {
    pub number: u32,
    pub generated_at: NaiveDateTime,
    pub execution_time: Duration,
    pub query: String,
    pub topic_analysis: String,
    pub findings: String,
}

/// Render a numbered research report.
pub fn render_research_report(report: &ResearchReport) -> String {
    let topic = if report.topic_analysis.trim().is_empty() {
        "Topic analysis not available"
    } else {
        report.topic_analysis.as_str()
    };

    format!(
        "# Research #{number}\n\n\
         ## Timestamp\n{timestamp}\n\n\
         ## Execution Time\n{seconds:.2} seconds\n\n\
         ## Original Query\n{query}\n\n\
         ## Topic Analysis\n{topic}\n\n\
         ## Findings\n{findings}\n",
        number = report.number,
        timestamp = report.generated_at.format(TIMESTAMP_FORMAT),
        seconds = report.execution_time.as_secs_f64(),
        query = report.query,
        findings = report.findings,
    )
}
