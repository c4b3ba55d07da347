use std::fmt::Write;

use promptkit_shared::{OutreachDraft, Task};

const RULE: &str = "--------------------------------------------------";

/// One link per line, newline-terminated.
pub fn render_links<'a>(links: impl IntoIterator<Item = &'a String>) -> String {
    links.into_iter().fold(String::new(), |mut out, link| {
        out.push_str(link);
        out.push('\n');
        out
    })
}

/// Console listing of tasks and their priorities.
pub fn render_tasks(tasks: &[Task]) -> String {
    let mut out = String::from("Current tasks:\n");
    for task in tasks {
        let _ = writeln!(out, "• {} - Priority: {}", task.name, task.priority);
    }
    out
}

/// Console listing of outreach drafts, one block per query.
pub fn render_outreach(drafts: &[OutreachDraft]) -> String {
    let mut out = String::new();
    for draft in drafts {
        let _ = write!(
            out,
            "\nQuery: '{}'\n\nSearch Results:\n{}\n\nGenerated Outreach Messages:\n{}\n\n{RULE}\n",
            draft.query, draft.search_results, draft.outreach_messages
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_are_newline_terminated() {
        let links = vec!["https://a".to_string(), "https://b".to_string()];
        assert_eq!(render_links(&links), "https://a\nhttps://b\n");
        assert_eq!(render_links(&Vec::<String>::new()), "");
    }

    #[test]
    fn task_listing() {
        let tasks = vec![Task {
            name: "ship".into(),
            priority: "high".into(),
        }];
        assert_eq!(render_tasks(&tasks), "Current tasks:\n• ship - Priority: high\n");
    }

    #[test]
    fn outreach_block_has_all_parts() {
        let drafts = vec![OutreachDraft {
            query: "dental clinic pain points".into(),
            search_results: "scheduling".into(),
            outreach_messages: "Hi there".into(),
        }];
        let text = render_outreach(&drafts);
        assert!(text.contains("Query: 'dental clinic pain points'"));
        assert!(text.contains("Search Results:\nscheduling"));
        assert!(text.contains("Generated Outreach Messages:\nHi there"));
    }
}
