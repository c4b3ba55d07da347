//! Task board: each new task gets a priority written by the model in the
//! context of the tasks already on the board.

use promptkit_providers::{ChatModel, ChatRequest};
use promptkit_shared::{Result, Task};
use tracing::{info, instrument};

use crate::pipeline::ask;
use crate::prompts::{self, fill};

const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.1;

/// Ask the model where `task` belongs among `existing`.
#[instrument(skip_all, fields(model = %model, existing = existing.len()))]
pub async fn prioritize(
    chat: &dyn ChatModel,
    model: &str,
    task: &str,
    existing: &[Task],
) -> Result<String> {
    let listing = existing
        .iter()
        .map(|t| format!("- {} (Priority: {})", t.name, t.priority))
        .collect::<Vec<_>>()
        .join("\n");

    let request = ChatRequest::new(model)
        .user(fill(prompts::TASK_PRIORITY_PROMPT, &[("tasks", &listing), ("task", task)]))
        .max_tokens(MAX_TOKENS)
        .temperature(TEMPERATURE);
    ask(chat, request).await
}

/// The in-memory task list of one session.
#[derive(Debug, Default)]
pub struct TaskBoard {
    tasks: Vec<Task>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Prioritize `name` against the current board and add it.
    ///
    /// The board is unchanged when the model call fails.
    pub async fn add(&mut self, chat: &dyn ChatModel, model: &str, name: &str) -> Result<&Task> {
        let priority = prioritize(chat, model, name, &self.tasks).await?;
        info!(task = %name, "task prioritized");

        self.tasks.push(Task {
            name: name.to_string(),
            priority,
        });
        Ok(&self.tasks[self.tasks.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedChat;
    use promptkit_shared::PromptKitError;

    #[tokio::test]
    async fn new_task_sees_existing_ones() {
        let chat = ScriptedChat::new(vec![Ok(" 1. high \n".into()), Ok("2. low".into())]);
        let mut board = TaskBoard::new();

        board.add(&chat, "claude-3-5-sonnet-20241022", "ship release").await.unwrap();
        let added = board.add(&chat, "claude-3-5-sonnet-20241022", "water plants").await.unwrap();
        assert_eq!(added.priority, "2. low");

        assert_eq!(board.tasks()[0].priority, "1. high");
        let prompts = chat.user_messages();
        assert!(prompts[1].contains("- ship release (Priority: 1. high)"));
        assert!(prompts[1].contains("Analyze this new task: \"water plants\""));

        let request = &chat.requests.lock().unwrap()[0];
        assert_eq!(request.max_tokens, Some(1000));
        assert_eq!(request.temperature, Some(0.1));
    }

    #[tokio::test]
    async fn failed_call_leaves_board_unchanged() {
        let chat = ScriptedChat::new(vec![Err(PromptKitError::provider("anthropic", "HTTP 401"))]);
        let mut board = TaskBoard::new();
        assert!(board.add(&chat, "m", "x").await.is_err());
        assert!(board.tasks().is_empty());
    }
}
