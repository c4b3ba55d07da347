//! Pieces shared by every pipeline: progress reporting and the single-turn
//! completion helper stages are built from.

use promptkit_providers::{ChatModel, ChatRequest};
use promptkit_shared::{PromptKitError, Result};
use tracing::debug;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as items of the current phase complete.
    fn step(&self, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, message: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn step(&self, _current: usize, _total: usize) {}
    fn done(&self, _message: &str) {}
}

/// Send one request and return the trimmed answer text.
pub(crate) async fn ask(chat: &dyn ChatModel, request: ChatRequest) -> Result<String> {
    let response = chat.complete(request).await?;
    debug!(
        provider = chat.name(),
        model = %response.model,
        tokens_in = response.tokens_in,
        tokens_out = response.tokens_out,
        "stage answered"
    );
    Ok(response.text.trim().to_string())
}

/// Abort the pipeline when a stage produced nothing for the next one.
pub(crate) fn require_output<T>(items: Vec<T>, what: &str) -> Result<Vec<T>> {
    if items.is_empty() {
        return Err(PromptKitError::validation(format!("{what}: nothing produced, stopping")));
    }
    Ok(items)
}

/// Strip a surrounding markdown code fence, if any.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stage_output_aborts() {
        let err = require_output(Vec::<String>::new(), "search queries").unwrap_err();
        assert!(matches!(err, PromptKitError::Validation { .. }));
        assert_eq!(require_output(vec![1], "x").unwrap(), vec![1]);
    }

    #[test]
    fn code_fences_are_removed() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }
}
