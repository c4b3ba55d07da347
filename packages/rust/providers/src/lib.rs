//! Client adapters for the external LLM and web-search APIs.
//!
//! Every adapter sits behind one of two traits so pipelines never see a
//! provider's wire format:
//! - [`ChatModel`]: chat completion (OpenAI-compatible endpoints, Anthropic)
//! - [`SearchEngine`]: web search (Tavily)
//!
//! Adapters report transport, status and decode failures as
//! [`PromptKitError::Provider`] and never retry.

mod anthropic;
mod openai;
mod tavily;

use std::time::Duration;

use async_trait::async_trait;
use promptkit_shared::{PromptKitError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub use anthropic::Anthropic;
pub use openai::OpenAiCompatible;
pub use tavily::Tavily;

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("promptkit/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body echoed into an error message.
const MAX_ERROR_BODY: usize = 300;

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// A provider-neutral chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask the provider to answer with a single JSON object.
    pub json_mode: bool,
}

impl ChatRequest {
    /// Start a request for `model` with no messages.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            json_mode: false,
        }
    }

    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.system = Some(content.into());
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: Role::User,
            content: content.into(),
        });
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }

    /// Last user message, mostly useful for logging and test doubles.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Normalized completion result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    pub model: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub latency_ms: u64,
}

/// A chat-completion endpoint.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Issue one completion request.
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse>;
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// How thorough a web search should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Basic,
    Advanced,
}

/// A provider-neutral search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub depth: SearchDepth,
    pub include_answer: bool,
    pub include_domains: Vec<String>,
    pub max_results: u32,
}

impl SearchRequest {
    /// A basic search returning a handful of results.
    pub fn basic(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            depth: SearchDepth::Basic,
            include_answer: false,
            include_domains: Vec::new(),
            max_results: 5,
        }
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

/// A search response: optional generated answer plus ranked hits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

/// A web-search endpoint.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Run one search.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;

    /// Check connectivity and credentials with a throwaway search.
    async fn ping(&self) -> Result<()> {
        self.search(&SearchRequest::basic("test query")).await.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with the shared user agent and a request timeout.
pub(crate) fn build_client(provider: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| PromptKitError::provider(provider, format!("failed to build HTTP client: {e}")))
}

/// Turn a non-success response into a provider error carrying the body head.
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> PromptKitError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let head: String = body.chars().take(MAX_ERROR_BODY).collect();
    PromptKitError::provider(provider, format!("HTTP {status}: {head}"))
}

/// Join a base URL and a path without doubling or dropping slashes.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_collects_parts() {
        let req = ChatRequest::new("gpt-4o")
            .system("be brief")
            .user("hello")
            .temperature(0.1)
            .max_tokens(100)
            .json_mode();
        assert_eq!(req.model, "gpt-4o");
        assert_eq!(req.system.as_deref(), Some("be brief"));
        assert_eq!(req.last_user_message(), Some("hello"));
        assert_eq!(req.temperature, Some(0.1));
        assert_eq!(req.max_tokens, Some(100));
        assert!(req.json_mode);
    }

    #[test]
    fn endpoint_joins_cleanly() {
        assert_eq!(
            endpoint("https://api.x.ai/v1/", "/chat/completions"),
            "https://api.x.ai/v1/chat/completions"
        );
        assert_eq!(
            endpoint("https://api.tavily.com", "search"),
            "https://api.tavily.com/search"
        );
    }

    #[test]
    fn search_response_tolerates_sparse_hits() {
        let json = r#"{"results":[{"url":"https://instagram.com/brew"}]}"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.answer.is_none());
        assert_eq!(parsed.results[0].score, 0.0);
        assert!(parsed.results[0].title.is_empty());
    }
}
