//! OpenAI-compatible `/chat/completions` adapter.
//!
//! Serves OpenAI itself as well as Perplexity and xAI, which expose the same
//! wire format under a different base URL.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use promptkit_shared::{PromptKitError, ProviderConfig, Result, resolve_api_key};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{ChatMessage, ChatModel, ChatRequest, ChatResponse, Role, build_client, endpoint, status_error};

/// Chat client for any OpenAI-compatible endpoint.
pub struct OpenAiCompatible {
    name: String,
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiCompatible {
    /// Create a client with an explicit API key.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let name = name.into();
        let client = build_client(&name, timeout)?;
        Ok(Self {
            name,
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Create a client whose key is read from the configured env var.
    pub fn from_config(name: &str, config: &ProviderConfig, timeout: Duration) -> Result<Self> {
        let api_key = resolve_api_key(name, config)?;
        Self::new(name, config.base_url.clone(), api_key, timeout)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn to_wire(request: &ChatRequest) -> WireRequest<'_> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        messages.push(ChatMessage {
            role: Role::System,
            content: system.clone(),
        });
    }
    messages.extend(request.messages.iter().cloned());

    WireRequest {
        model: &request.model,
        messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        response_format: request.json_mode.then_some(ResponseFormat {
            kind: "json_object",
        }),
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatible {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(provider = %self.name, model = %request.model))]
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = endpoint(&self.base_url, "chat/completions");
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&to_wire(&request))
            .send()
            .await
            .map_err(|e| PromptKitError::provider(&self.name, format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(status_error(&self.name, response).await);
        }

        let body: WireResponse = response.json().await.map_err(|e| {
            PromptKitError::provider(&self.name, format!("invalid completion response: {e}"))
        })?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| PromptKitError::provider(&self.name, "completion had no content"))?;

        let usage = body.usage.unwrap_or(WireUsage {
            prompt_tokens: 0,
            completion_tokens: 0,
        });
        let latency_ms = started.elapsed().as_millis() as u64;

        debug!(
            tokens_in = usage.prompt_tokens,
            tokens_out = usage.completion_tokens,
            latency_ms,
            "completion received"
        );

        Ok(ChatResponse {
            text,
            model: body.model.unwrap_or(request.model),
            tokens_in: usage.prompt_tokens,
            tokens_out: usage.completion_tokens,
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAiCompatible {
        OpenAiCompatible::new("openai", server.uri(), "sk-test", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn system_prompt_goes_first() {
        let req = ChatRequest::new("m").user("hi").system("sys");
        let wire = to_wire(&req);
        assert_eq!(wire.messages[0].role, Role::System);
        assert_eq!(wire.messages[1].content, "hi");
        assert!(wire.response_format.is_none());
    }

    #[test]
    fn json_mode_sets_response_format() {
        let req = ChatRequest::new("m").user("hi").json_mode();
        let json = serde_json::to_string(&to_wire(&req)).unwrap();
        assert!(json.contains(r#""response_format":{"type":"json_object"}"#));
        assert!(!json.contains("temperature"));
    }

    #[tokio::test]
    async fn completes_against_mock_server() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "gpt-4o-2024",
                "choices": [{"message": {"role": "assistant", "content": "hello back"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3}
            })))
            .mount(&server)
            .await;

        let response = client(&server)
            .complete(ChatRequest::new("gpt-4o").user("hello"))
            .await
            .unwrap();

        assert_eq!(response.text, "hello back");
        assert_eq!(response.model, "gpt-4o-2024");
        assert_eq!(response.tokens_in, 12);
        assert_eq!(response.tokens_out, 3);
    }

    #[tokio::test]
    async fn http_error_becomes_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client(&server)
            .complete(ChatRequest::new("gpt-4o").user("hello"))
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("openai error"));
        assert!(message.contains("429"));
        assert!(message.contains("rate limited"));
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .complete(ChatRequest::new("gpt-4o").user("hello"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no content"));
    }
}
