//! Anthropic Messages API adapter.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use promptkit_shared::{PromptKitError, ProviderConfig, Result, resolve_api_key};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{ChatMessage, ChatModel, ChatRequest, ChatResponse, Role, build_client, endpoint, status_error};

/// API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The Messages API requires `max_tokens`.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Chat client for the Anthropic Messages API.
pub struct Anthropic {
    client: Client,
    base_url: String,
    api_key: String,
}

impl Anthropic {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client("anthropic", timeout)?,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Result<Self> {
        let api_key = resolve_api_key("anthropic", config)?;
        Self::new(config.base_url.clone(), api_key, timeout)
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

fn to_wire(request: &ChatRequest) -> WireRequest<'_> {
    // System turns are a top-level field here, not a message role.
    let mut system: Vec<&str> = request.system.iter().map(String::as_str).collect();
    system.extend(
        request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str()),
    );

    WireRequest {
        model: &request.model,
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        temperature: request.temperature,
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        messages: request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .collect(),
    }
}

#[async_trait]
impl ChatModel for Anthropic {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip_all, fields(provider = "anthropic", model = %request.model))]
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = endpoint(&self.base_url, "v1/messages");
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&to_wire(&request))
            .send()
            .await
            .map_err(|e| PromptKitError::provider("anthropic", format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(status_error("anthropic", response).await);
        }

        let body: WireResponse = response.json().await.map_err(|e| {
            PromptKitError::provider("anthropic", format!("invalid messages response: {e}"))
        })?;

        let text = body
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(PromptKitError::provider("anthropic", "response had no text content"));
        }

        let usage = body.usage.unwrap_or_default();
        let latency_ms = started.elapsed().as_millis() as u64;
        debug!(
            tokens_in = usage.input_tokens,
            tokens_out = usage.output_tokens,
            latency_ms,
            "message received"
        );

        Ok(ChatResponse {
            text,
            model: body.model.unwrap_or(request.model),
            tokens_in: usage.input_tokens,
            tokens_out: usage.output_tokens,
            latency_ms,
        })
    }
}
