//! Tavily search API adapter.

use std::time::Duration;

use async_trait::async_trait;
use promptkit_shared::{PromptKitError, ProviderConfig, Result, resolve_api_key};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    SearchDepth, SearchEngine, SearchRequest, SearchResponse, build_client, endpoint,
    status_error,
};

/// Web search client for Tavily.
pub struct Tavily {
    client: Client,
    base_url: String,
    api_key: String,
}

impl Tavily {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client("tavily", timeout)?,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Result<Self> {
        let api_key = resolve_api_key("tavily", config)?;
        Self::new(config.base_url.clone(), api_key, timeout)
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    query: &'a str,
    search_depth: SearchDepth,
    include_answer: bool,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    include_domains: &'a [String],
    max_results: u32,
}

#[async_trait]
impl SearchEngine for Tavily {
    fn name(&self) -> &str {
        "tavily"
    }

    #[instrument(skip_all, fields(provider = "tavily", query = %request.query))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let url = endpoint(&self.base_url, "search");
        let wire = WireRequest {
            query: &request.query,
            search_depth: request.depth,
            include_answer: request.include_answer,
            include_domains: &request.include_domains,
            max_results: request.max_results,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&wire)
            .send()
            .await
            .map_err(|e| PromptKitError::provider("tavily", format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(status_error("tavily", response).await);
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            PromptKitError::provider("tavily", format!("invalid search response: {e}"))
        })?;

        debug!(hits = parsed.results.len(), "search complete");
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn empty_domains_are_omitted() {
        let wire = WireRequest {
            query: "q",
            search_depth: SearchDepth::Advanced,
            include_answer: true,
            include_domains: &[],
            max_results: 50,
        };
        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains(r#""search_depth":"advanced""#));
        assert!(!json.contains("include_domains"));
    }

    #[tokio::test]
    async fn search_against_mock_server() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer tvly-test"))
            .and(body_partial_json(serde_json::json!({
                "query": "instagram coffee shop business in Miami, FL",
                "include_domains": ["instagram.com"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "answer": "Several cafes.",
                "results": [{
                    "title": "Brew Bar • Instagram",
                    "url": "https://www.instagram.com/brewbar/",
                    "content": "Specialty coffee",
                    "score": 0.91
                }]
            })))
            .mount(&server)
            .await;

        let tavily = Tavily::new(server.uri(), "tvly-test", Duration::from_secs(5)).unwrap();
        let request = SearchRequest {
            query: "instagram coffee shop business in Miami, FL".into(),
            depth: SearchDepth::Advanced,
            include_answer: true,
            include_domains: vec!["instagram.com".into()],
            max_results: 50,
        };
        let response = tavily.search(&request).await.unwrap();

        assert_eq!(response.answer.as_deref(), Some("Several cafes."));
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].score, 0.91);
    }

    #[tokio::test]
    async fn ping_reports_bad_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let tavily = Tavily::new(server.uri(), "nope", Duration::from_secs(5)).unwrap();
        let err = tavily.ping().await.unwrap_err();
        assert!(err.to_string().starts_with("tavily error"));
    }
}
