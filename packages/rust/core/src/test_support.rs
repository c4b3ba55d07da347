//! Scripted in-memory clients for pipeline tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use promptkit_providers::{
    ChatModel, ChatRequest, ChatResponse, SearchEngine, SearchRequest, SearchResponse,
};
use promptkit_shared::{PromptKitError, Result};

type Responder = Box<dyn Fn(&ChatRequest) -> Result<String> + Send + Sync>;

/// A chat model that answers from a queue or a function and records every
/// request it saw.
pub struct ScriptedChat {
    queue: Mutex<VecDeque<Result<String>>>,
    responder: Option<Responder>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    /// Answer calls in order; running out is a provider error.
    pub fn new(answers: Vec<Result<String>>) -> Self {
        Self {
            queue: Mutex::new(answers.into()),
            responder: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with `answer`.
    pub fn always(answer: &str) -> Self {
        let answer = answer.to_string();
        Self::from_fn(move |_| Ok(answer.clone()))
    }

    pub fn from_fn(f: impl Fn(&ChatRequest) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            responder: Some(Box::new(f)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn user_messages(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.last_user_message().map(str::to_owned))
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let text = match &self.responder {
            Some(f) => f(&request),
            None => self
                .queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PromptKitError::provider("scripted", "no scripted answer left"))),
        }?;

        Ok(ChatResponse {
            text,
            model: request.model,
            tokens_in: 0,
            tokens_out: 0,
            latency_ms: 0,
        })
    }
}

/// A search engine returning queued responses.
pub struct ScriptedSearch {
    queue: Mutex<VecDeque<Result<SearchResponse>>>,
    pub queries: Mutex<Vec<SearchRequest>>,
}

impl ScriptedSearch {
    pub fn new(responses: Vec<Result<SearchResponse>>) -> Self {
        Self {
            queue: Mutex::new(responses.into()),
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SearchEngine for ScriptedSearch {
    fn name(&self) -> &str {
        "scripted-search"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.queries.lock().unwrap().push(request.clone());
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SearchResponse::default()))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
