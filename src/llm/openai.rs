use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigSource, parse_or, parse_url_or};
use crate::error::ConfigError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const SNIPPET_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    pub api_key: Option<String>,
    pub org_id: Option<String>,
    pub base_url: String,
    pub default_model: String,
    pub default_temperature: f32,
    pub timeout: Duration,
}

impl Default for OpenAiClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            org_id: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OpenAiClientConfig {
    pub fn from_source(src: &ConfigSource) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.api_key = src.get("OPENAI_API_KEY");
        cfg.org_id = src.get("OPENAI_ORG_ID");
        cfg.base_url = parse_url_or(src, "OPENAI_BASE_URL", DEFAULT_BASE_URL)?;
        if let Some(model) = src.get("OPENAI_MODEL") {
            cfg.default_model = model;
        }
        cfg.default_temperature = parse_or(src, "OPENAI_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        cfg.timeout = Duration::from_secs(parse_or(src, "OPENAI_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?);
        Ok(cfg)
    }
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: HttpClient,
    cfg: OpenAiClientConfig,
}

impl OpenAiClient {
    pub fn new(cfg: OpenAiClientConfig) -> Result<Self, OpenAiError> {
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(OpenAiError::from_reqwest)?;
        Ok(Self { http, cfg })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.cfg.base_url.trim_end_matches('/'))
    }

    fn build_api_request(&self, req: &ChatCompletionRequest) -> ApiChatCompletionRequest {
        ApiChatCompletionRequest {
            model: req.model.clone().unwrap_or_else(|| self.cfg.default_model.clone()),
            temperature: req.temperature.unwrap_or(self.cfg.default_temperature),
            max_tokens: req.max_tokens,
            messages: req
                .messages
                .iter()
                .map(|m| ApiChatMessage {
                    role: m.role.as_api_str().to_string(),
                    content: Some(m.content.clone()),
                })
                .collect(),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Performs the call and returns the upstream reply without interpreting it.
    async fn raw_completion(&self, request: ChatCompletionRequest) -> Result<RawCompletion, OpenAiError>;

    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiError> {
        let raw = self.raw_completion(request).await?;
        interpret(&raw)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn raw_completion(&self, request: ChatCompletionRequest) -> Result<RawCompletion, OpenAiError> {
        if request.messages.is_empty() {
            return Err(OpenAiError::EmptyMessages);
        }
        let api_key = self.cfg.api_key.clone().ok_or(OpenAiError::MissingApiKey)?;
        let api_request = self.build_api_request(&request);

        let mut builder = self.http.post(self.endpoint()).bearer_auth(api_key).json(&api_request);
        if let Some(org) = &self.cfg.org_id {
            builder = builder.header("OpenAI-Organization", org);
        }
        let response = builder.send().await.map_err(OpenAiError::from_reqwest)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        // don't parse just yet; error pages are frequently HTML
        let body = response.text().await.map_err(OpenAiError::from_reqwest)?;

        Ok(RawCompletion { status, content_type, body })
    }
}

/// Turns a raw reply into a completion, checking status and content type
/// before attempting to decode JSON.
pub fn interpret(raw: &RawCompletion) -> Result<ChatCompletionResponse, OpenAiError> {
    if !(200..300).contains(&raw.status) {
        let message = serde_json::from_str::<ApiErrorEnvelope>(&raw.body)
            .map(|env| env.error.message)
            .unwrap_or_else(|_| snippet(&raw.body));
        return Err(OpenAiError::Status { status: raw.status, message });
    }

    // A missing content type is tolerated; a declared non-JSON one is not.
    if let Some(ct) = &raw.content_type {
        if !is_json_content_type(ct) {
            return Err(OpenAiError::NotJson { content_type: ct.clone(), snippet: snippet(&raw.body) });
        }
    }

    let parsed: ApiChatCompletionResponse = serde_json::from_str(&raw.body)?;
    let content = parsed
        .choices
        .iter()
        .find_map(|choice| choice.message.content.clone())
        .filter(|c| !c.trim().is_empty())
        .ok_or(OpenAiError::MissingContent)?;

    Ok(ChatCompletionResponse {
        content,
        usage: parsed.usage.map(|usage| UsageMetrics {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }),
    })
}

fn is_json_content_type(ct: &str) -> bool {
    let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= SNIPPET_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(SNIPPET_CHARS).collect();
    out.push('…');
    out
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ChatCompletionRequest {
    /// Single user-turn request using the client defaults.
    pub fn user(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            messages: vec![ChatMessage::new(ChatRole::User, prompt)],
            max_tokens: None,
            temperature: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChatRole {
    System,
    User,
}

impl ChatRole {
    fn as_api_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
        }
    }
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Upstream reply as received: status, declared content type and body text.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RawCompletion {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawCompletion {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self { status, content_type: Some("application/json".to_string()), body: body.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletionResponse {
    pub content: String,
    pub usage: Option<UsageMetrics>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UsageMetrics {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("chat completion requires at least one message")]
    EmptyMessages,
    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("api error {status}: {message}")]
    Status { status: u16, message: String },
    #[error("expected a JSON body but got {content_type:?}: {snippet}")]
    NotJson { content_type: String, snippet: String },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response contained no message content")]
    MissingContent,
    #[error("mock client response queue is empty")]
    MockQueueEmpty,
}

impl OpenAiError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() { OpenAiError::Timeout } else { OpenAiError::Http(err) }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

/// Scripted client for tests and local dry runs.
#[derive(Debug, Default)]
pub struct MockClient {
    responses: Mutex<VecDeque<Result<RawCompletion, OpenAiError>>>,
    calls: Mutex<Vec<ChatCompletionRequest>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, resp: Result<RawCompletion, OpenAiError>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(resp);
        }
    }

    /// Queues a well-formed completion carrying `content`.
    pub fn push_content(&self, content: &str) {
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        });
        self.push_response(Ok(RawCompletion::json(200, body.to_string())));
    }

    pub fn calls(&self) -> Vec<ChatCompletionRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockClient {
    async fn raw_completion(&self, request: ChatCompletionRequest) -> Result<RawCompletion, OpenAiError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request);
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or(Err(OpenAiError::MockQueueEmpty))
    }
}

#[derive(Debug, Clone, Serialize)]
struct ApiChatCompletionRequest {
    model: String,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: Vec<ApiChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatCompletionResponse {
    choices: Vec<ApiChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatChoice {
    message: ApiChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}
