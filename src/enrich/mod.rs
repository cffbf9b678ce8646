use std::sync::Arc;

use crate::error::EnrichmentError;
use crate::llm::openai::{ChatCompletionRequest, ChatMessage, ChatRole, LlmClient, RawCompletion};

pub mod prompt;
pub mod trend;

pub use trend::TrendInsight;

/// Summarization and classification on top of a chat-completion client.
#[derive(Clone)]
pub struct Enricher {
    llm: Arc<dyn LlmClient>,
}

impl Enricher {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// `Ok(None)` when there is nothing to summarize; no call is made then.
    pub async fn summarize(&self, title: &str, comments: &[String]) -> Result<Option<String>, EnrichmentError> {
        if comments.is_empty() {
            return Ok(None);
        }
        let request = ChatCompletionRequest {
            model: None,
            messages: vec![
                ChatMessage::new(ChatRole::System, prompt::SUMMARY_SYSTEM),
                ChatMessage::new(ChatRole::User, prompt::summary_prompt(title, comments)),
            ],
            max_tokens: Some(200),
            temperature: None,
        };
        let resp = self.llm.chat_completion(request).await?;
        Ok(Some(resp.content.trim().to_string()))
    }

    pub async fn classify(&self, keyword: &str) -> Result<TrendInsight, EnrichmentError> {
        let resp = self.llm.chat_completion(ChatCompletionRequest::user(prompt::trend_prompt(keyword))).await?;
        trend::parse_trend(&resp.content)
    }

    /// Connectivity check; the reply is returned uninterpreted.
    pub async fn probe(&self) -> Result<RawCompletion, EnrichmentError> {
        Ok(self.llm.raw_completion(ChatCompletionRequest::user(prompt::PROBE_PROMPT)).await?)
    }
}
