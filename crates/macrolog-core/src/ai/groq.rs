//! Groq backend implementation
//!
//! Groq serves the OpenAI chat API under `/openai`. Only some models accept
//! `response_format: json_object`; the rest get an extra system message
//! asking for JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::{ProviderConfig, ProviderKind};

use super::openai::{chat_completion, ChatCompletionRequest, ChatMessage, JsonObjectFormat};
use super::types::{
    estimate_tokens_by_chars, Generation, GenerationRequest, ResponseFormat,
    JSON_ONLY_INSTRUCTION,
};
use super::AIBackend;

/// Models that accept the native JSON response format
const JSON_MODE_MODELS: &[&str] = &[
    "mixtral-8x7b-32768",
    "llama-3.1-70b-versatile",
    "llama-3.1-8b-instant",
];

/// Groq backend
#[derive(Clone)]
pub struct GroqBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: u32,
}

impl GroqBackend {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.groq.com/openai";

    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            temperature: 0.3,
            max_tokens: 1000,
        }
    }

    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL);
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Whether the configured model supports native JSON mode
    pub fn supports_json_mode(&self) -> bool {
        JSON_MODE_MODELS.contains(&self.model.as_str())
    }

    fn build_request(&self, request: &GenerationRequest) -> ChatCompletionRequest {
        let mut body = ChatCompletionRequest::from_generation(
            &self.model,
            request,
            self.temperature,
            self.max_tokens,
        );
        if request.response_format == ResponseFormat::Json {
            if self.supports_json_mode() {
                body.response_format = Some(JsonObjectFormat::json_object());
            } else {
                body.messages
                    .push(ChatMessage::new("system", JSON_ONLY_INSTRUCTION));
            }
        }
        body
    }
}

#[async_trait]
impl AIBackend for GroqBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let body = self.build_request(request);
        let url = format!("{}/v1/chat/completions", self.base_url);
        chat_completion(
            &self.http_client,
            ProviderKind::Groq,
            &url,
            &self.api_key,
            &body,
            |text| self.estimate_tokens(text),
        )
        .await
    }

    fn estimate_tokens(&self, text: &str) -> u32 {
        estimate_tokens_by_chars(text, 4.0)
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Groq
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
