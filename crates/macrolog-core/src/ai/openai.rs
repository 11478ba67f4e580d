//! OpenAI backend implementation
//!
//! Talks to the `/v1/chat/completions` API. The wire types and the request
//! helper are shared with the Groq backend, which serves the same API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, ProviderFailure, Result};
use crate::models::{ProviderConfig, ProviderKind};

use super::types::{
    estimate_tokens_by_chars, Generation, GenerationRequest, ResponseFormat,
};
use super::AIBackend;

/// OpenAI backend
#[derive(Clone)]
pub struct OpenAIBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: u32,
}

impl OpenAIBackend {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";

    /// Create a backend against the public API
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

    /// Create from a provider config, with a request timeout
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

    /// Point at a different server (mock servers, proxies)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl AIBackend for OpenAIBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let mut body = ChatCompletionRequest::from_generation(
            &self.model,
            request,
            self.temperature,
            self.max_tokens,
        );
        if request.response_format == ResponseFormat::Json {
            body.response_format = Some(JsonObjectFormat::json_object());
        }

        let url = format!("{}/v1/chat/completions", self.base_url);
        chat_completion(
            &self.http_client,
            ProviderKind::OpenAI,
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
        ProviderKind::OpenAI
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

/// Send a chat completion and normalize the result
///
/// Shared by every backend that speaks the OpenAI chat API. `estimate` fills
/// in token counts when the response carries no `usage` block.
pub(crate) async fn chat_completion<F>(
    client: &Client,
    provider: ProviderKind,
    url: &str,
    api_key: &str,
    body: &ChatCompletionRequest,
    estimate: F,
) -> Result<Generation>
where
    F: Fn(&str) -> u32,
{
    let started = Instant::now();
    let name = provider.as_str();

    let mut req = client.post(url).json(body);
    if !api_key.is_empty() {
        req = req.bearer_auth(api_key);
    }

    let response = req
        .send()
        .await
        .map_err(|e| Error::provider(name, ProviderFailure::Transport, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(Error::provider(
            name,
            ProviderFailure::from_status(status.as_u16(), &text),
            format!("HTTP {}: {}", status, truncate(&text, 300)),
        ));
    }

    let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
        Error::provider(name, ProviderFailure::InvalidResponse, e.to_string())
    })?;

    let choice = parsed.choices.into_iter().next().ok_or_else(|| {
        Error::provider(name, ProviderFailure::InvalidResponse, "No choices in response")
    })?;

    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(Error::provider(
            name,
            ProviderFailure::Safety,
            "Response blocked by content filter",
        ));
    }

    let content = choice.message.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(Error::provider(
            name,
            ProviderFailure::InvalidResponse,
            "Empty message content",
        ));
    }
    debug!(provider = name, "Chat completion response: {}", truncate(&content, 500));

    let (prompt_tokens, completion_tokens, tokens_used) = match parsed.usage {
        Some(usage) => (usage.prompt_tokens, usage.completion_tokens, usage.total_tokens),
        None => {
            let prompt: String = body.messages.iter().map(|m| m.content.as_str()).collect();
            let p = estimate(&prompt);
            let c = estimate(&content);
            (p, c, p + c)
        }
    };

    Ok(Generation {
        content,
        tokens_used,
        prompt_tokens,
        completion_tokens,
        latency_ms: started.elapsed().as_millis() as u64,
        model_used: parsed.model.unwrap_or_else(|| body.model.clone()),
    })
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

// OpenAI chat API wire types

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<JsonObjectFormat>,
}

impl ChatCompletionRequest {
    /// System + user messages with config defaults applied
    pub fn from_generation(
        model: &str,
        request: &GenerationRequest,
        default_temperature: f64,
        default_max_tokens: u32,
    ) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage::new("system", &request.system_prompt),
                ChatMessage::new("user", &request.user_prompt),
            ],
            temperature: request.temperature.unwrap_or(default_temperature),
            max_tokens: request.max_tokens.unwrap_or(default_max_tokens),
            response_format: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonObjectFormat {
    #[serde(rename = "type")]
    pub format_type: &'static str,
}

impl JsonObjectFormat {
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub model: Option<String>,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
