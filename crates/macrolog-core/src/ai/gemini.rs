//! Google Gemini backend implementation
//!
//! Uses the `generateContent` REST endpoint. Gemini has no separate system
//! role here, so the system and user prompts are sent as one text part.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, ProviderFailure, Result};
use crate::models::{ProviderConfig, ProviderKind};

use super::openai::truncate;
use super::types::{
    estimate_tokens_by_chars, Generation, GenerationRequest, ResponseFormat,
    JSON_ONLY_INSTRUCTION,
};
use super::AIBackend;

const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HARASSMENT",
];

/// Gemini backend
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: u32,
}

impl GeminiBackend {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

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

    fn full_prompt(request: &GenerationRequest) -> String {
        let mut prompt = format!("{}\n\n{}", request.system_prompt, request.user_prompt);
        if request.response_format == ResponseFormat::Json {
            prompt.push_str("\n\n");
            prompt.push_str(JSON_ONLY_INSTRUCTION);
        }
        prompt
    }

    fn build_request(&self, request: &GenerationRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(Self::full_prompt(request)),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature.unwrap_or(self.temperature),
                max_output_tokens: request.max_tokens.unwrap_or(self.max_tokens),
                candidate_count: 1,
                response_mime_type: (request.response_format == ResponseFormat::Json)
                    .then_some("application/json"),
            },
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_MEDIUM_AND_ABOVE",
                })
                .collect(),
        }
    }
}

#[async_trait]
impl AIBackend for GeminiBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let started = Instant::now();
        let name = ProviderKind::Gemini.as_str();
        let body = self.build_request(request);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
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

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            Error::provider(name, ProviderFailure::InvalidResponse, e.to_string())
        })?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::provider(
                name,
                ProviderFailure::Safety,
                format!("Prompt blocked by safety filters: {}", reason),
            ));
        }

        let candidate = parsed.candidates.into_iter().next().ok_or_else(|| {
            Error::provider(
                name,
                ProviderFailure::Safety,
                "Response blocked by safety filters",
            )
        })?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(Error::provider(
                name,
                ProviderFailure::Safety,
                "Candidate stopped by safety filters",
            ));
        }

        let content: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(Error::provider(
                name,
                ProviderFailure::InvalidResponse,
                "Empty candidate content",
            ));
        }
        debug!(provider = name, "Gemini response: {}", truncate(&content, 500));

        let (prompt_tokens, completion_tokens) = match parsed.usage_metadata {
            Some(usage) => (
                usage.prompt_token_count,
                usage.candidates_token_count.unwrap_or(0),
            ),
            None => {
                let prompt = &body.contents[0].parts[0].text;
                (
                    self.estimate_tokens(prompt.as_deref().unwrap_or_default()),
                    self.estimate_tokens(&content),
                )
            }
        };

        Ok(Generation {
            content,
            tokens_used: prompt_tokens + completion_tokens,
            prompt_tokens,
            completion_tokens,
            latency_ms: started.elapsed().as_millis() as u64,
            model_used: parsed.model_version.unwrap_or_else(|| self.model.clone()),
        })
    }

    fn estimate_tokens(&self, text: &str) -> u32 {
        estimate_tokens_by_chars(text, 3.5)
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

// Gemini REST wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
    candidate_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    candidates_token_count: Option<u32>,
}
