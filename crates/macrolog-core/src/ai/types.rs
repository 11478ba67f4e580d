//! Request and response types shared by all AI backends

use serde::Serialize;

use crate::models::ProviderKind;

/// Output format requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// Instruction appended for backends without a native JSON mode
pub const JSON_ONLY_INSTRUCTION: &str =
    "Respond ONLY with valid JSON. Do not include any text before or after the JSON.";

/// A single generation request
///
/// `temperature` and `max_tokens` fall back to the provider config defaults
/// when unset.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub response_format: ResponseFormat,
}

impl GenerationRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            ..Default::default()
        }
    }

    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Combined prompt text (used for token estimates)
    pub fn prompt_text(&self) -> String {
        format!("{}\n\n{}", self.system_prompt, self.user_prompt)
    }
}

/// A backend's response to a generation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generation {
    pub content: String,
    pub tokens_used: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub latency_ms: u64,
    pub model_used: String,
}

/// A generation annotated with routing metadata
#[derive(Debug, Clone, Serialize)]
pub struct RoutedGeneration {
    pub generation: Generation,
    pub provider: ProviderKind,
    pub config_id: i64,
    /// True when a provider other than the first in order answered
    pub fallback_used: bool,
    pub attempts: usize,
}

/// Per-request routing options
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub preferred_provider: Option<ProviderKind>,
    pub user_id: Option<String>,
    /// Free-form label stored on usage logs
    pub request_type: Option<String>,
}

/// Character-count token heuristic, never below 1
pub fn estimate_tokens_by_chars(text: &str, chars_per_token: f64) -> u32 {
    let estimate = (text.chars().count() as f64 / chars_per_token) as u32;
    estimate.max(1)
}
