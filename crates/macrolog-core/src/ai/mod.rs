//! Pluggable LLM backend abstraction
//!
//! # Architecture
//!
//! - `AIBackend` trait: one text-generation call plus a token estimate
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAIBackend`, `GeminiBackend`, `GroqBackend`, `MockBackend`
//! - `BackendFactory`: builds an `AIClient` from a stored provider config
//!
//! Every backend normalizes vendor failures into `Error::Provider` with a
//! `ProviderFailure` kind, so the router never sees vendor-specific errors.

mod gemini;
mod groq;
mod mock;
mod openai;
pub mod parsing;
pub mod types;

pub use gemini::GeminiBackend;
pub use groq::GroqBackend;
pub use mock::{MockBackend, MockBackendFactory};
pub use openai::OpenAIBackend;
pub use types::*;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{ProviderConfig, ProviderKind};

/// Trait defining the interface for all LLM backends
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Run one generation request
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation>;

    /// Rough token count for `text` (used when the vendor reports no usage)
    fn estimate_tokens(&self, text: &str) -> u32;

    /// Vendor this backend talks to
    fn provider(&self) -> ProviderKind;

    /// Get the model name (for usage logs)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
#[derive(Clone)]
pub enum AIClient {
    OpenAI(OpenAIBackend),
    Gemini(GeminiBackend),
    Groq(GroqBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Build the backend for a stored provider config
    ///
    /// Mock configs are rejected; mocks only come from `MockBackendFactory`.
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Result<Self> {
        match config.provider {
            ProviderKind::OpenAI => Ok(AIClient::OpenAI(OpenAIBackend::from_config(
                config, timeout,
            )?)),
            ProviderKind::Gemini => Ok(AIClient::Gemini(GeminiBackend::from_config(
                config, timeout,
            )?)),
            ProviderKind::Groq => Ok(AIClient::Groq(GroqBackend::from_config(config, timeout)?)),
            ProviderKind::Mock => Err(Error::Config(format!(
                "Provider config {} is a mock; mock backends are not built from stored configs",
                config.id
            ))),
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        match self {
            AIClient::OpenAI(b) => b.generate(request).await,
            AIClient::Gemini(b) => b.generate(request).await,
            AIClient::Groq(b) => b.generate(request).await,
            AIClient::Mock(b) => b.generate(request).await,
        }
    }

    fn estimate_tokens(&self, text: &str) -> u32 {
        match self {
            AIClient::OpenAI(b) => b.estimate_tokens(text),
            AIClient::Gemini(b) => b.estimate_tokens(text),
            AIClient::Groq(b) => b.estimate_tokens(text),
            AIClient::Mock(b) => b.estimate_tokens(text),
        }
    }

    fn provider(&self) -> ProviderKind {
        match self {
            AIClient::OpenAI(b) => b.provider(),
            AIClient::Gemini(b) => b.provider(),
            AIClient::Groq(b) => b.provider(),
            AIClient::Mock(b) => b.provider(),
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAI(b) => b.model(),
            AIClient::Gemini(b) => b.model(),
            AIClient::Groq(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAI(b) => b.host(),
            AIClient::Gemini(b) => b.host(),
            AIClient::Groq(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

/// Builds backends for provider configs
///
/// The router caches whatever this returns, keyed by config id.
pub trait BackendFactory: Send + Sync {
    fn create(&self, config: &ProviderConfig) -> Result<AIClient>;
}

/// Factory for the real HTTP backends
#[derive(Debug, Clone)]
pub struct HttpBackendFactory {
    timeout: Duration,
}

impl HttpBackendFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpBackendFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl BackendFactory for HttpBackendFactory {
    fn create(&self, config: &ProviderConfig) -> Result<AIClient> {
        if config.api_key.is_empty() {
            return Err(Error::Config(format!(
                "Provider config {} ({}) has no API key",
                config.id, config.provider
            )));
        }
        AIClient::from_config(config, self.timeout)
    }
}
