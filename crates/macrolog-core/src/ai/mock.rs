//! Mock backend for testing
//!
//! Scripted responses and failures, with a call counter. Clones share state,
//! so a test can keep a handle to a backend it handed to the router.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, ProviderFailure, Result};
use crate::models::{ProviderConfig, ProviderKind};

use super::types::{estimate_tokens_by_chars, Generation, GenerationRequest};
use super::{AIBackend, AIClient, BackendFactory};

/// Canned classification returned when no response is scripted
pub const DEFAULT_MOCK_RESPONSE: &str = r#"{"items": [{"category": "meal", "summary": "mock item", "quantity": 1, "unit": "serving", "calories": 100, "protein_g": 5, "carbs_g": 10, "fat_g": 3, "fiber_g": 1, "sugar_g": 2, "sodium_mg": 50, "meal_type": "snack"}], "needs_clarification": false, "clarification_questions": []}"#;

#[derive(Debug)]
struct MockState {
    response: String,
    failure: Option<ProviderFailure>,
    tokens: u32,
    last_request: Option<GenerationRequest>,
}

/// Mock AI backend for testing
#[derive(Clone)]
pub struct MockBackend {
    provider: ProviderKind,
    model: String,
    state: Arc<Mutex<MockState>>,
    calls: Arc<AtomicUsize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            provider: ProviderKind::Mock,
            model: "mock-model".to_string(),
            state: Arc::new(Mutex::new(MockState {
                response: DEFAULT_MOCK_RESPONSE.to_string(),
                failure: None,
                tokens: 42,
                last_request: None,
            })),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A backend that always succeeds with `content`
    pub fn responding(content: &str) -> Self {
        let backend = Self::new();
        backend.set_response(content);
        backend
    }

    /// A backend that always fails with `kind`
    pub fn failing(kind: ProviderFailure) -> Self {
        let backend = Self::new();
        backend.set_failure(Some(kind));
        backend
    }

    /// Report as a different vendor (routing tests)
    pub fn as_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_tokens(self, tokens: u32) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.tokens = tokens;
        }
        self
    }

    pub fn set_response(&self, content: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.response = content.to_string();
        }
    }

    pub fn set_failure(&self, failure: Option<ProviderFailure>) {
        if let Ok(mut state) = self.state.lock() {
            state.failure = failure;
        }
    }

    /// Number of generate calls so far (including failed ones)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request seen
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.state.lock().ok().and_then(|s| s.last_request.clone())
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (response, failure, tokens) = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| Error::InvalidData("mock state poisoned".to_string()))?;
            state.last_request = Some(request.clone());
            (state.response.clone(), state.failure, state.tokens)
        };

        if let Some(kind) = failure {
            return Err(Error::provider(
                self.provider.as_str(),
                kind,
                format!("mock {} failure", kind),
            ));
        }

        let prompt_tokens = tokens / 2;
        Ok(Generation {
            content: response,
            tokens_used: tokens,
            prompt_tokens,
            completion_tokens: tokens - prompt_tokens,
            latency_ms: 1,
            model_used: self.model.clone(),
        })
    }

    fn estimate_tokens(&self, text: &str) -> u32 {
        estimate_tokens_by_chars(text, 4.0)
    }

    fn provider(&self) -> ProviderKind {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

/// Factory handing out mock backends keyed by provider config id
///
/// Configs without a registered backend get a fresh default mock that
/// reports the config's vendor and model.
#[derive(Clone, Default)]
pub struct MockBackendFactory {
    backends: Arc<Mutex<HashMap<i64, MockBackend>>>,
    created: Arc<AtomicUsize>,
}

impl MockBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the backend to use for a config id
    pub fn insert(&self, config_id: i64, backend: MockBackend) {
        if let Ok(mut backends) = self.backends.lock() {
            backends.insert(config_id, backend);
        }
    }

    /// Backend registered (or created) for a config id
    pub fn backend(&self, config_id: i64) -> Option<MockBackend> {
        self.backends
            .lock()
            .ok()
            .and_then(|b| b.get(&config_id).cloned())
    }

    /// How many times `create` ran
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl BackendFactory for MockBackendFactory {
    fn create(&self, config: &ProviderConfig) -> Result<AIClient> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let mut backends = self
            .backends
            .lock()
            .map_err(|_| Error::InvalidData("mock factory poisoned".to_string()))?;
        let backend = backends
            .entry(config.id)
            .or_insert_with(|| {
                MockBackend::new()
                    .as_provider(config.provider)
                    .with_model(&config.model)
            })
            .clone();
        Ok(AIClient::Mock(backend))
    }
}
