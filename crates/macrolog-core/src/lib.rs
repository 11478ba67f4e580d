//! Macrolog Core Library
//!
//! Shared functionality for the Macrolog nutrition logger:
//! - Input normalization (quantity, unit, preparation, meal hints)
//! - Cache-first food resolution with exact and fuzzy matching
//! - Unit conversion and portion macro computation
//! - Pluggable LLM backends (OpenAI, Gemini, Groq, mock)
//! - Provider router with priority ordering, quota tracking and fallback
//! - Classifier that ties the cache and the LLM path together
//! - Prompt library for customizable prompts
//! - SQLite and in-memory persistence

pub mod ai;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod food;
pub mod models;
pub mod normalize;
pub mod prompts;
pub mod router;
pub mod services;
pub mod store;
pub mod units;
pub mod usage;

/// Test utilities including a mock LLM provider server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, BackendFactory, GeminiBackend, Generation, GenerationRequest,
    GroqBackend, HttpBackendFactory, MockBackend, MockBackendFactory, OpenAIBackend,
    RouteOptions, RoutedGeneration,
};
pub use cache::{Clock, ManualClock, SystemClock};
pub use classifier::{Classifier, ClassifyContext};
pub use config::Config;
pub use db::Database;
pub use error::{Error, ProviderFailure, Result};
pub use food::{seed_foods, FoodIndex, PortionCalculator};
pub use models::{
    Classification, EntryCategory, FoodChangeAction, FoodHistoryEntry, FoodOrigin, FoodRecord,
    MacroNutrients, MatchResult, MatchType, MealType, PortionResult, ProviderConfig, ProviderKind,
    QuotaStatus, ResolvedItem, UsageLogEntry, UsageStats,
};
pub use normalize::{normalize, NormalizedInput};
pub use prompts::{Prompt, PromptId, PromptLibrary, PromptSource};
pub use router::ProviderRouter;
pub use services::{ServiceStores, Services};
pub use store::{FoodStore, MemoryStore, ProviderConfigStore, UsageSink, UserClock};
pub use units::Unit;
pub use usage::{UsageCounters, UsageRecorder};
