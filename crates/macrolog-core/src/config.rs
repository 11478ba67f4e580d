//! Service configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the override in the data dir
//!    (~/.local/share/macrolog/config/macrolog.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Every key is optional; anything missing keeps its built-in default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/macrolog.toml");

/// Food index and fuzzy matching settings
#[derive(Debug, Clone)]
pub struct FoodIndexConfig {
    /// How long an index snapshot is served before a reload
    pub ttl: Duration,
    /// Minimum similarity (0-100) for a fuzzy match
    pub fuzzy_threshold: f64,
    /// Minimum similarity (0-100) for a suggestion
    pub suggestion_threshold: f64,
    /// How many top candidates are scored for suggestions
    pub max_candidates: usize,
    pub max_suggestions: usize,
}

impl Default for FoodIndexConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            fuzzy_threshold: 80.0,
            suggestion_threshold: 70.0,
            max_candidates: 5,
            max_suggestions: 3,
        }
    }
}

/// Provider routing settings
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    /// How long provider configs are cached
    pub config_ttl: Duration,
    /// HTTP timeout applied to every adapter request
    pub request_timeout: Duration,
    /// Skip providers whose remaining quota is below the estimated prompt size
    pub strict_quota_precheck: bool,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            config_ttl: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
            strict_quota_precheck: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UsageConfig {
    /// Bounded queue size for quota and usage events
    pub queue_capacity: usize,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Cache hits below this confidence go to the LLM instead
    pub min_cache_confidence: f64,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_cache_confidence: 0.8,
            temperature: 0.2,
            max_tokens: 1000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub food_index: FoodIndexConfig,
    pub providers: ProvidersConfig,
    pub usage: UsageConfig,
    pub classifier: ClassifierConfig,
    /// File the config was read from (None for embedded defaults)
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load from the default override location, else embedded defaults
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Self::embedded(),
        }
    }

    /// Load from an explicit path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let mut config = parse_config(&content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Embedded defaults only
    pub fn embedded() -> Result<Self> {
        parse_config(DEFAULT_CONFIG)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("macrolog").join("config").join("macrolog.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    food_index: Option<RawFoodIndex>,
    providers: Option<RawProviders>,
    usage: Option<RawUsage>,
    classifier: Option<RawClassifier>,
}

#[derive(Debug, Deserialize)]
struct RawFoodIndex {
    ttl_secs: Option<u64>,
    fuzzy_threshold: Option<f64>,
    suggestion_threshold: Option<f64>,
    max_candidates: Option<usize>,
    max_suggestions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawProviders {
    config_ttl_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    strict_quota_precheck: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawUsage {
    queue_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawClassifier {
    min_cache_confidence: Option<f64>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<Config> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = Config::default();

    if let Some(index) = raw.food_index {
        let c = &mut config.food_index;
        if let Some(ttl) = index.ttl_secs {
            c.ttl = Duration::from_secs(ttl);
        }
        if let Some(threshold) = index.fuzzy_threshold {
            c.fuzzy_threshold = threshold;
        }
        if let Some(threshold) = index.suggestion_threshold {
            c.suggestion_threshold = threshold;
        }
        if let Some(n) = index.max_candidates {
            c.max_candidates = n;
        }
        if let Some(n) = index.max_suggestions {
            c.max_suggestions = n;
        }
    }

    if let Some(providers) = raw.providers {
        let c = &mut config.providers;
        if let Some(ttl) = providers.config_ttl_secs {
            c.config_ttl = Duration::from_secs(ttl);
        }
        if let Some(timeout) = providers.request_timeout_secs {
            c.request_timeout = Duration::from_secs(timeout);
        }
        if let Some(strict) = providers.strict_quota_precheck {
            c.strict_quota_precheck = strict;
        }
    }

    if let Some(usage) = raw.usage {
        if let Some(capacity) = usage.queue_capacity {
            config.usage.queue_capacity = capacity;
        }
    }

    if let Some(classifier) = raw.classifier {
        let c = &mut config.classifier;
        if let Some(min) = classifier.min_cache_confidence {
            c.min_cache_confidence = min;
        }
        if let Some(temperature) = classifier.temperature {
            c.temperature = temperature;
        }
        if let Some(max_tokens) = classifier.max_tokens {
            c.max_tokens = max_tokens;
        }
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let idx = &config.food_index;
    if !(0.0..=100.0).contains(&idx.fuzzy_threshold)
        || !(0.0..=100.0).contains(&idx.suggestion_threshold)
    {
        return Err(Error::Config(
            "food_index thresholds must be between 0 and 100".into(),
        ));
    }
    if config.usage.queue_capacity == 0 {
        return Err(Error::Config("usage.queue_capacity must be at least 1".into()));
    }
    if !(0.0..=1.0).contains(&config.classifier.min_cache_confidence) {
        return Err(Error::Config(
            "classifier.min_cache_confidence must be between 0 and 1".into(),
        ));
    }
    Ok(())
}
