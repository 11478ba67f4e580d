//! Domain models for Macrolog

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::units::Unit;

/// Macro nutrients for one unit (or one computed portion) of a food
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroNutrients {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cholesterol_mg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturated_fat_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans_fat_g: Option<f64>,
}

impl MacroNutrients {
    /// Multiply every field (including optional ones when present)
    pub fn scale(&self, k: f64) -> Self {
        Self {
            calories: self.calories * k,
            protein_g: self.protein_g * k,
            carbs_g: self.carbs_g * k,
            fat_g: self.fat_g * k,
            fiber_g: self.fiber_g * k,
            sugar_g: self.sugar_g * k,
            sodium_mg: self.sodium_mg * k,
            cholesterol_mg: self.cholesterol_mg.map(|v| v * k),
            saturated_fat_g: self.saturated_fat_g.map(|v| v * k),
            trans_fat_g: self.trans_fat_g.map(|v| v * k),
        }
    }
}

/// Where a food record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FoodOrigin {
    #[default]
    Seed,
    /// Generated by an LLM; lands in the review queue
    Ai,
    User,
    Admin,
}

impl FoodOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Ai => "ai",
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl std::str::FromStr for FoodOrigin {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "seed" => Ok(Self::Seed),
            "ai" => Ok(Self::Ai),
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Unknown food origin: {}", s)),
        }
    }
}

impl std::fmt::Display for FoodOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A canonical food record with per-unit macros
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodRecord {
    /// Unique key, e.g. `egg_large_boiled`
    pub canonical_name: String,
    pub display_name: String,
    pub aliases: Vec<String>,
    pub category: String,
    /// Unit the macros are expressed per
    pub unit: Unit,
    pub macros: MacroNutrients,
    pub preparation_style: Option<String>,
    /// Typical portion; informational only, never used as a default quantity
    pub default_portion: Option<f64>,
    pub source: String,
    pub source_id: Option<String>,
    pub origin: FoodOrigin,
    pub verified: bool,
    pub confidence: f64,
    pub access_count: u64,
    pub last_accessed: Option<DateTime<Utc>>,
    pub deleted: bool,
}

impl FoodRecord {
    /// Create a verified seed record with no aliases
    pub fn new(canonical_name: &str, display_name: &str, unit: Unit, macros: MacroNutrients) -> Self {
        Self {
            canonical_name: canonical_name.to_string(),
            display_name: display_name.to_string(),
            aliases: Vec::new(),
            category: "other".to_string(),
            unit,
            macros,
            preparation_style: None,
            default_portion: None,
            source: "manual".to_string(),
            source_id: None,
            origin: FoodOrigin::Seed,
            verified: true,
            confidence: 1.0,
            access_count: 0,
            last_accessed: None,
            deleted: false,
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    /// True when the record belongs in the admin review queue
    pub fn needs_review(&self) -> bool {
        !self.verified
            && !self.deleted
            && (self.origin == FoodOrigin::Ai || self.confidence < 0.8 || self.access_count > 100)
    }
}

/// Kind of change recorded in a food record's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodChangeAction {
    Created,
    Updated,
    Verified,
    Deleted,
}

impl FoodChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Verified => "verified",
            Self::Deleted => "deleted",
        }
    }
}

impl std::str::FromStr for FoodChangeAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "verified" => Ok(Self::Verified),
            "deleted" => Ok(Self::Deleted),
            _ => Err(format!("Unknown food change action: {}", s)),
        }
    }
}

impl std::fmt::Display for FoodChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of a food record's audit trail
///
/// `old_value` and `new_value` are full record snapshots; a creation has no
/// old value and a deletion no new value.
#[derive(Debug, Clone, Serialize)]
pub struct FoodHistoryEntry {
    pub id: i64,
    pub canonical_name: String,
    pub action: FoodChangeAction,
    pub old_value: Option<FoodRecord>,
    pub new_value: Option<FoodRecord>,
    pub changed_by: String,
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Fuzzy,
    #[default]
    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::None => "none",
        }
    }
}

/// An alternate candidate offered alongside a fuzzy match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub canonical_name: String,
    pub display_name: String,
    pub confidence: f64,
}

/// Outcome of resolving a food phrase against the index
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub query: String,
    pub matched: bool,
    pub record: Option<Arc<FoodRecord>>,
    pub confidence: f64,
    pub match_type: MatchType,
    pub suggestions: Vec<Suggestion>,
}

impl MatchResult {
    pub fn none(query: &str) -> Self {
        Self {
            query: query.to_string(),
            matched: false,
            record: None,
            confidence: 0.0,
            match_type: MatchType::None,
            suggestions: Vec::new(),
        }
    }
}

/// Macros computed for a concrete portion of a food record
#[derive(Debug, Clone, Serialize)]
pub struct PortionResult {
    pub canonical_name: String,
    pub display_name: String,
    pub quantity: f64,
    pub unit: Unit,
    pub macros: MacroNutrients,
    pub source: String,
    pub source_id: Option<String>,
    pub cache_hit: bool,
    /// The input unit had no physical conversion into the record's unit
    pub approximate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Gemini,
    Groq,
    /// In-process mock backend
    Mock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Gemini => "gemini",
            Self::Groq => "groq",
            Self::Mock => "mock",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" | "google" => Ok(Self::Gemini),
            "groq" => Ok(Self::Groq),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for one LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: i64,
    pub provider: ProviderKind,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    pub model: String,
    /// 1 is highest
    pub priority: i32,
    pub temperature: f64,
    pub max_tokens: u32,
    pub is_active: bool,
    /// None means unlimited
    pub quota_limit: Option<u64>,
    pub quota_used: u64,
    pub cost_per_1k_tokens: Option<f64>,
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(id: i64, provider: ProviderKind, model: &str, priority: i32) -> Self {
        Self {
            id,
            provider,
            api_key: String::new(),
            model: model.to_string(),
            priority,
            temperature: 0.3,
            max_tokens: 1000,
            is_active: true,
            quota_limit: None,
            quota_used: 0,
            cost_per_1k_tokens: None,
            base_url: None,
        }
    }

    /// Active and under quota
    pub fn is_usable(&self) -> bool {
        self.is_active && self.quota_limit.map_or(true, |limit| self.quota_used < limit)
    }

    pub fn remaining_quota(&self) -> Option<u64> {
        self.quota_limit
            .map(|limit| limit.saturating_sub(self.quota_used))
    }

    pub fn quota_status(&self) -> QuotaStatus {
        let percentage = match self.quota_limit {
            Some(limit) if limit > 0 => self.quota_used as f64 / limit as f64 * 100.0,
            Some(_) => 100.0,
            None => 0.0,
        };
        QuotaStatus {
            config_id: self.id,
            provider: self.provider,
            model: self.model.clone(),
            is_active: self.is_active,
            limit: self.quota_limit,
            used: self.quota_used,
            remaining: self.remaining_quota(),
            percentage,
            exceeded: self.quota_limit.is_some_and(|limit| self.quota_used >= limit),
        }
    }

    /// Cost of a call in USD, if a rate is configured
    pub fn cost_for(&self, tokens: u64) -> Option<f64> {
        self.cost_per_1k_tokens
            .map(|rate| tokens as f64 / 1000.0 * rate)
    }
}

/// Quota usage for one provider config
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub config_id: i64,
    pub provider: ProviderKind,
    pub model: String,
    pub is_active: bool,
    pub limit: Option<u64>,
    pub used: u64,
    pub remaining: Option<u64>,
    pub percentage: f64,
    pub exceeded: bool,
}

/// One provider call, successful or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLogEntry {
    pub config_id: Option<i64>,
    /// Vendor name as stored; rows may name vendors this build does not know
    pub provider: String,
    pub model: String,
    pub user_id: Option<String>,
    pub request_type: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub latency_ms: u64,
    pub cost_usd: Option<f64>,
    pub success: bool,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregated usage for one provider
#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub provider: String,
    pub requests: i64,
    pub successes: i64,
    pub failures: i64,
    pub total_tokens: i64,
    pub total_cost_usd: f64,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Snack,
    Dinner,
    LateNightSnack,
}

impl MealType {
    /// Infer the meal from a local hour (0-23)
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=10 => Self::Breakfast,
            11..=14 => Self::Lunch,
            15..=17 => Self::Snack,
            18..=22 => Self::Dinner,
            _ => Self::LateNightSnack,
        }
    }

    pub fn from_time<T: Timelike>(time: &T) -> Self {
        Self::from_hour(time.hour())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Snack => "snack",
            Self::Dinner => "dinner",
            Self::LateNightSnack => "late_night_snack",
        }
    }
}

impl std::str::FromStr for MealType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(' ', "_").as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "snack" => Ok(Self::Snack),
            "dinner" | "supper" => Ok(Self::Dinner),
            "late_night_snack" | "late_night" => Ok(Self::LateNightSnack),
            _ => Err(format!("Unknown meal type: {}", s)),
        }
    }
}

/// Category of a logged entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryCategory {
    Meal,
    Workout,
    Supplement,
    Task,
    Reminder,
    #[default]
    Other,
}

impl EntryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meal => "meal",
            Self::Workout => "workout",
            Self::Supplement => "supplement",
            Self::Task => "task",
            Self::Reminder => "reminder",
            Self::Other => "other",
        }
    }

    /// Lenient parse; unknown categories become `Other`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "meal" | "food" => Self::Meal,
            "workout" | "exercise" => Self::Workout,
            "supplement" => Self::Supplement,
            "task" => Self::Task,
            "reminder" => Self::Reminder,
            _ => Self::Other,
        }
    }
}

/// One structured item produced by classification
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedItem {
    pub category: EntryCategory,
    pub summary: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub fiber_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub source: Option<String>,
    #[serde(rename = "sourceId")]
    pub source_id: Option<String>,
    #[serde(rename = "cacheHit")]
    pub cache_hit: bool,
    pub confidence: f64,
    #[serde(rename = "matchType")]
    pub match_type: MatchType,
    #[serde(rename = "mealType", skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
    /// Category-specific fields (workout duration, supplement dose, ...)
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl ResolvedItem {
    pub fn has_nutrition(&self) -> bool {
        self.calories.is_some()
    }

    /// Copy computed portion macros onto the item
    pub fn apply_portion(&mut self, portion: &PortionResult) {
        let m = &portion.macros;
        self.quantity = Some(portion.quantity);
        self.unit = Some(portion.unit.to_string());
        self.calories = Some(m.calories);
        self.protein_g = Some(m.protein_g);
        self.carbs_g = Some(m.carbs_g);
        self.fat_g = Some(m.fat_g);
        self.fiber_g = Some(m.fiber_g);
        self.sugar_g = Some(m.sugar_g);
        self.sodium_mg = Some(m.sodium_mg);
        self.source = Some(portion.source.clone());
        self.source_id = portion.source_id.clone();
    }
}

/// Result of classifying one piece of text
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub items: Vec<ResolvedItem>,
    pub needs_clarification: bool,
    pub clarification_questions: Vec<String>,
    /// Provider that answered, when the LLM path was taken
    pub provider: Option<String>,
    pub fallback_used: bool,
    /// LLM classification failed and a generic item was returned
    pub degraded: bool,
}
