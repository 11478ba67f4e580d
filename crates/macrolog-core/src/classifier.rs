//! Classification pipeline
//!
//! Cache first: a confident food index hit is answered locally with scaled
//! macros. Everything else is rendered into the classification prompt and sent
//! through the provider router. Failures on the LLM path degrade to a single
//! generic item; `classify` never returns an error.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::ai::parsing::{parse_classification, ParsedClassification};
use crate::ai::{GenerationRequest, RouteOptions};
use crate::cache::Clock;
use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use crate::food::{FoodIndex, PortionCalculator};
use crate::models::{
    Classification, EntryCategory, MatchResult, MealType, PortionResult, ProviderKind,
    ResolvedItem,
};
use crate::normalize::{normalize, NormalizedInput};
use crate::prompts::{PromptId, PromptLibrary};
use crate::router::ProviderRouter;
use crate::store::UserClock;
use crate::units::Unit;

const REQUEST_TYPE: &str = "classify";

/// Per-call context
#[derive(Debug, Clone, Default)]
pub struct ClassifyContext {
    pub user_id: Option<String>,
    /// Caller-supplied local time; otherwise the user clock, then the process clock
    pub local_time: Option<NaiveDateTime>,
    pub preferred_provider: Option<ProviderKind>,
    /// Skip the cache fast path (multi-item statements)
    pub extract_all: bool,
}

pub struct Classifier {
    index: Arc<FoodIndex>,
    portions: Arc<PortionCalculator>,
    router: Arc<ProviderRouter>,
    prompts: Arc<PromptLibrary>,
    user_clock: Option<Arc<dyn UserClock>>,
    clock: Arc<dyn Clock>,
    settings: ClassifierConfig,
}

impl Classifier {
    pub fn new(
        index: Arc<FoodIndex>,
        portions: Arc<PortionCalculator>,
        router: Arc<ProviderRouter>,
        prompts: Arc<PromptLibrary>,
        clock: Arc<dyn Clock>,
        settings: ClassifierConfig,
    ) -> Self {
        Self {
            index,
            portions,
            router,
            prompts,
            user_clock: None,
            clock,
            settings,
        }
    }

    pub fn with_user_clock(mut self, user_clock: Arc<dyn UserClock>) -> Self {
        self.user_clock = Some(user_clock);
        self
    }

    /// Classify one statement
    pub async fn classify(&self, text: &str, context: &ClassifyContext) -> Classification {
        let text = text.trim();
        if text.is_empty() {
            return Classification {
                needs_clarification: true,
                clarification_questions: vec!["What would you like to log?".to_string()],
                ..Default::default()
            };
        }

        let local_time = self.local_time(context).await;

        if !context.extract_all {
            let (input, result) = self.index.match_text(text).await;
            if result.matched && result.confidence >= self.settings.min_cache_confidence {
                if let Some(classification) =
                    self.from_cache(&input, &result, local_time).await
                {
                    return classification;
                }
            }
            debug!(
                text,
                confidence = result.confidence,
                "Cache miss, classifying with LLM"
            );
        }

        match self.classify_with_llm(text, context, local_time).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!(text, "LLM classification failed, returning generic item: {}", e);
                degraded(text)
            }
        }
    }

    async fn local_time(&self, context: &ClassifyContext) -> NaiveDateTime {
        if let Some(time) = context.local_time {
            return time;
        }
        if let (Some(user_clock), Some(user_id)) = (&self.user_clock, &context.user_id) {
            match user_clock.user_local_time(user_id).await {
                Ok(Some(time)) => return time,
                Ok(None) => {}
                Err(e) => warn!(user_id = %user_id, "Failed to load user local time: {}", e),
            }
        }
        self.clock.now().with_timezone(&Local).naive_local()
    }

    async fn from_cache(
        &self,
        input: &NormalizedInput,
        result: &MatchResult,
        local_time: NaiveDateTime,
    ) -> Option<Classification> {
        let record = result.record.as_ref()?;
        let portion = self.portions.calculate(record, input).await;

        let mut item = ResolvedItem {
            category: EntryCategory::Meal,
            summary: portion_summary(&portion),
            cache_hit: true,
            confidence: result.confidence,
            match_type: result.match_type,
            meal_type: Some(
                input
                    .meal_hint
                    .unwrap_or_else(|| MealType::from_time(&local_time)),
            ),
            details: json!({
                "canonical_name": portion.canonical_name,
                "preparation": input.preparation,
                "approximate": portion.approximate,
                "suggestions": result.suggestions,
            }),
            ..Default::default()
        };
        item.apply_portion(&portion);

        let mut clarification_questions = Vec::new();
        if portion.approximate {
            clarification_questions.push(format!(
                "How much {} did you have? (e.g., 1 cup, 200g)",
                portion.display_name.to_lowercase()
            ));
        }

        info!(
            food = %portion.canonical_name,
            calories = portion.macros.calories,
            match_type = result.match_type.as_str(),
            "Classified from cache"
        );

        Some(Classification {
            items: vec![item],
            needs_clarification: !clarification_questions.is_empty(),
            clarification_questions,
            ..Default::default()
        })
    }

    async fn classify_with_llm(
        &self,
        text: &str,
        context: &ClassifyContext,
        local_time: NaiveDateTime,
    ) -> Result<Classification> {
        let input = normalize(text);
        let request = self.build_request(text, &input, context, local_time)?;
        let options = RouteOptions {
            preferred_provider: context.preferred_provider,
            user_id: context.user_id.clone(),
            request_type: Some(REQUEST_TYPE.to_string()),
        };

        let routed = self.router.generate(&request, &options).await?;
        let parsed = parse_classification(&routed.generation.content)?;
        if parsed.items.is_empty() {
            return Err(Error::MalformedResponse("No items in LLM response".into()));
        }

        let provider = routed.provider.as_str().to_string();
        let ParsedClassification {
            items,
            needs_clarification,
            clarification_questions,
        } = parsed;

        let mut resolved = Vec::with_capacity(items.len());
        for item in items {
            resolved.push(self.resolve_item(item, &input, &provider, local_time).await);
        }

        Ok(Classification {
            items: resolved,
            needs_clarification,
            clarification_questions,
            provider: Some(provider),
            fallback_used: routed.fallback_used,
            degraded: false,
        })
    }

    fn build_request(
        &self,
        text: &str,
        input: &NormalizedInput,
        context: &ClassifyContext,
        local_time: NaiveDateTime,
    ) -> Result<GenerationRequest> {
        let prompt = self.prompts.get(PromptId::ClassifyEntry)?;
        let current_time = local_time.format("%I:%M %p (%A)").to_string();
        let meal_hint = input.meal_hint.map(|m| m.as_str()).unwrap_or_default();

        let mut vars: HashMap<&str, &str> = HashMap::new();
        vars.insert("input", text);
        vars.insert("current_time", &current_time);
        vars.insert("meal_hint", meal_hint);
        if context.extract_all {
            vars.insert("extract_all", "true");
        }

        Ok(GenerationRequest::new(prompt.render_system(&vars), prompt.render_user(&vars))
            .json()
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens))
    }

    /// Fill in meal items the model left without nutrition from the cache
    ///
    /// Items that already carry calories are left as they are.
    async fn resolve_item(
        &self,
        mut item: ResolvedItem,
        input: &NormalizedInput,
        provider: &str,
        local_time: NaiveDateTime,
    ) -> ResolvedItem {
        if item.category != EntryCategory::Meal {
            return item;
        }
        if item.meal_type.is_none() {
            item.meal_type = Some(
                input
                    .meal_hint
                    .unwrap_or_else(|| MealType::from_time(&local_time)),
            );
        }
        if item.has_nutrition() {
            if item.source.is_none() {
                item.source = Some(provider.to_string());
            }
            return item;
        }

        let phrase = item
            .details
            .get("food")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| item.summary.clone());
        let phrase_input = normalize(&phrase);
        let result = self.index.lookup(&phrase_input.food).await;

        let Some(record) = result
            .record
            .as_ref()
            .filter(|_| result.confidence >= self.settings.min_cache_confidence)
        else {
            debug!(phrase = %phrase, "No cached nutrition for LLM item");
            return item;
        };

        let portion_input = NormalizedInput {
            quantity: item.quantity.or(phrase_input.quantity),
            unit: item
                .unit
                .as_deref()
                .map(Unit::parse)
                .or(phrase_input.unit.clone()),
            ..phrase_input
        };
        let portion = self.portions.calculate(record, &portion_input).await;
        item.apply_portion(&portion);
        item.cache_hit = true;
        item.confidence = result.confidence;
        item.match_type = result.match_type;
        item
    }
}

/// The generic item returned when LLM classification fails
fn degraded(text: &str) -> Classification {
    Classification {
        items: vec![ResolvedItem {
            category: EntryCategory::Other,
            summary: text.to_string(),
            ..Default::default()
        }],
        degraded: true,
        ..Default::default()
    }
}

fn portion_summary(portion: &PortionResult) -> String {
    let quantity = format_quantity(portion.quantity);
    if portion.unit.is_count() {
        format!("{} x {}", quantity, portion.display_name)
    } else {
        format!("{} {} {}", quantity, portion.unit, portion.display_name)
    }
}

fn format_quantity(q: f64) -> String {
    if q.fract() == 0.0 {
        format!("{}", q as i64)
    } else {
        format!("{}", (q * 100.0).round() / 100.0)
    }
}
