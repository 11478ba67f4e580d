//! JSON parsing helpers for LLM responses
//!
//! Models often wrap the JSON payload in prose or code fences, so the object
//! between the first `{` and the last `}` is what gets parsed.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::{EntryCategory, MatchType, MealType, ResolvedItem};

/// Classification payload as returned by the model
#[derive(Debug, Clone, Default)]
pub struct ParsedClassification {
    pub items: Vec<ResolvedItem>,
    pub needs_clarification: bool,
    pub clarification_questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    items: Vec<RawItem>,
    #[serde(default)]
    needs_clarification: bool,
    #[serde(default)]
    clarification_questions: Vec<String>,
    clarification_question: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    category: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    data: Value,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl RawItem {
    /// Look a field up in `data` first, then at the item's top level
    fn field(&self, name: &str) -> Option<&Value> {
        self.data
            .get(name)
            .or_else(|| self.rest.get(name))
            .filter(|v| !v.is_null())
    }

    fn number(&self, name: &str) -> Option<f64> {
        match self.field(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn text(&self, name: &str) -> Option<String> {
        match self.field(name)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn into_item(self) -> ResolvedItem {
        let summary = if self.summary.trim().is_empty() {
            self.text("food")
                .or_else(|| self.text("name"))
                .unwrap_or_default()
        } else {
            self.summary.trim().to_string()
        };

        ResolvedItem {
            category: EntryCategory::parse(&self.category),
            summary,
            quantity: self.number("quantity"),
            unit: self.text("unit"),
            calories: self.number("calories"),
            protein_g: self.number("protein_g"),
            carbs_g: self.number("carbs_g"),
            fat_g: self.number("fat_g"),
            fiber_g: self.number("fiber_g"),
            sugar_g: self.number("sugar_g"),
            sodium_mg: self.number("sodium_mg"),
            source: None,
            source_id: None,
            cache_hit: false,
            confidence: self.number("confidence").unwrap_or(0.0).clamp(0.0, 1.0),
            match_type: MatchType::None,
            meal_type: self.text("meal_type").and_then(|m| m.parse::<MealType>().ok()),
            details: self.data,
        }
    }
}

/// Extract the outermost JSON object from a model response
pub fn extract_json(response: &str) -> Result<&str> {
    let response = response.trim();
    let start = response.find('{');
    let end = response.rfind('}');

    match (start, end) {
        (Some(s), Some(e)) if s < e => Ok(&response[s..=e]),
        _ => Err(Error::MalformedResponse(format!(
            "No JSON found in LLM response | Raw: {}",
            truncate(response, 200)
        ))),
    }
}

/// Parse a classification response
///
/// Accepts `clarification_questions` or a single `clarification_question`.
pub fn parse_classification(response: &str) -> Result<ParsedClassification> {
    let json_str = extract_json(response)?;
    let raw: RawClassification = serde_json::from_str(json_str).map_err(|e| {
        Error::MalformedResponse(format!(
            "Invalid JSON from LLM: {} | Raw: {}",
            e,
            truncate(json_str, 200)
        ))
    })?;

    let mut questions: Vec<String> = raw
        .clarification_questions
        .into_iter()
        .filter(|q| !q.trim().is_empty())
        .collect();
    if let Some(q) = raw.clarification_question.filter(|q| !q.trim().is_empty()) {
        if !questions.contains(&q) {
            questions.push(q);
        }
    }

    Ok(ParsedClassification {
        items: raw.items.into_iter().map(RawItem::into_item).collect(),
        needs_clarification: raw.needs_clarification || !questions.is_empty(),
        clarification_questions: questions,
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}
