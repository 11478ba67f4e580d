//! Input normalization
//!
//! Splits free text such as "2 boiled eggs for breakfast" into a leading
//! quantity/unit, the food phrase, a preparation keyword and an optional meal
//! hint.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::models::MealType;
use crate::units::Unit;

/// Preparation keywords in priority order (first match wins)
pub const PREPARATION_KEYWORDS: &[&str] = &[
    "boiled",
    "fried",
    "grilled",
    "baked",
    "raw",
    "scrambled",
    "poached",
    "steamed",
];

/// Parsed form of a user entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedInput {
    pub quantity: Option<f64>,
    pub unit: Option<Unit>,
    /// Food phrase used for lookup (keeps the preparation word)
    pub food: String,
    pub preparation: Option<String>,
    pub meal_hint: Option<MealType>,
}

fn quantity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d+(?:\.\d+)?)\s*(?:(pieces?|grams?|g|kg|cups?|oz|lbs?|servings?|slices?)\b)?\s*",
        )
        .expect("valid regex")
    })
}

fn meal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:(?:for|at|with|during|as)\s+(?:my\s+|a\s+)?(breakfast|brunch|lunch|dinner|supper|snack)|(?:in\s+the|this)\s+(morning|afternoon|evening)|(tonight))\b",
        )
        .expect("valid regex")
    })
}

fn meal_from_word(word: &str) -> Option<MealType> {
    match word {
        "breakfast" | "brunch" | "morning" => Some(MealType::Breakfast),
        "lunch" => Some(MealType::Lunch),
        "snack" | "afternoon" => Some(MealType::Snack),
        "dinner" | "supper" | "evening" | "tonight" => Some(MealType::Dinner),
        _ => None,
    }
}

/// Normalize raw user text
pub fn normalize(text: &str) -> NormalizedInput {
    let lowered = text.trim().to_lowercase();
    let mut rest = lowered
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | ',' | ';'))
        .to_string();

    // Meal context
    let mut meal_hint = None;
    if let Some(caps) = meal_re().captures(&rest) {
        meal_hint = caps
            .iter()
            .skip(1)
            .flatten()
            .find_map(|m| meal_from_word(m.as_str()));
        if let Some(whole) = caps.get(0) {
            let (start, end) = (whole.start(), whole.end());
            rest = format!("{} {}", &rest[..start], &rest[end..]);
        }
    }
    let rest = collapse_whitespace(&rest);

    // Leading quantity and unit
    let (quantity, unit, food) = match quantity_re().captures(&rest) {
        Some(caps) => {
            let quantity = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
            let unit = caps.get(2).map(|m| Unit::parse(m.as_str()));
            let consumed = caps.get(0).map(|m| m.end()).unwrap_or(0);
            let food = rest[consumed..].trim();
            // "3 slices of bread"
            let food = food.strip_prefix("of ").unwrap_or(food);
            (quantity, unit, food.trim().to_string())
        }
        None => (None, None, rest),
    };

    let preparation = PREPARATION_KEYWORDS
        .iter()
        .find(|kw| food.split_whitespace().any(|word| word == **kw))
        .map(|kw| kw.to_string());

    NormalizedInput {
        quantity,
        unit,
        food,
        preparation,
        meal_hint,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_without_unit() {
        let n = normalize("2 eggs");
        assert_eq!(n.quantity, Some(2.0));
        assert_eq!(n.unit, None);
        assert_eq!(n.food, "eggs");
        assert_eq!(n.preparation, None);
    }

    #[test]
    fn test_quantity_with_unit() {
        let n = normalize("100g Chicken Breast");
        assert_eq!(n.quantity, Some(100.0));
        assert_eq!(n.unit, Some(Unit::Gram));
        assert_eq!(n.food, "chicken breast");

        let n = normalize("1.5 cups rice");
        assert_eq!(n.quantity, Some(1.5));
        assert_eq!(n.unit, Some(Unit::Cup));
        assert_eq!(n.food, "rice");

        let n = normalize("3 slices of bread");
        assert_eq!(n.unit, Some(Unit::Slice));
        assert_eq!(n.food, "bread");

        let n = normalize("2 cups of rice for lunch");
        assert_eq!(n.quantity, Some(2.0));
        assert_eq!(n.food, "rice");
        assert_eq!(n.meal_hint, Some(MealType::Lunch));
    }

    #[test]
    fn test_of_kept_inside_food_phrase() {
        let n = normalize("cream of mushroom soup");
        assert_eq!(n.food, "cream of mushroom soup");

        let n = normalize("2 offal pies");
        assert_eq!(n.food, "offal pies");
    }

    #[test]
    fn test_unit_requires_word_boundary() {
        let n = normalize("2 grilled chicken");
        assert_eq!(n.quantity, Some(2.0));
        assert_eq!(n.unit, None);
        assert_eq!(n.food, "grilled chicken");
        assert_eq!(n.preparation, Some("grilled".to_string()));
    }

    #[test]
    fn test_no_quantity() {
        let n = normalize("fried eggs");
        assert_eq!(n.quantity, None);
        assert_eq!(n.food, "fried eggs");
        assert_eq!(n.preparation, Some("fried".to_string()));
    }

    #[test]
    fn test_preparation_whole_words_only() {
        let n = normalize("strawberry");
        assert_eq!(n.preparation, None);

        // list order decides, not position in the text
        let n = normalize("fried then boiled egg");
        assert_eq!(n.preparation, Some("boiled".to_string()));
    }

    #[test]
    fn test_meal_hint_stripped() {
        let n = normalize("2 eggs for breakfast");
        assert_eq!(n.food, "eggs");
        assert_eq!(n.quantity, Some(2.0));
        assert_eq!(n.meal_hint, Some(MealType::Breakfast));

        let n = normalize("banana in the afternoon.");
        assert_eq!(n.food, "banana");
        assert_eq!(n.meal_hint, Some(MealType::Snack));

        let n = normalize("salmon at dinner");
        assert_eq!(n.meal_hint, Some(MealType::Dinner));
    }

    #[test]
    fn test_trims_and_lowercases() {
        let n = normalize("   Greek Yogurt!  ");
        assert_eq!(n.food, "greek yogurt");
        assert_eq!(n.meal_hint, None);
    }
}
