//! Classify and match command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use macrolog_core::cache::SystemClock;
use macrolog_core::classifier::ClassifyContext;
use macrolog_core::config::Config;
use macrolog_core::db::Database;
use macrolog_core::food::{compute_portion, FoodIndex};
use macrolog_core::models::{Classification, EntryCategory, ProviderKind, ResolvedItem};
use macrolog_core::services::Services;

use super::fmt_opt;

/// Flags for `macrolog classify`
#[derive(Debug, Clone, Default)]
pub struct ClassifyOptions {
    pub provider: Option<String>,
    pub user: Option<String>,
    /// Skip the cache fast path
    pub llm: bool,
    /// "YYYY-MM-DD HH:MM"
    pub at: Option<String>,
    pub json: bool,
}

pub fn parse_local_time(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M")
        .with_context(|| format!("Invalid time '{}', expected YYYY-MM-DD HH:MM", value))
}

/// Run one classification through fresh services and drain usage bookkeeping
pub async fn classify_text(
    db: &Database,
    config: &Config,
    text: &str,
    options: &ClassifyOptions,
) -> Result<Classification> {
    let preferred_provider = options
        .provider
        .as_deref()
        .map(str::parse::<ProviderKind>)
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let local_time = options
        .at
        .as_deref()
        .map(parse_local_time)
        .transpose()?;

    let services = Services::from_database(config, db.clone());
    let context = ClassifyContext {
        user_id: options.user.clone(),
        local_time,
        preferred_provider,
        extract_all: options.llm,
    };

    let classification = services.classify(text, &context).await;
    services.shutdown().await;
    Ok(classification)
}

pub async fn cmd_classify(
    db: &Database,
    config: &Config,
    text: &str,
    options: &ClassifyOptions,
) -> Result<()> {
    let classification = classify_text(db, config, text, options).await?;

    if options.json {
        let json = serde_json::to_string_pretty(&classification)
            .context("Failed to serialize classification")?;
        println!("{}", json);
        return Ok(());
    }

    print_classification(&classification);
    Ok(())
}

fn category_icon(category: EntryCategory) -> &'static str {
    match category {
        EntryCategory::Meal => "🍽️ ",
        EntryCategory::Workout => "🏃",
        EntryCategory::Supplement => "💊",
        EntryCategory::Task => "📝",
        EntryCategory::Reminder => "⏰",
        EntryCategory::Other => "•",
    }
}

fn print_item(item: &ResolvedItem) {
    let meal = item
        .meal_type
        .map(|m| format!(" ({})", m.as_str()))
        .unwrap_or_default();
    println!("   {} {}{}", category_icon(item.category), item.summary, meal);

    if item.has_nutrition() {
        println!(
            "      {} kcal | P {}g | C {}g | F {}g | fiber {}g | sugar {}g | sodium {}mg",
            fmt_opt(item.calories),
            fmt_opt(item.protein_g),
            fmt_opt(item.carbs_g),
            fmt_opt(item.fat_g),
            fmt_opt(item.fiber_g),
            fmt_opt(item.sugar_g),
            fmt_opt(item.sodium_mg),
        );
    }

    let source = item.source.as_deref().unwrap_or("-");
    if item.cache_hit {
        println!(
            "      source: {} (cache, {} match, {:.0}% confidence)",
            source,
            item.match_type.as_str(),
            item.confidence * 100.0
        );
    } else {
        println!("      source: {}", source);
    }
}

fn print_classification(classification: &Classification) {
    println!();
    if classification.degraded {
        println!("⚠️  Could not classify with any provider; saved as a generic entry");
    } else if let Some(provider) = &classification.provider {
        let fallback = if classification.fallback_used {
            " (fallback)"
        } else {
            ""
        };
        println!("🤖 Classified by {}{}", provider, fallback);
    } else if !classification.items.is_empty() {
        println!("⚡ Matched from food cache");
    }

    for item in &classification.items {
        print_item(item);
    }

    if classification.needs_clarification {
        println!();
        for question in &classification.clarification_questions {
            println!("   ❓ {}", question);
        }
    }
}

/// Resolve a phrase against the food cache only
pub async fn cmd_match(db: &Database, config: &Config, phrase: &str, json: bool) -> Result<()> {
    let index = FoodIndex::new(
        Arc::new(db.clone()),
        Arc::new(SystemClock),
        config.food_index.clone(),
    );
    let (input, result) = index.match_text(phrase).await;
    let portion = result
        .record
        .as_ref()
        .map(|record| compute_portion(record, input.quantity, input.unit.as_ref()));

    if json {
        let output = serde_json::json!({
            "input": input,
            "match": result,
            "portion": portion,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize match")?
        );
        return Ok(());
    }

    println!();
    match (&result.record, &portion) {
        (Some(record), Some(portion)) => {
            println!(
                "✅ {} ({}, {} match, {:.0}% confidence)",
                record.display_name,
                record.canonical_name,
                result.match_type.as_str(),
                result.confidence * 100.0
            );
            println!(
                "   {} {}: {:.1} kcal | P {:.1}g | C {:.1}g | F {:.1}g",
                portion.quantity,
                portion.unit,
                portion.macros.calories,
                portion.macros.protein_g,
                portion.macros.carbs_g,
                portion.macros.fat_g
            );
            if portion.approximate {
                println!(
                    "   ⚠️  '{}' has no conversion to '{}'; quantity used as-is",
                    portion.unit, record.unit
                );
            }
        }
        _ => println!("❌ No match for '{}'", result.query),
    }

    if !result.suggestions.is_empty() {
        println!("   Did you mean:");
        for suggestion in &result.suggestions {
            println!(
                "     • {} ({:.0}%)",
                suggestion.display_name,
                suggestion.confidence * 100.0
            );
        }
    }

    Ok(())
}
