//! Food record command implementations

use anyhow::{Context, Result};
use macrolog_core::db::Database;
use macrolog_core::models::{FoodChangeAction, FoodRecord};

use super::truncate;

fn print_foods(foods: &[FoodRecord]) {
    println!(
        "   {:<28} {:<30} {:>8} {:>8} {:>6} {:>6}",
        "NAME", "DISPLAY", "UNIT", "KCAL", "USES", "CONF"
    );
    for food in foods {
        let marker = if food.verified { "✓" } else { " " };
        println!(
            "{}  {:<28} {:<30} {:>8} {:>8.1} {:>6} {:>6.2}",
            marker,
            truncate(&food.canonical_name, 28),
            truncate(&food.display_name, 30),
            food.unit.as_str(),
            food.macros.calories,
            food.access_count,
            food.confidence
        );
    }
}

pub fn cmd_foods_list(db: &Database, limit: usize) -> Result<()> {
    let foods = db.list_foods(limit).context("Failed to list foods")?;

    if foods.is_empty() {
        println!("No foods found. Run 'macrolog init' to seed common foods.");
        return Ok(());
    }

    println!();
    println!("🥗 Foods (most used first)");
    println!("   ─────────────────────────────────────────────────────────────");
    print_foods(&foods);
    Ok(())
}

pub fn cmd_foods_review(db: &Database, limit: usize) -> Result<()> {
    let foods = db.review_queue(limit).context("Failed to load review queue")?;

    if foods.is_empty() {
        println!("✅ Review queue is empty");
        return Ok(());
    }

    println!();
    println!("🔎 Foods needing review ({})", foods.len());
    println!("   ─────────────────────────────────────────────────────────────");
    print_foods(&foods);
    println!();
    println!("Verify with: macrolog foods verify <name>");
    Ok(())
}

pub fn cmd_foods_verify(db: &Database, name: &str, changed_by: &str) -> Result<()> {
    db.verify_food(name, changed_by)
        .with_context(|| format!("Failed to verify food '{}'", name))?;
    println!("✅ Verified '{}'", name);
    Ok(())
}

pub fn cmd_foods_delete(
    db: &Database,
    name: &str,
    changed_by: &str,
    reason: Option<&str>,
) -> Result<()> {
    db.soft_delete_food(name, changed_by, reason)
        .with_context(|| format!("Failed to delete food '{}'", name))?;
    println!("🗑️  Deleted '{}'", name);
    Ok(())
}

pub fn cmd_foods_history(db: &Database, name: &str, limit: usize) -> Result<()> {
    let entries = db
        .food_history(name, limit)
        .with_context(|| format!("Failed to load history for '{}'", name))?;

    if entries.is_empty() {
        println!("No recorded changes for '{}'", name);
        return Ok(());
    }

    println!();
    println!("📜 History of '{}' (newest first)", name);
    println!("   ─────────────────────────────────────────────────────────────");
    for entry in &entries {
        let icon = match entry.action {
            FoodChangeAction::Created => "🆕",
            FoodChangeAction::Updated => "✏️ ",
            FoodChangeAction::Verified => "✅",
            FoodChangeAction::Deleted => "🗑️ ",
        };
        println!(
            "{} {} {:<9} by {}",
            icon,
            entry.changed_at.format("%Y-%m-%d %H:%M"),
            entry.action.as_str(),
            entry.changed_by
        );
        if let (Some(old), Some(new)) = (&entry.old_value, &entry.new_value) {
            if old.macros.calories != new.macros.calories {
                println!(
                    "      calories {:.1} → {:.1}",
                    old.macros.calories, new.macros.calories
                );
            }
            if old.verified != new.verified {
                println!("      verified {} → {}", old.verified, new.verified);
            }
        }
        if let Some(reason) = &entry.reason {
            println!("      reason: {}", reason);
        }
    }
    Ok(())
}
