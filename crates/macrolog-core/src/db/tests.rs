//! Database tests

use super::*;
use crate::food::seed_foods;
use crate::models::*;
use crate::store::{FoodStore, ProviderConfigStore, UsageSink};
use crate::units::Unit;

fn kale_chips() -> FoodRecord {
    let mut record = FoodRecord::new(
        "kale_chips",
        "Kale Chips",
        Unit::Per100g,
        MacroNutrients {
            calories: 480.0,
            protein_g: 10.0,
            carbs_g: 45.0,
            fat_g: 30.0,
            fiber_g: 8.0,
            sugar_g: 5.0,
            sodium_mg: 700.0,
            saturated_fat_g: Some(3.5),
            ..Default::default()
        },
    )
    .with_aliases(&["kale crisps"])
    .with_category("snack");
    record.origin = FoodOrigin::Ai;
    record.verified = false;
    record.confidence = 0.6;
    record
}

fn usage_entry(provider: ProviderKind, config_id: Option<i64>, success: bool) -> UsageLogEntry {
    UsageLogEntry {
        config_id,
        provider: provider.as_str().to_string(),
        model: "gpt-4o-mini".to_string(),
        user_id: Some("u1".to_string()),
        request_type: "classify".to_string(),
        prompt_tokens: if success { 30 } else { 0 },
        completion_tokens: if success { 12 } else { 0 },
        total_tokens: if success { 42 } else { 0 },
        latency_ms: 120,
        cost_usd: if success { Some(0.01) } else { None },
        success,
        error: if success { None } else { Some("timeout".to_string()) },
        created_at: Utc::now(),
    }
}

#[test]
fn test_in_memory_db() {
    let db = Database::in_memory().unwrap();
    assert!(db.all_foods().unwrap().is_empty());
    assert!(db.list_providers().unwrap().is_empty());
    assert!(db.path().contains("macrolog_test_"));
}

#[test]
fn test_schema_exists() {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();

    let result: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('provider_configs') WHERE name IN ('id', 'provider', 'model', 'priority', 'is_active', 'quota_limit', 'quota_used')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(result, 7, "provider_configs should have 7 expected columns");

    let result: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('usage_logs') WHERE name IN ('config_id', 'provider', 'total_tokens', 'latency_ms', 'success', 'error')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(result, 6, "usage_logs should have 6 expected columns");
}

#[test]
fn test_food_roundtrip_preserves_fields() {
    let db = Database::in_memory().unwrap();
    db.upsert_food(&kale_chips(), "admin").unwrap();

    let stored = db.get_food("kale_chips").unwrap().unwrap();
    assert_eq!(stored.display_name, "Kale Chips");
    assert_eq!(stored.aliases, vec!["kale crisps".to_string()]);
    assert_eq!(stored.unit, Unit::Per100g);
    assert_eq!(stored.origin, FoodOrigin::Ai);
    assert!(!stored.verified);
    assert_eq!(stored.macros.saturated_fat_g, Some(3.5));
    assert_eq!(stored.macros.cholesterol_mg, None);

    assert!(db.get_food("missing").unwrap().is_none());
}

#[test]
fn test_seed_is_idempotent() {
    let db = Database::in_memory().unwrap();
    let seeds = seed_foods();

    let inserted = db.seed_foods(&seeds).unwrap();
    assert_eq!(inserted, seeds.len());

    // Second run leaves existing rows alone
    let inserted = db.seed_foods(&seeds).unwrap();
    assert_eq!(inserted, 0);
    assert_eq!(db.all_foods().unwrap().len(), seeds.len());
}

#[test]
fn test_review_queue_and_verify() {
    let db = Database::in_memory().unwrap();
    db.seed_foods(&seed_foods()).unwrap();
    db.upsert_food(&kale_chips(), "admin").unwrap();

    let queue = db.review_queue(10).unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].canonical_name, "kale_chips");

    db.verify_food("kale_chips", "admin").unwrap();
    assert!(db.review_queue(10).unwrap().is_empty());

    let verified = db.get_food("kale_chips").unwrap().unwrap();
    assert!(verified.verified);
    assert_eq!(verified.confidence, 1.0);

    assert!(db.verify_food("missing", "admin").is_err());
}

#[test]
fn test_soft_delete_keeps_row() {
    let db = Database::in_memory().unwrap();
    db.upsert_food(&kale_chips(), "admin").unwrap();
    db.soft_delete_food("kale_chips", "admin", None).unwrap();

    assert!(db.list_foods(10).unwrap().is_empty());
    assert!(db.review_queue(10).unwrap().is_empty());

    // Still loaded so the index can skip it
    let all = db.all_foods().unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].deleted);
}

#[tokio::test]
async fn test_record_access_orders_list() {
    let db = Database::in_memory().unwrap();
    db.seed_foods(&seed_foods()).unwrap();

    let now = Utc::now();
    db.record_access("banana_raw", now).await.unwrap();
    db.record_access("banana_raw", now).await.unwrap();

    let top = db.list_foods(1).unwrap();
    assert_eq!(top[0].canonical_name, "banana_raw");
    assert_eq!(top[0].access_count, 2);
    let last = top[0].last_accessed.unwrap();
    assert_eq!(last.timestamp(), now.timestamp());

    assert!(db.record_access("missing", now).await.is_err());
}

#[tokio::test]
async fn test_provider_store() {
    let db = Database::in_memory().unwrap();

    let mut config = ProviderConfig::new(0, ProviderKind::Groq, "llama-3.1-8b-instant", 2);
    config.api_key = "gsk_test".to_string();
    config.quota_limit = Some(1000);
    config.cost_per_1k_tokens = Some(0.05);
    let groq = db.insert_provider(&config).unwrap();

    let openai = db
        .insert_provider(&ProviderConfig::new(0, ProviderKind::OpenAI, "gpt-4o-mini", 1))
        .unwrap();
    assert!(openai > groq);

    // Insertion order, not priority order
    let loaded = db.load_provider_configs().await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].id, groq);
    assert_eq!(loaded[0].provider, ProviderKind::Groq);
    assert_eq!(loaded[0].api_key, "gsk_test");
    assert_eq!(loaded[0].quota_limit, Some(1000));
    assert_eq!(loaded[1].quota_limit, None);

    db.increment_quota(groq, 420).await.unwrap();
    db.increment_quota(groq, 0).await.unwrap();
    assert_eq!(db.get_provider(groq).unwrap().unwrap().quota_used, 420);

    db.set_provider_active(openai, false).unwrap();
    assert!(!db.get_provider(openai).unwrap().unwrap().is_active);

    db.reset_provider_quota(groq).unwrap();
    assert_eq!(db.get_provider(groq).unwrap().unwrap().quota_used, 0);

    assert!(db.increment_quota(999, 1).await.is_err());
}

#[tokio::test]
async fn test_usage_log_and_stats() {
    let db = Database::in_memory().unwrap();
    let id = db
        .insert_provider(&ProviderConfig::new(0, ProviderKind::OpenAI, "gpt-4o-mini", 1))
        .unwrap();

    db.append_usage_log(&usage_entry(ProviderKind::OpenAI, Some(id), true))
        .await
        .unwrap();
    db.append_usage_log(&usage_entry(ProviderKind::OpenAI, Some(id), false))
        .await
        .unwrap();
    db.append_usage_log(&usage_entry(ProviderKind::Groq, None, true))
        .await
        .unwrap();

    let logs = db.list_usage_logs(10).unwrap();
    assert_eq!(logs.len(), 3);

    let stats = db.usage_stats().unwrap();
    assert_eq!(stats.len(), 2);
    let openai = stats.iter().find(|s| s.provider == "openai").unwrap();
    assert_eq!(openai.requests, 2);
    assert_eq!(openai.successes, 1);
    assert_eq!(openai.failures, 1);
    assert_eq!(openai.total_tokens, 42);
    assert!((openai.total_cost_usd - 0.01).abs() < 1e-9);
    assert!((openai.avg_latency_ms - 120.0).abs() < 1e-9);
}

#[test]
fn test_deleting_provider_keeps_usage_rows() {
    let db = Database::in_memory().unwrap();
    let id = db
        .insert_provider(&ProviderConfig::new(0, ProviderKind::OpenAI, "gpt-4o-mini", 1))
        .unwrap();
    db.insert_usage_log(&usage_entry(ProviderKind::OpenAI, Some(id), true))
        .unwrap();

    let conn = db.conn().unwrap();
    conn.execute("DELETE FROM provider_configs WHERE id = ?", [id])
        .unwrap();

    let logs = db.list_usage_logs(10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].config_id, None);
}

#[test]
fn test_unknown_provider_rows_are_skipped() {
    let db = Database::in_memory().unwrap();
    let openai = db
        .insert_provider(&ProviderConfig::new(0, ProviderKind::OpenAI, "gpt-4o-mini", 1))
        .unwrap();

    let conn = db.conn().unwrap();
    conn.execute(
        "INSERT INTO provider_configs (provider, api_key, model) VALUES ('anthropic', 'k', 'claude')",
        [],
    )
    .unwrap();
    let anthropic = conn.last_insert_rowid();

    let loaded = db.list_providers().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, openai);
    assert!(loaded.iter().all(|c| c.provider != ProviderKind::Mock));

    assert!(db.get_provider(anthropic).is_err());
}

#[test]
fn test_usage_rows_keep_unknown_vendor_names() {
    let db = Database::in_memory().unwrap();
    let mut entry = usage_entry(ProviderKind::OpenAI, None, true);
    entry.provider = "anthropic".to_string();
    db.insert_usage_log(&entry).unwrap();

    let logs = db.list_usage_logs(10).unwrap();
    assert_eq!(logs[0].provider, "anthropic");
    let stats = db.usage_stats().unwrap();
    assert_eq!(stats[0].provider, "anthropic");
}

#[test]
fn test_food_history_records_each_change() {
    let db = Database::in_memory().unwrap();
    db.upsert_food(&kale_chips(), "importer").unwrap();

    let mut edited = kale_chips();
    edited.macros.calories = 500.0;
    db.upsert_food(&edited, "admin").unwrap();
    db.verify_food("kale_chips", "dietitian").unwrap();
    db.soft_delete_food("kale_chips", "admin", Some("duplicate of kale_crisps"))
        .unwrap();

    let history = db.food_history("kale_chips", 10).unwrap();
    let actions: Vec<FoodChangeAction> = history.iter().map(|h| h.action).collect();
    assert_eq!(
        actions,
        vec![
            FoodChangeAction::Deleted,
            FoodChangeAction::Verified,
            FoodChangeAction::Updated,
            FoodChangeAction::Created,
        ]
    );
    assert!(history.iter().all(|h| h.canonical_name == "kale_chips"));

    let deleted = &history[0];
    assert_eq!(deleted.changed_by, "admin");
    assert_eq!(deleted.reason.as_deref(), Some("duplicate of kale_crisps"));
    assert!(deleted.old_value.as_ref().is_some_and(|r| !r.deleted));
    assert!(deleted.new_value.is_none());

    let verified = &history[1];
    assert_eq!(verified.changed_by, "dietitian");
    assert!(!verified.old_value.as_ref().unwrap().verified);
    let after = verified.new_value.as_ref().unwrap();
    assert!(after.verified);
    assert_eq!(after.confidence, 1.0);

    let updated = &history[2];
    assert_eq!(updated.old_value.as_ref().unwrap().macros.calories, 480.0);
    assert_eq!(updated.new_value.as_ref().unwrap().macros.calories, 500.0);

    let created = &history[3];
    assert_eq!(created.changed_by, "importer");
    assert!(created.old_value.is_none());
    assert_eq!(created.new_value.as_ref().unwrap().aliases, vec!["kale crisps".to_string()]);

    // newest first, capped by limit
    let latest = db.food_history("kale_chips", 1).unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].action, FoodChangeAction::Deleted);
}

#[test]
fn test_seeding_logs_creation_once() {
    let db = Database::in_memory().unwrap();
    db.seed_foods(&seed_foods()).unwrap();
    db.seed_foods(&seed_foods()).unwrap();

    let history = db.food_history("banana_raw", 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, FoodChangeAction::Created);
    assert_eq!(history[0].changed_by, "seed");
}

#[test]
fn test_failed_changes_leave_no_history() {
    let db = Database::in_memory().unwrap();
    assert!(db.soft_delete_food("missing", "admin", None).is_err());
    assert!(db.food_history("missing", 10).is_err());

    let conn = db.conn().unwrap();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM food_record_history", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}
