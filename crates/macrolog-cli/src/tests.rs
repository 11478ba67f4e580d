//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use chrono::Timelike;
use macrolog_core::config::Config;
use macrolog_core::db::Database;
use macrolog_core::food::seed_foods;
use macrolog_core::models::{EntryCategory, MealType, ProviderConfig, ProviderKind};
use macrolog_core::test_utils::MockProviderServer;

use crate::commands::{self, fmt_opt, truncate, ClassifyOptions, NewProvider};

fn setup_test_db() -> Database {
    let db = Database::in_memory().unwrap();
    db.seed_foods(&seed_foods()).unwrap();
    db
}

fn test_config() -> Config {
    Config::embedded().unwrap()
}

fn new_provider(provider: &str, model: &str, api_key: Option<&str>) -> NewProvider {
    NewProvider {
        provider: provider.to_string(),
        model: model.to_string(),
        api_key: api_key.map(String::from),
        priority: 1,
        quota: None,
        cost: None,
        base_url: None,
    }
}

// ========== Init Tests ==========

#[test]
fn test_cmd_init_seeds_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("macrolog.db");

    commands::cmd_init(&path).unwrap();
    commands::cmd_init(&path).unwrap();

    let db = commands::open_db(&path).unwrap();
    assert_eq!(db.all_foods().unwrap().len(), seed_foods().len());
}

// ========== Config Tests ==========

#[test]
fn test_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[food_index]\nfuzzy_threshold = 90.0").unwrap();

    let config = commands::load_config(Some(file.path())).unwrap();
    assert_eq!(config.food_index.fuzzy_threshold, 90.0);
    assert_eq!(config.source.as_deref(), Some(file.path()));
}

#[test]
fn test_load_config_rejects_unknown_keys() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[food_idx]\nfuzzy_threshold = 90.0").unwrap();

    assert!(commands::load_config(Some(file.path())).is_err());
}

#[test]
fn test_load_config_missing_file() {
    let result = commands::load_config(Some(std::path::Path::new("/nonexistent/macrolog.toml")));
    assert!(result.is_err());
}

// ========== Foods Command Tests ==========

#[test]
fn test_cmd_foods_list() {
    let db = setup_test_db();
    assert!(commands::cmd_foods_list(&db, 10).is_ok());
}

#[test]
fn test_cmd_foods_list_empty() {
    let db = Database::in_memory().unwrap();
    assert!(commands::cmd_foods_list(&db, 10).is_ok());
}

#[test]
fn test_cmd_foods_verify() {
    let db = setup_test_db();
    let mut record = seed_foods()[0].clone();
    record.canonical_name = "mystery_stew".to_string();
    record.aliases = vec!["mystery stew".to_string()];
    record.verified = false;
    record.confidence = 0.5;
    db.upsert_food(&record, "import").unwrap();

    let queue = db.review_queue(10).unwrap();
    assert!(queue.iter().any(|f| f.canonical_name == "mystery_stew"));
    assert!(commands::cmd_foods_review(&db, 10).is_ok());

    commands::cmd_foods_verify(&db, "mystery_stew", "dietitian").unwrap();
    let stored = db.get_food("mystery_stew").unwrap().unwrap();
    assert!(stored.verified);
    assert!(!db
        .review_queue(10)
        .unwrap()
        .iter()
        .any(|f| f.canonical_name == "mystery_stew"));
}

#[test]
fn test_cmd_foods_verify_unknown() {
    let db = setup_test_db();
    assert!(commands::cmd_foods_verify(&db, "no_such_food", "admin").is_err());
}

#[test]
fn test_cmd_foods_delete() {
    let db = setup_test_db();
    commands::cmd_foods_delete(&db, "egg_large_boiled", "admin", Some("duplicate")).unwrap();

    let stored = db.get_food("egg_large_boiled").unwrap().unwrap();
    assert!(stored.deleted);
    assert!(!db
        .list_foods(1000)
        .unwrap()
        .iter()
        .any(|f| f.canonical_name == "egg_large_boiled"));
}

#[test]
fn test_cmd_foods_history() {
    let db = setup_test_db();
    commands::cmd_foods_verify(&db, "banana_raw", "dietitian").unwrap();
    commands::cmd_foods_delete(&db, "banana_raw", "admin", Some("duplicate")).unwrap();
    assert!(commands::cmd_foods_history(&db, "banana_raw", 10).is_ok());

    let history = db.food_history("banana_raw", 10).unwrap();
    let actions: Vec<&str> = history.iter().map(|h| h.action.as_str()).collect();
    assert_eq!(actions, vec!["deleted", "verified", "created"]);
    assert_eq!(history[0].reason.as_deref(), Some("duplicate"));
    assert_eq!(history[1].changed_by, "dietitian");

    assert!(commands::cmd_foods_history(&db, "no_such_food", 10).is_err());
}

// ========== Providers Command Tests ==========

#[test]
fn test_cmd_providers_add_and_list() {
    let db = setup_test_db();
    let mut new = new_provider("gemini", "gemini-1.5-flash", Some("key-123"));
    new.priority = 2;
    new.quota = Some(10_000);
    new.cost = Some(0.075);

    let id = commands::cmd_providers_add(&db, &new).unwrap();
    let stored = db.get_provider(id).unwrap().unwrap();
    assert_eq!(stored.provider, ProviderKind::Gemini);
    assert_eq!(stored.model, "gemini-1.5-flash");
    assert_eq!(stored.api_key, "key-123");
    assert_eq!(stored.priority, 2);
    assert_eq!(stored.quota_limit, Some(10_000));
    assert_eq!(stored.cost_per_1k_tokens, Some(0.075));
    assert!(stored.is_active);

    assert!(commands::cmd_providers_list(&db).is_ok());
}

#[test]
fn test_cmd_providers_add_rejects_mock() {
    let db = setup_test_db();
    assert!(commands::cmd_providers_add(&db, &new_provider("mock", "mock-model", None)).is_err());
    assert!(db.list_providers().unwrap().is_empty());
}

#[test]
fn test_cmd_providers_add_invalid() {
    let db = setup_test_db();
    assert!(commands::cmd_providers_add(&db, &new_provider("anthropic", "x", Some("k"))).is_err());
    assert!(commands::cmd_providers_add(&db, &new_provider("openai", "  ", Some("k"))).is_err());
    assert!(db.list_providers().unwrap().is_empty());
}

#[test]
fn test_cmd_providers_enable_disable() {
    let db = setup_test_db();
    let id = commands::cmd_providers_add(&db, &new_provider("groq", "llama-3.1-8b-instant", Some("k")))
        .unwrap();

    commands::cmd_providers_set_active(&db, id, false).unwrap();
    assert!(!db.get_provider(id).unwrap().unwrap().is_active);

    commands::cmd_providers_set_active(&db, id, true).unwrap();
    assert!(db.get_provider(id).unwrap().unwrap().is_active);
}

#[test]
fn test_cmd_providers_reset_quota() {
    let db = setup_test_db();
    let mut config = ProviderConfig::new(0, ProviderKind::Gemini, "gemini-1.5-flash", 1);
    config.api_key = "k".to_string();
    config.quota_limit = Some(100);
    let id = db.insert_provider(&config).unwrap();
    db.increment_provider_quota(id, 150).unwrap();
    assert!(db.get_provider(id).unwrap().unwrap().quota_status().exceeded);

    commands::cmd_providers_reset_quota(&db, id).unwrap();
    let provider = db.get_provider(id).unwrap().unwrap();
    assert_eq!(provider.quota_used, 0);
    assert!(!provider.quota_status().exceeded);

    assert!(commands::cmd_providers_reset_quota(&db, 999).is_err());
}

#[test]
fn test_cmd_providers_list_empty() {
    let db = Database::in_memory().unwrap();
    assert!(commands::cmd_providers_list(&db).is_ok());
}

// ========== Classify Command Tests ==========

#[tokio::test]
async fn test_classify_text_from_cache() {
    let db = setup_test_db();
    let options = ClassifyOptions {
        at: Some("2024-06-03 08:15".to_string()),
        ..Default::default()
    };

    let result = commands::classify_text(&db, &test_config(), "2 eggs", &options)
        .await
        .unwrap();

    assert!(result.provider.is_none());
    assert_eq!(result.items.len(), 1);
    let item = &result.items[0];
    assert_eq!(item.category, EntryCategory::Meal);
    assert_eq!(item.calories, Some(140.0));
    assert!(item.cache_hit);
    assert_eq!(item.meal_type, Some(MealType::Breakfast));

    let egg = db.get_food("egg_large_boiled").unwrap().unwrap();
    assert_eq!(egg.access_count, 1);
}

/// Insert a provider row directly, bypassing `cmd_providers_add` validation
fn insert_raw_provider(db: &Database, provider: &str) {
    db.conn()
        .unwrap()
        .execute(
            &format!(
                "INSERT INTO provider_configs (provider, api_key, model, priority) \
                 VALUES ('{}', 'key', 'some-model', 1)",
                provider
            ),
            [],
        )
        .unwrap();
}

#[tokio::test]
async fn test_classify_text_never_invents_data_from_stored_rows() {
    let db = setup_test_db();
    insert_raw_provider(&db, "anthropic");
    insert_raw_provider(&db, "mock");

    let result = commands::classify_text(
        &db,
        &test_config(),
        "dragon fruit smoothie",
        &ClassifyOptions::default(),
    )
    .await
    .unwrap();

    assert!(result.degraded);
    assert!(result.provider.is_none());
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].category, EntryCategory::Other);
    assert_eq!(result.items[0].calories, None);
}

#[tokio::test]
async fn test_classify_text_logs_user_over_http() {
    let server = MockProviderServer::start().await;
    let db = setup_test_db();
    let id = commands::cmd_providers_add(
        &db,
        &NewProvider {
            base_url: Some(server.url()),
            ..new_provider("openai", "gpt-4o-mini", Some("test-key"))
        },
    )
    .unwrap();

    let options = ClassifyOptions {
        user: Some("user-1".to_string()),
        ..Default::default()
    };
    let result = commands::classify_text(&db, &test_config(), "ran 5k this morning", &options)
        .await
        .unwrap();

    assert!(!result.degraded);
    assert_eq!(result.provider.as_deref(), Some("openai"));

    let logs = db.list_usage_logs(10).unwrap();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].success);
    assert_eq!(logs[0].config_id, Some(id));
    assert_eq!(logs[0].provider, "openai");
    assert_eq!(logs[0].user_id.as_deref(), Some("user-1"));
    assert!(commands::cmd_usage(&db, 10).is_ok());
}

#[tokio::test]
async fn test_classify_text_over_http() {
    let server = MockProviderServer::start().await;
    let db = setup_test_db();
    let mut config = ProviderConfig::new(0, ProviderKind::OpenAI, "gpt-4o-mini", 1);
    config.api_key = "test-key".to_string();
    config.base_url = Some(server.url());
    let id = db.insert_provider(&config).unwrap();

    let options = ClassifyOptions {
        provider: Some("openai".to_string()),
        at: Some("2024-06-03 08:00".to_string()),
        ..Default::default()
    };
    let result = commands::classify_text(&db, &test_config(), "dragon fruit smoothie", &options)
        .await
        .unwrap();

    assert_eq!(server.request_count(), 1);
    assert_eq!(result.provider.as_deref(), Some("openai"));
    assert_eq!(result.items[0].calories, Some(210.0));
    assert_eq!(db.get_provider(id).unwrap().unwrap().quota_used, 42);
}

#[tokio::test]
async fn test_classify_text_no_providers_degrades() {
    let db = setup_test_db();
    let result = commands::classify_text(
        &db,
        &test_config(),
        "did laundry",
        &ClassifyOptions::default(),
    )
    .await
    .unwrap();

    assert!(result.degraded);
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].category, EntryCategory::Other);
    assert_eq!(result.items[0].summary, "did laundry");
}

#[tokio::test]
async fn test_classify_text_rejects_unknown_provider() {
    let db = setup_test_db();
    let options = ClassifyOptions {
        provider: Some("anthropic".to_string()),
        ..Default::default()
    };
    assert!(commands::classify_text(&db, &test_config(), "2 eggs", &options)
        .await
        .is_err());
}

#[test]
fn test_parse_local_time() {
    let time = commands::parse_local_time("2024-06-03 19:30").unwrap();
    assert_eq!(time.hour(), 19);
    assert_eq!(time.minute(), 30);
    assert!(commands::parse_local_time("7:30pm").is_err());
}

// ========== Match Command Tests ==========

#[tokio::test]
async fn test_cmd_match() {
    let db = setup_test_db();
    let config = test_config();
    assert!(commands::cmd_match(&db, &config, "250g chicken breast", false).await.is_ok());
    assert!(commands::cmd_match(&db, &config, "2 eggs", true).await.is_ok());
    assert!(commands::cmd_match(&db, &config, "unobtainium", false).await.is_ok());
}

// ========== Usage Command Tests ==========

#[test]
fn test_cmd_usage_empty() {
    let db = setup_test_db();
    assert!(commands::cmd_usage(&db, 10).is_ok());
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("exactly10!", 10), "exactly10!");
    assert_eq!(truncate("this is too long", 10), "this is...");
    assert_eq!(truncate("crème brûlée tart", 8), "crème...");
}

#[test]
fn test_fmt_opt() {
    assert_eq!(fmt_opt(Some(12.345)), "12.3");
    assert_eq!(fmt_opt(None), "-");
}
