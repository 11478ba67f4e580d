//! SQLite persistence with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `foods` - Food records, review queue, change history, access bookkeeping
//! - `providers` - LLM provider configs and quota counters
//! - `usage` - Usage log and per-provider aggregates
//!
//! `Database` implements the collaborator traits from [`crate::store`], so it
//! can back the food index, router and usage worker directly.

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod foods;
mod providers;
mod usage;

#[cfg(test)]
mod tests;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Open (or create) a database file and run migrations
    pub fn new(path: &str) -> Result<Self> {
        // Foreign key enforcement is per connection
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` so every pooled
    /// connection sees the same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "macrolog_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Canonical food records (never hard-deleted)
            CREATE TABLE IF NOT EXISTS food_records (
                id INTEGER PRIMARY KEY,
                canonical_name TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                aliases TEXT NOT NULL DEFAULT '[]',
                category TEXT NOT NULL DEFAULT 'other',
                unit TEXT NOT NULL,
                calories REAL NOT NULL DEFAULT 0,
                protein_g REAL NOT NULL DEFAULT 0,
                carbs_g REAL NOT NULL DEFAULT 0,
                fat_g REAL NOT NULL DEFAULT 0,
                fiber_g REAL NOT NULL DEFAULT 0,
                sugar_g REAL NOT NULL DEFAULT 0,
                sodium_mg REAL NOT NULL DEFAULT 0,
                cholesterol_mg REAL,
                saturated_fat_g REAL,
                trans_fat_g REAL,
                preparation_style TEXT,
                default_portion REAL,
                source TEXT NOT NULL DEFAULT 'manual',
                source_id TEXT,
                origin TEXT NOT NULL DEFAULT 'seed',
                verified INTEGER NOT NULL DEFAULT 0,
                confidence REAL NOT NULL DEFAULT 1.0,
                access_count INTEGER NOT NULL DEFAULT 0,
                last_accessed DATETIME,
                deleted INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_food_records_access
                ON food_records(access_count DESC);

            -- LLM provider configurations
            CREATE TABLE IF NOT EXISTS provider_configs (
                id INTEGER PRIMARY KEY,
                provider TEXT NOT NULL,
                api_key TEXT NOT NULL DEFAULT '',
                model TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 1,
                temperature REAL NOT NULL DEFAULT 0.3,
                max_tokens INTEGER NOT NULL DEFAULT 1000,
                is_active INTEGER NOT NULL DEFAULT 1,
                quota_limit INTEGER,
                quota_used INTEGER NOT NULL DEFAULT 0,
                cost_per_1k_tokens REAL,
                base_url TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Append-only usage log
            CREATE TABLE IF NOT EXISTS usage_logs (
                id INTEGER PRIMARY KEY,
                config_id INTEGER REFERENCES provider_configs(id) ON DELETE SET NULL,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                user_id TEXT,
                request_type TEXT NOT NULL,
                prompt_tokens INTEGER NOT NULL DEFAULT 0,
                completion_tokens INTEGER NOT NULL DEFAULT 0,
                total_tokens INTEGER NOT NULL DEFAULT 0,
                latency_ms INTEGER NOT NULL DEFAULT 0,
                cost_usd REAL,
                success INTEGER NOT NULL,
                error TEXT,
                created_at DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_usage_logs_created
                ON usage_logs(created_at DESC);

            -- Append-only audit trail of food record changes
            CREATE TABLE IF NOT EXISTS food_record_history (
                id INTEGER PRIMARY KEY,
                food_id INTEGER NOT NULL REFERENCES food_records(id),
                action TEXT NOT NULL,
                old_value TEXT,
                new_value TEXT,
                changed_by TEXT NOT NULL,
                reason TEXT,
                changed_at DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_food_record_history_food
                ON food_record_history(food_id, id DESC);
            "#,
        )?;

        info!(path = %self.db_path, "Database migrations complete");
        Ok(())
    }
}
