//! Usage log database operations

use async_trait::async_trait;
use rusqlite::params;

use super::{format_datetime, parse_datetime, Database};
use crate::error::Result;
use crate::models::{UsageLogEntry, UsageStats};
use crate::store::UsageSink;

impl Database {
    pub fn insert_usage_log(&self, entry: &UsageLogEntry) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO usage_logs (
                config_id, provider, model, user_id, request_type,
                prompt_tokens, completion_tokens, total_tokens, latency_ms,
                cost_usd, success, error, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                entry.config_id,
                entry.provider,
                entry.model,
                entry.user_id,
                entry.request_type,
                entry.prompt_tokens,
                entry.completion_tokens,
                entry.total_tokens,
                entry.latency_ms as i64,
                entry.cost_usd,
                entry.success,
                entry.error,
                format_datetime(&entry.created_at),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Most recent usage log entries
    pub fn list_usage_logs(&self, limit: usize) -> Result<Vec<UsageLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT config_id, provider, model, user_id, request_type,
                   prompt_tokens, completion_tokens, total_tokens, latency_ms,
                   cost_usd, success, error, created_at
            FROM usage_logs
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let entries = stmt
            .query_map(params![limit as i64], |row| {
                let latency_ms: i64 = row.get(8)?;
                let created_at: String = row.get(12)?;
                Ok(UsageLogEntry {
                    config_id: row.get(0)?,
                    provider: row.get(1)?,
                    model: row.get(2)?,
                    user_id: row.get(3)?,
                    request_type: row.get(4)?,
                    prompt_tokens: row.get(5)?,
                    completion_tokens: row.get(6)?,
                    total_tokens: row.get(7)?,
                    latency_ms: latency_ms.max(0) as u64,
                    cost_usd: row.get(9)?,
                    success: row.get(10)?,
                    error: row.get(11)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Request, token and cost totals per provider
    pub fn usage_stats(&self) -> Result<Vec<UsageStats>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                provider,
                COUNT(*) as requests,
                SUM(CASE WHEN success THEN 1 ELSE 0 END) as successes,
                SUM(CASE WHEN success THEN 0 ELSE 1 END) as failures,
                COALESCE(SUM(total_tokens), 0) as total_tokens,
                COALESCE(SUM(cost_usd), 0.0) as total_cost,
                COALESCE(AVG(latency_ms), 0.0) as avg_latency
            FROM usage_logs
            GROUP BY provider
            ORDER BY requests DESC, provider
            "#,
        )?;

        let stats = stmt
            .query_map([], |row| {
                Ok(UsageStats {
                    provider: row.get(0)?,
                    requests: row.get(1)?,
                    successes: row.get(2)?,
                    failures: row.get(3)?,
                    total_tokens: row.get(4)?,
                    total_cost_usd: row.get(5)?,
                    avg_latency_ms: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(stats)
    }
}

#[async_trait]
impl UsageSink for Database {
    async fn increment_quota(&self, config_id: i64, tokens: u64) -> Result<()> {
        self.increment_provider_quota(config_id, tokens)
    }

    async fn append_usage_log(&self, entry: &UsageLogEntry) -> Result<()> {
        self.insert_usage_log(entry).map(|_| ())
    }
}
