//! Provider config database operations

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Row};
use tracing::warn;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{ProviderConfig, ProviderKind};
use crate::store::ProviderConfigStore;

/// Column index of `provider` in `PROVIDER_COLUMNS`
const PROVIDER_KIND_COLUMN: usize = 1;

const PROVIDER_COLUMNS: &str = r#"
    id, provider, api_key, model, priority, temperature, max_tokens,
    is_active, quota_limit, quota_used, cost_per_1k_tokens, base_url
"#;

/// Unknown vendor names fail the row with a conversion error
fn row_to_provider(row: &Row) -> rusqlite::Result<ProviderConfig> {
    let provider: String = row.get(PROVIDER_KIND_COLUMN)?;
    let provider: ProviderKind = provider.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(PROVIDER_KIND_COLUMN, Type::Text, e.into())
    })?;
    let max_tokens: i64 = row.get(6)?;
    let quota_limit: Option<i64> = row.get(8)?;
    let quota_used: i64 = row.get(9)?;

    Ok(ProviderConfig {
        id: row.get(0)?,
        provider,
        api_key: row.get(2)?,
        model: row.get(3)?,
        priority: row.get(4)?,
        temperature: row.get(5)?,
        max_tokens: max_tokens.max(0) as u32,
        is_active: row.get(7)?,
        quota_limit: quota_limit.map(|l| l.max(0) as u64),
        quota_used: quota_used.max(0) as u64,
        cost_per_1k_tokens: row.get(10)?,
        base_url: row.get(11)?,
    })
}

impl Database {
    /// Insert a provider config, returning its new id
    ///
    /// The `id` and `quota_used` fields of the argument are ignored.
    pub fn insert_provider(&self, config: &ProviderConfig) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO provider_configs (
                provider, api_key, model, priority, temperature, max_tokens,
                is_active, quota_limit, cost_per_1k_tokens, base_url
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                config.provider.as_str(),
                config.api_key,
                config.model,
                config.priority,
                config.temperature,
                config.max_tokens,
                config.is_active,
                config.quota_limit.map(|l| l as i64),
                config.cost_per_1k_tokens,
                config.base_url,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Provider configs in insertion order
    ///
    /// Rows naming an unknown vendor are skipped with a warning.
    pub fn list_providers(&self) -> Result<Vec<ProviderConfig>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM provider_configs ORDER BY id", PROVIDER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut providers = Vec::new();
        for row in stmt.query_map([], row_to_provider)? {
            match row {
                Ok(config) => providers.push(config),
                Err(rusqlite::Error::FromSqlConversionFailure(PROVIDER_KIND_COLUMN, _, e)) => {
                    warn!("Skipping provider config: {}", e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(providers)
    }

    pub fn get_provider(&self, id: i64) -> Result<Option<ProviderConfig>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM provider_configs WHERE id = ?", PROVIDER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], row_to_provider)?;
        let record = rows.next().transpose()?;
        Ok(record)
    }

    pub fn set_provider_active(&self, id: i64, active: bool) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE provider_configs SET is_active = ? WHERE id = ?",
            params![active, id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Provider config {}", id)));
        }
        Ok(())
    }

    /// Add tokens to a provider's quota counter
    pub fn increment_provider_quota(&self, id: i64, tokens: u64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE provider_configs SET quota_used = quota_used + ? WHERE id = ?",
            params![tokens as i64, id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Provider config {}", id)));
        }
        Ok(())
    }

    /// Zero a provider's quota counter (start of a new billing period)
    pub fn reset_provider_quota(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE provider_configs SET quota_used = 0 WHERE id = ?",
            params![id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Provider config {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderConfigStore for Database {
    async fn load_provider_configs(&self) -> Result<Vec<ProviderConfig>> {
        self.list_providers()
    }
}
