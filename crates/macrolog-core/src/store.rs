//! Collaborator traits for persistence and an in-memory implementation
//!
//! The core never talks to a storage engine directly. It loads food records and
//! provider configs, reports access and usage, and asks for a user's local
//! time through these traits. `Database` implements them over SQLite;
//! `MemoryStore` implements them in process for tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

use crate::error::{Error, Result};
use crate::models::{FoodRecord, ProviderConfig, UsageLogEntry};

#[async_trait]
pub trait FoodStore: Send + Sync {
    /// All food records, including deleted ones
    async fn load_food_records(&self) -> Result<Vec<FoodRecord>>;

    /// Bump access_count and set last_accessed
    async fn record_access(&self, canonical_name: &str, at: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait ProviderConfigStore: Send + Sync {
    /// Provider configs in insertion order
    async fn load_provider_configs(&self) -> Result<Vec<ProviderConfig>>;
}

#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn increment_quota(&self, config_id: i64, tokens: u64) -> Result<()>;

    async fn append_usage_log(&self, entry: &UsageLogEntry) -> Result<()>;
}

#[async_trait]
pub trait UserClock: Send + Sync {
    /// Local wall-clock time for a user, if their timezone is known
    async fn user_local_time(&self, user_id: &str) -> Result<Option<NaiveDateTime>>;
}

fn lock_err() -> Error {
    Error::InvalidData("Memory store lock poisoned".into())
}

/// In-memory store implementing every collaborator trait
#[derive(Default)]
pub struct MemoryStore {
    foods: RwLock<Vec<FoodRecord>>,
    providers: RwLock<Vec<ProviderConfig>>,
    usage: RwLock<Vec<UsageLogEntry>>,
    timezones: RwLock<HashMap<String, FixedOffset>>,
    fail_loads: AtomicBool,
    fail_writes: AtomicBool,
    food_loads: AtomicUsize,
    config_loads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_foods(foods: Vec<FoodRecord>) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.foods.write() {
            *guard = foods;
        }
        store
    }

    pub fn add_food(&self, record: FoodRecord) {
        if let Ok(mut foods) = self.foods.write() {
            foods.push(record);
        }
    }

    pub fn add_provider(&self, config: ProviderConfig) {
        if let Ok(mut providers) = self.providers.write() {
            providers.push(config);
        }
    }

    /// Replace a provider config by id
    pub fn update_provider(&self, config: ProviderConfig) {
        if let Ok(mut providers) = self.providers.write() {
            if let Some(existing) = providers.iter_mut().find(|p| p.id == config.id) {
                *existing = config;
            }
        }
    }

    pub fn set_timezone(&self, user_id: &str, offset: FixedOffset) {
        if let Ok(mut tz) = self.timezones.write() {
            tz.insert(user_id.to_string(), offset);
        }
    }

    /// Make every load fail (simulates a store outage)
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn food(&self, canonical_name: &str) -> Option<FoodRecord> {
        self.foods
            .read()
            .ok()?
            .iter()
            .find(|f| f.canonical_name == canonical_name)
            .cloned()
    }

    pub fn provider(&self, id: i64) -> Option<ProviderConfig> {
        self.providers
            .read()
            .ok()?
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn usage_logs(&self) -> Vec<UsageLogEntry> {
        self.usage.read().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn food_load_count(&self) -> usize {
        self.food_loads.load(Ordering::SeqCst)
    }

    pub fn config_load_count(&self) -> usize {
        self.config_loads.load(Ordering::SeqCst)
    }

    fn check_load(&self) -> Result<()> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(Error::InvalidData("Simulated store outage".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::InvalidData("Simulated write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl FoodStore for MemoryStore {
    async fn load_food_records(&self) -> Result<Vec<FoodRecord>> {
        self.food_loads.fetch_add(1, Ordering::SeqCst);
        self.check_load()?;
        Ok(self.foods.read().map_err(|_| lock_err())?.clone())
    }

    async fn record_access(&self, canonical_name: &str, at: DateTime<Utc>) -> Result<()> {
        self.check_write()?;
        let mut foods = self.foods.write().map_err(|_| lock_err())?;
        let record = foods
            .iter_mut()
            .find(|f| f.canonical_name == canonical_name)
            .ok_or_else(|| Error::NotFound(format!("Food record {}", canonical_name)))?;
        record.access_count += 1;
        record.last_accessed = Some(at);
        Ok(())
    }
}

#[async_trait]
impl ProviderConfigStore for MemoryStore {
    async fn load_provider_configs(&self) -> Result<Vec<ProviderConfig>> {
        self.config_loads.fetch_add(1, Ordering::SeqCst);
        self.check_load()?;
        Ok(self.providers.read().map_err(|_| lock_err())?.clone())
    }
}

#[async_trait]
impl UsageSink for MemoryStore {
    async fn increment_quota(&self, config_id: i64, tokens: u64) -> Result<()> {
        self.check_write()?;
        let mut providers = self.providers.write().map_err(|_| lock_err())?;
        let config = providers
            .iter_mut()
            .find(|p| p.id == config_id)
            .ok_or_else(|| Error::NotFound(format!("Provider config {}", config_id)))?;
        config.quota_used = config.quota_used.saturating_add(tokens);
        Ok(())
    }

    async fn append_usage_log(&self, entry: &UsageLogEntry) -> Result<()> {
        self.check_write()?;
        self.usage.write().map_err(|_| lock_err())?.push(entry.clone());
        Ok(())
    }
}

#[async_trait]
impl UserClock for MemoryStore {
    async fn user_local_time(&self, user_id: &str) -> Result<Option<NaiveDateTime>> {
        let offset = self
            .timezones
            .read()
            .map_err(|_| lock_err())?
            .get(user_id)
            .copied();
        Ok(offset.map(|o| Utc::now().with_timezone(&o).naive_local()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MacroNutrients, ProviderKind};
    use crate::units::Unit;

    #[tokio::test]
    async fn test_record_access_increments() {
        let store = MemoryStore::with_foods(vec![FoodRecord::new(
            "banana_medium",
            "Banana",
            Unit::Medium,
            MacroNutrients::default(),
        )]);
        let now = Utc::now();
        store.record_access("banana_medium", now).await.unwrap();
        store.record_access("banana_medium", now).await.unwrap();

        let record = store.food("banana_medium").unwrap();
        assert_eq!(record.access_count, 2);
        assert_eq!(record.last_accessed, Some(now));

        assert!(store.record_access("missing", now).await.is_err());
    }

    #[tokio::test]
    async fn test_increment_quota_is_monotonic() {
        let store = MemoryStore::new();
        store.add_provider(ProviderConfig::new(7, ProviderKind::Groq, "llama", 1));

        store.increment_quota(7, 120).await.unwrap();
        store.increment_quota(7, 0).await.unwrap();
        store.increment_quota(7, 30).await.unwrap();
        assert_eq!(store.provider(7).unwrap().quota_used, 150);
    }

    #[tokio::test]
    async fn test_simulated_outage() {
        let store = MemoryStore::new();
        store.set_fail_loads(true);
        assert!(store.load_food_records().await.is_err());
        assert!(store.load_provider_configs().await.is_err());
        assert_eq!(store.food_load_count(), 1);
    }

    #[tokio::test]
    async fn test_user_local_time() {
        let store = MemoryStore::new();
        assert!(store.user_local_time("u1").await.unwrap().is_none());
        store.set_timezone("u1", FixedOffset::east_opt(3600).unwrap());
        assert!(store.user_local_time("u1").await.unwrap().is_some());
    }
}
