//! In-memory food index with exact and fuzzy lookup
//!
//! The index maps every canonical name and alias (case-folded) to its owning
//! record. It is built lazily from the `FoodStore` and rebuilt wholesale once
//! the snapshot is older than the configured TTL. Edits to individual records
//! become visible at the next rebuild (or after `invalidate`).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use super::similarity;
use crate::cache::{CacheEntry, Clock};
use crate::config::FoodIndexConfig;
use crate::models::{FoodRecord, MatchResult, MatchType, Suggestion};
use crate::normalize::{normalize, NormalizedInput};
use crate::store::FoodStore;

/// Immutable view of all indexed keys
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    /// Keys in registration order
    keys: Vec<String>,
    owners: HashMap<String, Arc<FoodRecord>>,
    records: usize,
}

impl IndexSnapshot {
    /// Build from records; the first owner registered for a key keeps it
    pub fn build(records: Vec<FoodRecord>) -> Self {
        let mut snapshot = Self::default();
        for record in records.into_iter().filter(|r| !r.deleted) {
            let record = Arc::new(record);
            snapshot.records += 1;
            let names = std::iter::once(&record.canonical_name).chain(record.aliases.iter());
            for name in names {
                let key = name.trim().to_lowercase();
                if key.is_empty() || snapshot.owners.contains_key(&key) {
                    continue;
                }
                snapshot.keys.push(key.clone());
                snapshot.owners.insert(key, Arc::clone(&record));
            }
        }
        snapshot
    }

    pub fn get(&self, key: &str) -> Option<&Arc<FoodRecord>> {
        self.owners.get(key)
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn record_count(&self) -> usize {
        self.records
    }

    /// Resolve an already-normalized phrase
    pub fn lookup(&self, phrase: &str, settings: &FoodIndexConfig) -> MatchResult {
        let phrase = phrase.trim().to_lowercase();
        if phrase.is_empty() {
            return MatchResult::none(&phrase);
        }

        if let Some(record) = self.owners.get(&phrase) {
            return MatchResult {
                query: phrase,
                matched: true,
                record: Some(Arc::clone(record)),
                confidence: 1.0,
                match_type: MatchType::Exact,
                suggestions: Vec::new(),
            };
        }

        let candidates = similarity::extract(
            &phrase,
            self.keys.iter().map(String::as_str),
            settings.max_candidates,
        );

        let Some(&(best_key, best_score)) = candidates.first() else {
            return MatchResult::none(&phrase);
        };
        if best_score < settings.fuzzy_threshold {
            debug!(query = %phrase, best = %best_key, score = best_score, "No fuzzy match");
            return MatchResult::none(&phrase);
        }

        let Some(best) = self.owners.get(best_key) else {
            return MatchResult::none(&phrase);
        };

        let mut suggestions: Vec<Suggestion> = Vec::new();
        for &(key, score) in candidates.iter().skip(1) {
            if suggestions.len() >= settings.max_suggestions {
                break;
            }
            if score < settings.suggestion_threshold {
                continue;
            }
            let Some(owner) = self.owners.get(key) else {
                continue;
            };
            let duplicate = owner.canonical_name == best.canonical_name
                || suggestions
                    .iter()
                    .any(|s| s.canonical_name == owner.canonical_name);
            if !duplicate {
                suggestions.push(Suggestion {
                    canonical_name: owner.canonical_name.clone(),
                    display_name: owner.display_name.clone(),
                    confidence: score / 100.0,
                });
            }
        }

        MatchResult {
            query: phrase,
            matched: true,
            record: Some(Arc::clone(best)),
            confidence: best_score / 100.0,
            match_type: MatchType::Fuzzy,
            suggestions,
        }
    }
}

/// TTL-refreshed food index over a `FoodStore`
pub struct FoodIndex {
    store: Arc<dyn FoodStore>,
    clock: Arc<dyn Clock>,
    settings: FoodIndexConfig,
    snapshot: RwLock<Option<CacheEntry<Arc<IndexSnapshot>>>>,
}

impl FoodIndex {
    pub fn new(store: Arc<dyn FoodStore>, clock: Arc<dyn Clock>, settings: FoodIndexConfig) -> Self {
        Self {
            store,
            clock,
            settings,
            snapshot: RwLock::new(None),
        }
    }

    pub fn settings(&self) -> &FoodIndexConfig {
        &self.settings
    }

    /// Current snapshot, rebuilding it first when missing or stale
    ///
    /// A store error keeps serving the previous snapshot (or an empty one).
    pub async fn snapshot(&self) -> Arc<IndexSnapshot> {
        let now = self.clock.now();
        let cached = self.snapshot.read().ok().and_then(|guard| {
            guard
                .as_ref()
                .map(|entry| (Arc::clone(&entry.value), entry.is_stale(now, self.settings.ttl)))
        });

        match cached {
            Some((snapshot, false)) => snapshot,
            Some((previous, true)) => self.rebuild().await.unwrap_or(previous),
            None => self
                .rebuild()
                .await
                .unwrap_or_else(|| Arc::new(IndexSnapshot::default())),
        }
    }

    /// Reload from the store; None if the store failed
    async fn rebuild(&self) -> Option<Arc<IndexSnapshot>> {
        match self.store.load_food_records().await {
            Ok(records) => {
                let snapshot = Arc::new(IndexSnapshot::build(records));
                info!(
                    records = snapshot.record_count(),
                    keys = snapshot.key_count(),
                    "Food index rebuilt"
                );
                if let Ok(mut guard) = self.snapshot.write() {
                    *guard = Some(CacheEntry::new(Arc::clone(&snapshot), self.clock.now()));
                }
                Some(snapshot)
            }
            Err(e) => {
                warn!("Failed to load food records, serving previous index: {}", e);
                None
            }
        }
    }

    /// Force a rebuild on the next lookup
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.snapshot.write() {
            *guard = None;
        }
    }

    /// Resolve an already-normalized food phrase
    pub async fn lookup(&self, phrase: &str) -> MatchResult {
        let snapshot = self.snapshot().await;
        let result = snapshot.lookup(phrase, &self.settings);
        debug!(
            query = %result.query,
            match_type = result.match_type.as_str(),
            confidence = result.confidence,
            "Food lookup"
        );
        result
    }

    /// Normalize raw text, then resolve its food phrase
    pub async fn match_text(&self, text: &str) -> (NormalizedInput, MatchResult) {
        let input = normalize(text);
        let result = self.lookup(&input.food).await;
        (input, result)
    }
}
