//! Service wiring
//!
//! `Services` is built once per process: it owns the food index, portion
//! calculator, provider router and classifier, and the background task that
//! drains the usage queue into the usage sink.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::info;

use crate::ai::{BackendFactory, HttpBackendFactory};
use crate::cache::{Clock, SystemClock};
use crate::classifier::{ClassifyContext, Classifier};
use crate::config::Config;
use crate::db::Database;
use crate::food::{FoodIndex, PortionCalculator};
use crate::models::Classification;
use crate::prompts::PromptLibrary;
use crate::router::ProviderRouter;
use crate::store::{FoodStore, ProviderConfigStore, UsageSink, UserClock};
use crate::usage::{UsageCounters, UsageRecorder};

/// The collaborators a `Services` instance reads from and writes to
#[derive(Clone)]
pub struct ServiceStores {
    pub foods: Arc<dyn FoodStore>,
    pub providers: Arc<dyn ProviderConfigStore>,
    pub usage: Arc<dyn UsageSink>,
    pub user_clock: Option<Arc<dyn UserClock>>,
}

impl ServiceStores {
    /// Use one store for foods, providers and usage
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: FoodStore + ProviderConfigStore + UsageSink + 'static,
    {
        Self {
            foods: store.clone(),
            providers: store.clone(),
            usage: store,
            user_clock: None,
        }
    }

    pub fn with_user_clock(mut self, user_clock: Arc<dyn UserClock>) -> Self {
        self.user_clock = Some(user_clock);
        self
    }
}

pub struct Services {
    pub index: Arc<FoodIndex>,
    pub portions: Arc<PortionCalculator>,
    pub router: Arc<ProviderRouter>,
    pub classifier: Arc<Classifier>,
    pub prompts: Arc<PromptLibrary>,
    usage: UsageRecorder,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Services {
    /// Wire every component; must be called inside a tokio runtime
    pub fn new(
        config: &Config,
        stores: ServiceStores,
        factory: Arc<dyn BackendFactory>,
        prompts: PromptLibrary,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (usage, worker) = UsageRecorder::new(config.usage.queue_capacity);
        let worker = worker.spawn(stores.usage.clone());

        let index = Arc::new(FoodIndex::new(
            stores.foods.clone(),
            clock.clone(),
            config.food_index.clone(),
        ));
        let portions = Arc::new(PortionCalculator::new(stores.foods.clone(), clock.clone()));
        let router = Arc::new(ProviderRouter::new(
            stores.providers.clone(),
            factory,
            usage.clone(),
            clock.clone(),
            config.providers.clone(),
        ));
        let prompts = Arc::new(prompts);

        let mut classifier = Classifier::new(
            index.clone(),
            portions.clone(),
            router.clone(),
            prompts.clone(),
            clock,
            config.classifier.clone(),
        );
        if let Some(user_clock) = stores.user_clock {
            classifier = classifier.with_user_clock(user_clock);
        }

        info!(
            queue_capacity = config.usage.queue_capacity,
            config_source = ?config.source,
            "Services initialized"
        );

        Self {
            index,
            portions,
            router,
            classifier: Arc::new(classifier),
            prompts,
            usage,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Production wiring over SQLite with HTTP provider adapters
    pub fn from_database(config: &Config, db: Database) -> Self {
        let factory = Arc::new(HttpBackendFactory::new(config.providers.request_timeout));
        Self::new(
            config,
            ServiceStores::shared(Arc::new(db)),
            factory,
            PromptLibrary::new(),
            Arc::new(SystemClock),
        )
    }

    pub async fn classify(&self, text: &str, context: &ClassifyContext) -> Classification {
        self.classifier.classify(text, context).await
    }

    /// Force the food index and provider configs to reload on next use
    pub fn reload(&self) {
        self.index.invalidate();
        self.router.invalidate();
        self.prompts.clear_cache();
    }

    pub fn usage_counters(&self) -> UsageCounters {
        self.usage.counters()
    }

    /// Wait until every queued usage event has been written
    pub async fn flush(&self) {
        self.usage.flush().await;
    }

    /// Drain the usage queue and stop the worker
    pub async fn shutdown(&self) {
        self.flush().await;
        let handle = self.worker.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            handle.abort();
        }
        let counters = self.usage.counters();
        info!(
            processed = counters.processed,
            dropped = counters.dropped,
            failed = counters.failed,
            "Usage worker stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackendFactory;
    use crate::food::seed_foods;
    use crate::models::{ProviderConfig, ProviderKind};
    use crate::store::MemoryStore;

    fn services(store: Arc<MemoryStore>, factory: MockBackendFactory) -> Services {
        let config = Config::embedded().unwrap();
        Services::new(
            &config,
            ServiceStores::shared(store),
            Arc::new(factory),
            PromptLibrary::embedded_only(),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn test_llm_path_books_usage() {
        let store = Arc::new(MemoryStore::with_foods(seed_foods()));
        store.add_provider(ProviderConfig::new(1, ProviderKind::Mock, "mock-model", 1));
        let services = services(store.clone(), MockBackendFactory::new());

        let result = services
            .classify("ran 5k this morning", &ClassifyContext::default())
            .await;
        assert!(!result.degraded);
        assert_eq!(result.provider.as_deref(), Some("mock"));

        services.shutdown().await;
        assert_eq!(store.provider(1).unwrap().quota_used, 42);
        assert_eq!(store.usage_logs().len(), 1);
        assert_eq!(services.usage_counters().processed, 2);
    }

    #[tokio::test]
    async fn test_reload_picks_up_new_foods() {
        let store = Arc::new(MemoryStore::with_foods(seed_foods()));
        let services = services(store.clone(), MockBackendFactory::new());

        assert!(!services.index.lookup("kale chips").await.matched);

        let mut kale = seed_foods()[0].clone();
        kale.canonical_name = "kale_chips".to_string();
        kale.display_name = "Kale Chips".to_string();
        kale.aliases = vec!["kale chips".to_string()];
        store.add_food(kale);

        services.reload();
        assert!(services.index.lookup("kale chips").await.matched);
        services.shutdown().await;
    }
}
