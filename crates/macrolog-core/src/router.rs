//! Multi-provider LLM routing
//!
//! Loads provider configs (TTL-cached), keeps the usable ones, orders them by
//! priority with an optional preferred vendor first, then tries them one at a
//! time until one answers. Quota and usage bookkeeping is handed to the
//! [`UsageRecorder`] and never blocks the caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::ai::{
    AIBackend, AIClient, BackendFactory, Generation, GenerationRequest, RouteOptions,
    RoutedGeneration,
};
use crate::cache::{CacheEntry, Clock};
use crate::config::ProvidersConfig;
use crate::error::{Error, Result};
use crate::models::{ProviderConfig, ProviderKind, QuotaStatus, UsageLogEntry};
use crate::store::ProviderConfigStore;
use crate::usage::UsageRecorder;

const DEFAULT_REQUEST_TYPE: &str = "general";

/// A cached provider config with a locally tracked quota counter
///
/// The counter starts at the stored `quota_used` and is bumped on every
/// success, so quota stays monotonic between refreshes even though the
/// persistent increment happens later on the usage worker.
#[derive(Debug)]
struct CachedProvider {
    config: ProviderConfig,
    quota_used: AtomicU64,
}

impl CachedProvider {
    fn new(config: ProviderConfig) -> Self {
        let quota_used = AtomicU64::new(config.quota_used);
        Self { config, quota_used }
    }

    /// The config with the live quota counter applied
    fn current(&self) -> ProviderConfig {
        let mut config = self.config.clone();
        config.quota_used = self.quota_used.load(Ordering::SeqCst);
        config
    }
}

type ProviderSnapshot = Arc<Vec<Arc<CachedProvider>>>;

pub struct ProviderRouter {
    store: Arc<dyn ProviderConfigStore>,
    factory: Arc<dyn BackendFactory>,
    usage: UsageRecorder,
    clock: Arc<dyn Clock>,
    settings: ProvidersConfig,
    providers: RwLock<Option<CacheEntry<ProviderSnapshot>>>,
    adapters: RwLock<HashMap<i64, AIClient>>,
}

impl ProviderRouter {
    pub fn new(
        store: Arc<dyn ProviderConfigStore>,
        factory: Arc<dyn BackendFactory>,
        usage: UsageRecorder,
        clock: Arc<dyn Clock>,
        settings: ProvidersConfig,
    ) -> Self {
        Self {
            store,
            factory,
            usage,
            clock,
            settings,
            providers: RwLock::new(None),
            adapters: RwLock::new(HashMap::new()),
        }
    }

    pub fn usage(&self) -> &UsageRecorder {
        &self.usage
    }

    /// Drop cached configs and adapters; the next call reloads
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.providers.write() {
            *guard = None;
        }
        if let Ok(mut adapters) = self.adapters.write() {
            adapters.clear();
        }
    }

    async fn snapshot(&self) -> Result<ProviderSnapshot> {
        let now = self.clock.now();
        let cached = self.providers.read().ok().and_then(|guard| {
            guard.as_ref().map(|entry| {
                (
                    Arc::clone(&entry.value),
                    entry.is_stale(now, self.settings.config_ttl),
                )
            })
        });

        match cached {
            Some((snapshot, false)) => Ok(snapshot),
            Some((previous, true)) => match self.reload().await {
                Ok(snapshot) => Ok(snapshot),
                Err(e) => {
                    warn!("Failed to reload provider configs, keeping cached set: {}", e);
                    Ok(previous)
                }
            },
            None => self.reload().await,
        }
    }

    async fn reload(&self) -> Result<ProviderSnapshot> {
        let configs = self.store.load_provider_configs().await?;
        let snapshot: ProviderSnapshot = Arc::new(
            configs
                .into_iter()
                .map(|c| Arc::new(CachedProvider::new(c)))
                .collect(),
        );
        info!(providers = snapshot.len(), "Provider configs loaded");

        if let Ok(mut guard) = self.providers.write() {
            *guard = Some(CacheEntry::new(Arc::clone(&snapshot), self.clock.now()));
        }
        if let Ok(mut adapters) = self.adapters.write() {
            adapters.clear();
        }
        Ok(snapshot)
    }

    /// Usable providers in the order they would be tried
    pub async fn ordered_providers(
        &self,
        preferred: Option<ProviderKind>,
    ) -> Result<Vec<ProviderConfig>> {
        Ok(self
            .ordered(preferred)
            .await?
            .iter()
            .map(|p| p.current())
            .collect())
    }

    async fn ordered(&self, preferred: Option<ProviderKind>) -> Result<Vec<Arc<CachedProvider>>> {
        let snapshot = self.snapshot().await?;
        let mut usable: Vec<Arc<CachedProvider>> = snapshot
            .iter()
            .filter(|p| p.current().is_usable())
            .cloned()
            .collect();

        // stable: equal priorities keep insertion order
        usable.sort_by_key(|p| p.config.priority);

        if let Some(kind) = preferred {
            if let Some(pos) = usable.iter().position(|p| p.config.provider == kind) {
                let first = usable.remove(pos);
                usable.insert(0, first);
            }
        }
        Ok(usable)
    }

    fn adapter(&self, config: &ProviderConfig) -> Result<AIClient> {
        if let Some(client) = self
            .adapters
            .read()
            .ok()
            .and_then(|adapters| adapters.get(&config.id).cloned())
        {
            return Ok(client);
        }

        let client = self.factory.create(config)?;
        if let Ok(mut adapters) = self.adapters.write() {
            adapters.insert(config.id, client.clone());
        }
        Ok(client)
    }

    /// Run a request against the providers in order until one succeeds
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        options: &RouteOptions,
    ) -> Result<RoutedGeneration> {
        let candidates = self.ordered(options.preferred_provider).await?;
        if candidates.is_empty() {
            warn!("No usable LLM providers");
            return Err(Error::NoUsableProviders);
        }

        let mut attempts = 0;
        let mut last_error: Option<String> = None;

        for (index, provider) in candidates.iter().enumerate() {
            let config = provider.current();

            let adapter = match self.adapter(&config) {
                Ok(adapter) => adapter,
                Err(e) => {
                    warn!(provider = %config.provider, config_id = config.id, "Failed to build adapter: {}", e);
                    attempts += 1;
                    last_error = Some(e.to_string());
                    continue;
                }
            };

            if self.settings.strict_quota_precheck {
                let estimate = adapter.estimate_tokens(&request.prompt_text()) as u64;
                if config.remaining_quota().is_some_and(|left| left < estimate) {
                    debug!(
                        provider = %config.provider,
                        config_id = config.id,
                        estimate,
                        "Skipping provider: estimated prompt exceeds remaining quota"
                    );
                    continue;
                }
            }

            attempts += 1;
            let started = Instant::now();
            match adapter.generate(request).await {
                Ok(generation) => {
                    let tokens = generation.tokens_used as u64;
                    provider.quota_used.fetch_add(tokens, Ordering::SeqCst);
                    self.usage.record_quota(config.id, tokens);
                    self.usage
                        .record_usage(self.success_entry(&config, &generation, options));

                    info!(
                        provider = %config.provider,
                        model = %generation.model_used,
                        tokens,
                        latency_ms = generation.latency_ms,
                        attempt = attempts,
                        "LLM request succeeded"
                    );

                    return Ok(RoutedGeneration {
                        generation,
                        provider: config.provider,
                        config_id: config.id,
                        fallback_used: index > 0,
                        attempts,
                    });
                }
                Err(e) => {
                    warn!(
                        provider = %config.provider,
                        config_id = config.id,
                        "LLM provider failed, trying next: {}",
                        e
                    );
                    let latency_ms = started.elapsed().as_millis() as u64;
                    self.usage
                        .record_usage(self.failure_entry(&config, &e, latency_ms, options));
                    last_error = Some(e.to_string());
                }
            }
        }

        match last_error {
            Some(last_error) => Err(Error::AllProvidersFailed {
                attempts,
                last_error,
            }),
            None => Err(Error::NoUsableProviders),
        }
    }

    fn success_entry(
        &self,
        config: &ProviderConfig,
        generation: &Generation,
        options: &RouteOptions,
    ) -> UsageLogEntry {
        UsageLogEntry {
            config_id: Some(config.id),
            provider: config.provider.as_str().to_string(),
            model: generation.model_used.clone(),
            user_id: options.user_id.clone(),
            request_type: request_type(options),
            prompt_tokens: generation.prompt_tokens,
            completion_tokens: generation.completion_tokens,
            total_tokens: generation.tokens_used,
            latency_ms: generation.latency_ms,
            cost_usd: config.cost_for(generation.tokens_used as u64),
            success: true,
            error: None,
            created_at: self.clock.now(),
        }
    }

    fn failure_entry(
        &self,
        config: &ProviderConfig,
        error: &Error,
        latency_ms: u64,
        options: &RouteOptions,
    ) -> UsageLogEntry {
        UsageLogEntry {
            config_id: Some(config.id),
            provider: config.provider.as_str().to_string(),
            model: config.model.clone(),
            user_id: options.user_id.clone(),
            request_type: request_type(options),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            latency_ms,
            cost_usd: None,
            success: false,
            error: Some(error.to_string()),
            created_at: self.clock.now(),
        }
    }

    /// Quota status for every configured provider, usable or not
    pub async fn quota_status(&self) -> Result<Vec<QuotaStatus>> {
        Ok(self
            .snapshot()
            .await?
            .iter()
            .map(|p| p.current().quota_status())
            .collect())
    }
}

fn request_type(options: &RouteOptions) -> String {
    options
        .request_type
        .clone()
        .unwrap_or_else(|| DEFAULT_REQUEST_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackendFactory;
    use crate::cache::ManualClock;
    use crate::error::ProviderFailure;
    use crate::store::MemoryStore;
    use crate::usage::UsageWorker;
    use std::time::Duration;

    struct Harness {
        store: Arc<MemoryStore>,
        factory: MockBackendFactory,
        clock: ManualClock,
        router: ProviderRouter,
        _worker: tokio::task::JoinHandle<()>,
    }

    fn harness(configs: Vec<ProviderConfig>, settings: ProvidersConfig) -> Harness {
        let store = Arc::new(MemoryStore::new());
        for config in configs {
            store.add_provider(config);
        }
        let factory = MockBackendFactory::new();
        let clock = ManualClock::default();
        let (recorder, worker): (UsageRecorder, UsageWorker) = UsageRecorder::new(64);
        let handle = worker.spawn(store.clone());
        let router = ProviderRouter::new(
            store.clone(),
            Arc::new(factory.clone()),
            recorder,
            Arc::new(clock.clone()),
            settings,
        );
        Harness {
            store,
            factory,
            clock,
            router,
            _worker: handle,
        }
    }

    fn config(id: i64, kind: ProviderKind, priority: i32) -> ProviderConfig {
        ProviderConfig::new(id, kind, &format!("{}-model", kind), priority)
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("system", "dragon fruit smoothie").json()
    }

    #[tokio::test]
    async fn test_orders_by_priority_with_stable_ties() {
        let h = harness(
            vec![
                config(1, ProviderKind::Groq, 2),
                config(2, ProviderKind::OpenAI, 1),
                config(3, ProviderKind::Gemini, 2),
            ],
            ProvidersConfig::default(),
        );
        let order: Vec<i64> = h
            .router
            .ordered_providers(None)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[tokio::test]
    async fn test_preferred_provider_goes_first() {
        let h = harness(
            vec![
                config(1, ProviderKind::Gemini, 1),
                config(2, ProviderKind::Groq, 2),
            ],
            ProvidersConfig::default(),
        );
        let options = RouteOptions {
            preferred_provider: Some(ProviderKind::Groq),
            ..Default::default()
        };
        let routed = h.router.generate(&request(), &options).await.unwrap();
        assert_eq!(routed.provider, ProviderKind::Groq);
        assert_eq!(routed.config_id, 2);
        assert!(!routed.fallback_used);
        assert_eq!(h.factory.backend(1).map(|b| b.call_count()).unwrap_or(0), 0);
    }

    #[tokio::test]
    async fn test_unusable_preferred_is_ignored() {
        let mut groq = config(2, ProviderKind::Groq, 2);
        groq.is_active = false;
        let h = harness(vec![config(1, ProviderKind::Gemini, 1), groq], ProvidersConfig::default());
        let options = RouteOptions {
            preferred_provider: Some(ProviderKind::Groq),
            ..Default::default()
        };
        let routed = h.router.generate(&request(), &options).await.unwrap();
        assert_eq!(routed.provider, ProviderKind::Gemini);
    }

    #[tokio::test]
    async fn test_fallback_on_failure() {
        let h = harness(
            vec![
                config(1, ProviderKind::Gemini, 1),
                config(2, ProviderKind::Groq, 2),
            ],
            ProvidersConfig::default(),
        );
        h.factory.insert(
            1,
            crate::ai::MockBackend::failing(ProviderFailure::RateLimit).as_provider(ProviderKind::Gemini),
        );

        let routed = h.router.generate(&request(), &RouteOptions::default()).await.unwrap();
        assert_eq!(routed.provider, ProviderKind::Groq);
        assert!(routed.fallback_used);
        assert_eq!(routed.attempts, 2);

        h.router.usage().flush().await;
        let logs = h.store.usage_logs();
        assert_eq!(logs.len(), 2);
        assert!(!logs[0].success);
        assert!(logs[0].error.as_deref().unwrap_or("").contains("rate_limit"));
        assert_eq!(logs[0].total_tokens, 0);
        assert!(logs[1].success);
        assert_eq!(h.store.provider(1).unwrap().quota_used, 0);
        assert_eq!(h.store.provider(2).unwrap().quota_used, 42);
    }

    #[tokio::test]
    async fn test_all_failed_reports_attempts() {
        let h = harness(
            vec![
                config(1, ProviderKind::Gemini, 1),
                config(2, ProviderKind::Groq, 2),
            ],
            ProvidersConfig::default(),
        );
        h.factory
            .insert(1, crate::ai::MockBackend::failing(ProviderFailure::Transport));
        h.factory
            .insert(2, crate::ai::MockBackend::failing(ProviderFailure::Safety));

        let err = h
            .router
            .generate(&request(), &RouteOptions::default())
            .await
            .unwrap_err();
        match err {
            Error::AllProvidersFailed {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("safety"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_no_usable_providers_fails_fast() {
        let mut inactive = config(1, ProviderKind::Gemini, 1);
        inactive.is_active = false;
        let mut exhausted = config(2, ProviderKind::Groq, 2);
        exhausted.quota_limit = Some(100);
        exhausted.quota_used = 100;
        let h = harness(vec![inactive, exhausted], ProvidersConfig::default());

        let err = h
            .router
            .generate(&request(), &RouteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoUsableProviders));
        assert_eq!(h.factory.created_count(), 0);
    }

    #[tokio::test]
    async fn test_quota_is_monotonic_and_flips_usable() {
        let mut limited = config(1, ProviderKind::Gemini, 1);
        limited.quota_limit = Some(80);
        let h = harness(
            vec![limited, config(2, ProviderKind::Groq, 2)],
            ProvidersConfig::default(),
        );

        let mut previous = 0;
        let first = h.router.generate(&request(), &RouteOptions::default()).await.unwrap();
        assert_eq!(first.config_id, 1);
        let used = h.router.quota_status().await.unwrap()[0].used;
        assert!(used >= previous);
        previous = used;

        // 42 + 42 crosses the limit of 80
        let second = h.router.generate(&request(), &RouteOptions::default()).await.unwrap();
        assert_eq!(second.config_id, 1);
        let status = &h.router.quota_status().await.unwrap()[0];
        assert!(status.used >= previous);
        assert!(status.exceeded);

        let third = h.router.generate(&request(), &RouteOptions::default()).await.unwrap();
        assert_eq!(third.config_id, 2);
        assert!(!third.fallback_used);
    }

    #[tokio::test]
    async fn test_configs_cached_until_ttl() {
        let h = harness(vec![config(1, ProviderKind::Gemini, 1)], ProvidersConfig::default());

        h.router.ordered_providers(None).await.unwrap();
        h.router.ordered_providers(None).await.unwrap();
        assert_eq!(h.store.config_load_count(), 1);

        h.clock.advance(Duration::from_secs(299));
        h.router.ordered_providers(None).await.unwrap();
        assert_eq!(h.store.config_load_count(), 1);

        h.clock.advance(Duration::from_secs(1));
        h.router.ordered_providers(None).await.unwrap();
        assert_eq!(h.store.config_load_count(), 2);

        h.router.invalidate();
        h.router.ordered_providers(None).await.unwrap();
        assert_eq!(h.store.config_load_count(), 3);
    }

    #[tokio::test]
    async fn test_store_outage_keeps_previous_configs() {
        let h = harness(vec![config(1, ProviderKind::Gemini, 1)], ProvidersConfig::default());
        h.router.ordered_providers(None).await.unwrap();

        h.store.set_fail_loads(true);
        h.clock.advance(Duration::from_secs(600));
        let order = h.router.ordered_providers(None).await.unwrap();
        assert_eq!(order.len(), 1);
    }

    #[tokio::test]
    async fn test_store_outage_without_cache_is_error() {
        let h = harness(vec![config(1, ProviderKind::Gemini, 1)], ProvidersConfig::default());
        h.store.set_fail_loads(true);
        assert!(h
            .router
            .generate(&request(), &RouteOptions::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_adapters_are_reused() {
        let h = harness(vec![config(1, ProviderKind::Gemini, 1)], ProvidersConfig::default());
        for _ in 0..3 {
            h.router.generate(&request(), &RouteOptions::default()).await.unwrap();
        }
        assert_eq!(h.factory.created_count(), 1);
        assert_eq!(h.factory.backend(1).unwrap().call_count(), 3);
    }

    #[tokio::test]
    async fn test_strict_precheck_skips_low_quota() {
        let mut tight = config(1, ProviderKind::Gemini, 1);
        tight.quota_limit = Some(2);
        let settings = ProvidersConfig {
            strict_quota_precheck: true,
            ..Default::default()
        };
        let h = harness(vec![tight, config(2, ProviderKind::Groq, 2)], settings);

        let routed = h.router.generate(&request(), &RouteOptions::default()).await.unwrap();
        assert_eq!(routed.config_id, 2);
        assert_eq!(routed.attempts, 1);
        assert_eq!(h.factory.backend(1).unwrap().call_count(), 0);
    }

    #[tokio::test]
    async fn test_usage_entry_carries_cost_and_user() {
        let mut priced = config(1, ProviderKind::OpenAI, 1);
        priced.cost_per_1k_tokens = Some(0.5);
        let h = harness(vec![priced], ProvidersConfig::default());
        let options = RouteOptions {
            user_id: Some("user-1".to_string()),
            request_type: Some("classify".to_string()),
            ..Default::default()
        };
        h.router.generate(&request(), &options).await.unwrap();
        h.router.usage().flush().await;

        let logs = h.store.usage_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].user_id.as_deref(), Some("user-1"));
        assert_eq!(logs[0].request_type, "classify");
        assert!((logs[0].cost_usd.unwrap() - 0.021).abs() < 1e-9);
    }
}
