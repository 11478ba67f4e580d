//! Provider config command implementations

use anyhow::{bail, Context, Result};
use macrolog_core::db::Database;
use macrolog_core::models::{ProviderConfig, ProviderKind};

use super::truncate;

/// Arguments for `macrolog providers add`
#[derive(Debug, Clone)]
pub struct NewProvider {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub priority: i32,
    pub quota: Option<u64>,
    pub cost: Option<f64>,
    pub base_url: Option<String>,
}

/// Environment variable consulted when no key is passed
pub fn api_key_env(kind: ProviderKind) -> Option<&'static str> {
    match kind {
        ProviderKind::OpenAI => Some("OPENAI_API_KEY"),
        ProviderKind::Gemini => Some("GEMINI_API_KEY"),
        ProviderKind::Groq => Some("GROQ_API_KEY"),
        ProviderKind::Mock => None,
    }
}

pub fn cmd_providers_list(db: &Database) -> Result<()> {
    let providers = db.list_providers().context("Failed to list providers")?;

    if providers.is_empty() {
        println!("No providers configured.");
        println!("Add one with: macrolog providers add openai gpt-4o-mini --api-key sk-...");
        return Ok(());
    }

    println!();
    println!("🤖 LLM Providers");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:>4} {:<8} {:<26} {:>4} {:<8} {:>20}",
        "ID", "PROVIDER", "MODEL", "PRI", "STATUS", "QUOTA"
    );
    for provider in &providers {
        let status = provider.quota_status();
        let state = if !provider.is_active {
            "disabled"
        } else if status.exceeded {
            "quota"
        } else {
            "active"
        };
        let quota = match status.limit {
            Some(limit) => format!("{}/{} ({:.0}%)", status.used, limit, status.percentage),
            None => format!("{}/∞", status.used),
        };
        println!(
            "   {:>4} {:<8} {:<26} {:>4} {:<8} {:>20}",
            provider.id,
            provider.provider.as_str(),
            truncate(&provider.model, 26),
            provider.priority,
            state,
            quota
        );
    }
    Ok(())
}

/// Add a provider config; returns its id
pub fn cmd_providers_add(db: &Database, new: &NewProvider) -> Result<i64> {
    let kind: ProviderKind = new.provider.parse().map_err(anyhow::Error::msg)?;
    if kind == ProviderKind::Mock {
        bail!("The mock provider is test-only and cannot be stored");
    }
    if new.model.trim().is_empty() {
        bail!("Model name is required");
    }

    let api_key = match new.api_key.clone() {
        Some(key) => key,
        None => api_key_env(kind)
            .and_then(|var| std::env::var(var).ok())
            .unwrap_or_default(),
    };
    if api_key.is_empty() {
        let hint = api_key_env(kind).unwrap_or("the provider's API key variable");
        bail!("No API key for {}. Pass --api-key or set {}", kind, hint);
    }

    let mut config = ProviderConfig::new(0, kind, new.model.trim(), new.priority);
    config.api_key = api_key;
    config.quota_limit = new.quota;
    config.cost_per_1k_tokens = new.cost;
    config.base_url = new.base_url.clone();

    let id = db
        .insert_provider(&config)
        .context("Failed to add provider")?;
    println!(
        "✅ Added {} provider '{}' (id: {}, priority: {})",
        kind, config.model, id, config.priority
    );
    Ok(id)
}

pub fn cmd_providers_set_active(db: &Database, id: i64, active: bool) -> Result<()> {
    db.set_provider_active(id, active)
        .with_context(|| format!("Failed to update provider {}", id))?;
    if active {
        println!("✅ Enabled provider {}", id);
    } else {
        println!("⏸️  Disabled provider {}", id);
    }
    Ok(())
}

pub fn cmd_providers_reset_quota(db: &Database, id: i64) -> Result<()> {
    let before = db
        .get_provider(id)
        .with_context(|| format!("Failed to load provider {}", id))?
        .with_context(|| format!("Provider {} not found", id))?;
    db.reset_provider_quota(id)
        .with_context(|| format!("Failed to reset quota for provider {}", id))?;
    println!(
        "🔄 Reset quota for provider {} ({} tokens cleared)",
        id, before.quota_used
    );
    Ok(())
}
