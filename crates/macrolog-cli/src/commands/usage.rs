//! Usage report command

use anyhow::{Context, Result};
use macrolog_core::db::Database;

use super::truncate;

pub fn cmd_usage(db: &Database, limit: usize) -> Result<()> {
    let stats = db.usage_stats().context("Failed to load usage stats")?;

    if stats.is_empty() {
        println!("No LLM usage recorded yet.");
        return Ok(());
    }

    println!();
    println!("📊 LLM Usage by Provider");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:<8} {:>8} {:>8} {:>8} {:>10} {:>10} {:>10}",
        "PROVIDER", "CALLS", "OK", "FAILED", "TOKENS", "COST", "AVG MS"
    );
    let mut total_cost = 0.0;
    for s in &stats {
        total_cost += s.total_cost_usd;
        println!(
            "   {:<8} {:>8} {:>8} {:>8} {:>10} {:>10} {:>10.0}",
            s.provider,
            s.requests,
            s.successes,
            s.failures,
            s.total_tokens,
            format!("${:.4}", s.total_cost_usd),
            s.avg_latency_ms
        );
    }
    println!("   Total cost: ${:.4}", total_cost);

    let logs = db
        .list_usage_logs(limit)
        .context("Failed to load usage logs")?;
    println!();
    println!("🕒 Recent calls");
    for log in &logs {
        let outcome = if log.success {
            format!("{} tokens", log.total_tokens)
        } else {
            format!(
                "failed: {}",
                truncate(log.error.as_deref().unwrap_or("unknown error"), 40)
            )
        };
        println!(
            "   {} {:<8} {:<24} {:>6}ms  {}",
            log.created_at.format("%Y-%m-%d %H:%M"),
            log.provider,
            truncate(&log.model, 24),
            log.latency_ms,
            outcome
        );
    }

    Ok(())
}
