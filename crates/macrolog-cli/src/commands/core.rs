//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Resolve the service config
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use macrolog_core::config::Config;
use macrolog_core::db::Database;
use macrolog_core::food::seed_foods;

pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    Database::new(path_str).context("Failed to open database")
}

/// Explicit `--config` path, else the data dir override, else built-in defaults
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load().context("Failed to load config"),
    }
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;

    let seeds = seed_foods();
    let inserted = db.seed_foods(&seeds).context("Failed to seed foods")?;
    println!(
        "   Seeded {} foods ({} already present)",
        inserted,
        seeds.len() - inserted
    );

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add a provider: macrolog providers add openai gpt-4o-mini --api-key sk-...");
    println!("  2. Log something:  macrolog classify \"2 eggs and toast\"");

    Ok(())
}
