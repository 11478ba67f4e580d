//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Macrolog - Log meals and workouts in plain language
#[derive(Parser)]
#[command(name = "macrolog")]
#[command(about = "Cache-first nutrition logger with multi-provider LLM fallback", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "macrolog.db", global = true)]
    pub db: PathBuf,

    /// Config file (defaults to the data dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed common foods
    Init,

    /// Classify a free-form log statement
    Classify {
        /// What you ate or did, e.g. "2 eggs for breakfast"
        text: String,

        /// Provider to try first (openai, gemini, groq)
        #[arg(short, long)]
        provider: Option<String>,

        /// User id recorded on usage logs
        #[arg(short, long)]
        user: Option<String>,

        /// Skip the food cache and let the LLM extract every item
        #[arg(long)]
        llm: bool,

        /// Local time of the entry ("YYYY-MM-DD HH:MM"), used for meal type
        #[arg(long)]
        at: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up a food phrase in the cache without calling any provider
    Match {
        /// Food phrase, optionally with quantity and unit ("250g chicken breast")
        phrase: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage food records
    Foods {
        #[command(subcommand)]
        action: Option<FoodsAction>,
    },

    /// Manage LLM provider configurations
    Providers {
        #[command(subcommand)]
        action: Option<ProvidersAction>,
    },

    /// Show LLM usage and cost
    Usage {
        /// Number of recent calls to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum FoodsAction {
    /// List foods, most used first
    List {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show unverified foods that need an admin look
    Review {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Mark a food record as verified
    Verify {
        /// Canonical name, e.g. egg_large_boiled
        name: String,

        /// Who is verifying, recorded in the food's history
        #[arg(long, default_value = "admin")]
        by: String,
    },

    /// Soft-delete a food record
    Delete {
        /// Canonical name, e.g. egg_large_boiled
        name: String,

        /// Who is deleting, recorded in the food's history
        #[arg(long, default_value = "admin")]
        by: String,

        /// Why the record is being removed
        #[arg(long)]
        reason: Option<String>,
    },

    /// Show the change history of a food record
    History {
        /// Canonical name, e.g. egg_large_boiled
        name: String,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum ProvidersAction {
    /// List configured providers with quota usage
    List,

    /// Add a provider configuration
    Add {
        /// Provider: openai, gemini, groq
        provider: String,

        /// Model name, e.g. gpt-4o-mini
        model: String,

        /// API key (defaults to OPENAI_API_KEY / GEMINI_API_KEY / GROQ_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Priority (1 is tried first)
        #[arg(long, default_value = "1")]
        priority: i32,

        /// Token quota for the period (unlimited if not set)
        #[arg(long)]
        quota: Option<u64>,

        /// Cost in USD per 1000 tokens
        #[arg(long)]
        cost: Option<f64>,

        /// Override the vendor base URL
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Enable a provider
    Enable {
        /// Provider config id
        id: i64,
    },

    /// Disable a provider
    Disable {
        /// Provider config id
        id: i64,
    },

    /// Zero a provider's token counter at the start of a billing period
    ResetQuota {
        /// Provider config id
        id: i64,
    },
}
