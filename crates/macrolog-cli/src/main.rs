//! Macrolog CLI - Plain-language nutrition logging
//!
//! Usage:
//!   macrolog init                          Initialize database and seed foods
//!   macrolog classify "2 eggs"             Classify a log statement
//!   macrolog match "250g chicken breast"   Cache lookup only
//!   macrolog providers add openai gpt-4o-mini

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Classify {
            text,
            provider,
            user,
            llm,
            at,
            json,
        } => {
            let db = commands::open_db(&cli.db)?;
            let config = commands::load_config(cli.config.as_deref())?;
            let options = commands::ClassifyOptions {
                provider,
                user,
                llm,
                at,
                json,
            };
            commands::cmd_classify(&db, &config, &text, &options).await
        }
        Commands::Match { phrase, json } => {
            let db = commands::open_db(&cli.db)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_match(&db, &config, &phrase, json).await
        }
        Commands::Foods { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_foods_list(&db, 20),
                Some(FoodsAction::List { limit }) => commands::cmd_foods_list(&db, limit),
                Some(FoodsAction::Review { limit }) => commands::cmd_foods_review(&db, limit),
                Some(FoodsAction::Verify { name, by }) => commands::cmd_foods_verify(&db, &name, &by),
                Some(FoodsAction::Delete { name, by, reason }) => {
                    commands::cmd_foods_delete(&db, &name, &by, reason.as_deref())
                }
                Some(FoodsAction::History { name, limit }) => {
                    commands::cmd_foods_history(&db, &name, limit)
                }
            }
        }
        Commands::Providers { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(ProvidersAction::List) => commands::cmd_providers_list(&db),
                Some(ProvidersAction::Add {
                    provider,
                    model,
                    api_key,
                    priority,
                    quota,
                    cost,
                    base_url,
                }) => commands::cmd_providers_add(
                    &db,
                    &commands::NewProvider {
                        provider,
                        model,
                        api_key,
                        priority,
                        quota,
                        cost,
                        base_url,
                    },
                )
                .map(|_| ()),
                Some(ProvidersAction::Enable { id }) => commands::cmd_providers_set_active(&db, id, true),
                Some(ProvidersAction::Disable { id }) => {
                    commands::cmd_providers_set_active(&db, id, false)
                }
                Some(ProvidersAction::ResetQuota { id }) => {
                    commands::cmd_providers_reset_quota(&db, id)
                }
            }
        }
        Commands::Usage { limit } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_usage(&db, limit)
        }
    }
}
