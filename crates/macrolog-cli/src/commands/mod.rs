//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, load_config)
//! - `classify` - Classify and match commands
//! - `foods` - Food record management (list, review, verify, delete)
//! - `providers` - Provider config management (list, add, enable, disable)
//! - `usage` - Usage and cost report

pub mod classify;
pub mod core;
pub mod foods;
pub mod providers;
pub mod usage;

// Re-export command functions for main.rs
pub use classify::*;
pub use core::*;
pub use foods::*;
pub use providers::*;
pub use usage::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format an optional number with one decimal, or "-" when missing
pub fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string())
}
