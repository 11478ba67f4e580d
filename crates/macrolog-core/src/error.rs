//! Error types for Macrolog

use std::fmt;

use thiserror::Error;

/// Coarse classification of a provider failure
///
/// Every vendor failure is normalized into `Error::Provider` with one of
/// these kinds; the router treats them all the same (try the next provider).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    /// Connection, DNS, timeout, or unexpected HTTP status
    Transport,
    /// Rejected credentials (401/403)
    Auth,
    /// Vendor rate limit (429)
    RateLimit,
    /// Vendor-side quota or billing exhaustion
    Quota,
    /// Response blocked by a safety filter
    Safety,
    /// Response arrived but had no usable content
    InvalidResponse,
}

impl ProviderFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Auth => "auth",
            Self::RateLimit => "rate_limit",
            Self::Quota => "quota",
            Self::Safety => "safety",
            Self::InvalidResponse => "invalid_response",
        }
    }

    /// Classify an HTTP error status and body
    pub fn from_status(status: u16, body: &str) -> Self {
        let lower = body.to_lowercase();
        match status {
            401 | 403 => Self::Auth,
            429 if lower.contains("quota") || lower.contains("billing") => Self::Quota,
            429 => Self::RateLimit,
            _ if lower.contains("quota") => Self::Quota,
            _ if lower.contains("safety") || lower.contains("content_filter") => Self::Safety,
            _ => Self::Transport,
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{provider} {kind} error: {message}")]
    Provider {
        provider: String,
        kind: ProviderFailure,
        message: String,
    },

    #[error("No usable LLM providers (all inactive or quota exceeded)")]
    NoUsableProviders,

    #[error("All LLM providers failed. Tried {attempts} provider(s). Last error: {last_error}")]
    AllProvidersFailed { attempts: usize, last_error: String },

    #[error("Malformed LLM response: {0}")]
    MalformedResponse(String),
}

impl Error {
    /// Build a normalized provider error
    pub fn provider(
        provider: impl Into<String>,
        kind: ProviderFailure,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_from_status() {
        assert_eq!(ProviderFailure::from_status(401, ""), ProviderFailure::Auth);
        assert_eq!(
            ProviderFailure::from_status(429, "Rate limit reached"),
            ProviderFailure::RateLimit
        );
        assert_eq!(
            ProviderFailure::from_status(429, "You exceeded your current quota"),
            ProviderFailure::Quota
        );
        assert_eq!(
            ProviderFailure::from_status(500, "internal"),
            ProviderFailure::Transport
        );
    }

    #[test]
    fn test_all_failed_message() {
        let err = Error::AllProvidersFailed {
            attempts: 2,
            last_error: "groq rate_limit error: slow down".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Tried 2 provider(s)"));
        assert!(msg.contains("slow down"));
    }
}
