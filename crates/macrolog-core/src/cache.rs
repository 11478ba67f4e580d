//! TTL cache entries and an injectable clock
//!
//! Both the food index and the provider-config cache are whole snapshots that
//! get replaced when stale. Staleness is a pure function of the load time, the
//! current time and the TTL so tests can drive expiry with `ManualClock`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to (for tests)
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

/// A cached value and when it was loaded
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub loaded_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, loaded_at: DateTime<Utc>) -> Self {
        Self { value, loaded_at }
    }

    /// True once `ttl` has fully elapsed since the load
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(self.loaded_at);
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => age >= ttl,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_stale_boundary() {
        let start = Utc::now();
        let entry = CacheEntry::new(42, start);
        let ttl = Duration::from_secs(300);

        assert!(!entry.is_stale(start, ttl));
        assert!(!entry.is_stale(start + chrono::Duration::seconds(299), ttl));
        assert!(entry.is_stale(start + chrono::Duration::seconds(300), ttl));
    }

    #[test]
    fn test_manual_clock_advance() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        clock.advance(Duration::from_secs(60));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(60));

        let shared = clock.clone();
        shared.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(61));
    }
}
