//! Per-key minimum-interval tracker for rate-limited user actions.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct Cooldown {
    interval: Duration,
    last: Mutex<HashMap<String, Instant>>,
}

impl Cooldown {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt for `key` if the interval has elapsed. Keys whose
    /// interval has passed are dropped on every call.
    ///
    /// Returns `Err(remaining)` while the key is still cooling down.
    pub fn try_acquire(&self, key: &str) -> Result<(), Duration> {
        self.try_acquire_at(key, Instant::now())
    }

    fn try_acquire_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.retain(|_, prev| now.saturating_duration_since(*prev) < self.interval);
        if let Some(prev) = last.get(key) {
            let elapsed = now.saturating_duration_since(*prev);
            if elapsed < self.interval {
                return Err(self.interval - elapsed);
            }
        }
        last.insert(key.to_string(), now);
        Ok(())
    }

    /// Forget `key`, e.g. after the guarded request failed.
    pub fn reset(&self, key: &str) {
        self.last
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}
