use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// In-memory rate limiter keyed by (bucket, ip_hash).
/// Each bucket ("login", "concierge") has its own max attempts and window.
pub struct RateLimiter {
    entries: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        RateLimiter {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Instant>>> {
        // A panic while holding the lock leaves the map usable
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an attempt and return true if it is still under the limit.
    /// `key` looks like "login:<ip_hash>" or "concierge:<ip_hash>".
    pub fn check_and_record(&self, key: &str, max_attempts: u64, window: Duration) -> bool {
        let mut map = self.lock();
        let now = Instant::now();

        let attempts = map.entry(key.to_string()).or_default();
        attempts.retain(|t| now.duration_since(*t) < window);

        if (attempts.len() as u64) < max_attempts {
            attempts.push(now);
            true
        } else {
            false
        }
    }

    /// Forget a key, e.g. after a successful login.
    pub fn reset(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drop stale entries. Called from the background task loop.
    pub fn cleanup(&self, max_age: Duration) {
        let mut map = self.lock();
        let now = Instant::now();
        map.retain(|_, attempts| {
            attempts.retain(|t| now.duration_since(*t) < max_age);
            !attempts.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_max_attempts() {
        let rl = RateLimiter::new();
        let window = Duration::from_secs(60);
        for _ in 0..3 {
            assert!(rl.check_and_record("login:abc", 3, window));
        }
        assert!(!rl.check_and_record("login:abc", 3, window));
        assert!(rl.check_and_record("login:other", 3, window));
    }

    #[test]
    fn reset_clears_the_bucket() {
        let rl = RateLimiter::new();
        let window = Duration::from_secs(60);
        assert!(rl.check_and_record("login:abc", 1, window));
        assert!(!rl.check_and_record("login:abc", 1, window));
        rl.reset("login:abc");
        assert!(rl.check_and_record("login:abc", 1, window));
    }

    #[test]
    fn zero_window_never_blocks() {
        let rl = RateLimiter::new();
        for _ in 0..5 {
            assert!(rl.check_and_record("concierge:x", 1, Duration::ZERO));
        }
        rl.cleanup(Duration::ZERO);
        assert!(rl.lock().is_empty());
    }
}
