//! Per-user request rate limiting
//!
//! Fixed quota per window, anchored at the first request of the window.
//! State lives in a mutex-guarded map so the limiter can be shared across
//! handler tasks without async locking.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding-window rate limiter keyed by user id.
#[derive(Debug)]
pub struct RateLimiter {
    quota: u32,
    window: Duration,
    windows: Mutex<HashMap<i64, (Instant, u32)>>,
}

impl RateLimiter {
    pub fn new(quota: u32, window: Duration) -> Self {
        Self {
            quota,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Register one request attempt for `user_id`. Returns `false` when the
    /// user has exhausted the quota for the current window.
    pub fn check(&self, user_id: i64) -> bool {
        self.check_at(user_id, Instant::now())
    }

    pub fn check_at(&self, user_id: i64, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap();
        let (window_start, count) = windows
            .get(&user_id)
            .copied()
            .unwrap_or((now, 0));

        if now.duration_since(window_start) < self.window {
            if count >= self.quota {
                return false;
            }
            windows.insert(user_id, (window_start, count + 1));
        } else {
            windows.insert(user_id, (now, 1));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_allows_exactly_n_requests() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let now = Instant::now();

        for i in 0..5 {
            assert!(limiter.check_at(7, now), "request {i} should pass");
        }
        assert!(!limiter.check_at(7, now), "6th request must be limited");
    }

    #[test]
    fn test_limited_until_window_elapses() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at(7, start));
        assert!(limiter.check_at(7, start + Duration::from_secs(10)));
        assert!(!limiter.check_at(7, start + Duration::from_secs(30)));
        assert!(!limiter.check_at(7, start + Duration::from_secs(59)));

        // Window anchored at the first request; after it elapses the user
        // gets a fresh quota.
        assert!(limiter.check_at(7, start + Duration::from_secs(60)));
        assert!(limiter.check_at(7, start + Duration::from_secs(61)));
        assert!(!limiter.check_at(7, start + Duration::from_secs(62)));
    }

    #[test]
    fn test_users_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at(1, now));
        assert!(!limiter.check_at(1, now));
        assert!(limiter.check_at(2, now));
    }

    #[test]
    fn test_new_window_starts_at_first_request_after_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at(1, start));
        let later = start + Duration::from_secs(120);
        assert!(limiter.check_at(1, later));
        // The new window is anchored at `later`, not at the old start.
        assert!(!limiter.check_at(1, later + Duration::from_secs(30)));
        assert!(limiter.check_at(1, later + Duration::from_secs(60)));
    }
}
