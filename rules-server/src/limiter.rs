//! Rate limiting service
//!
//! The limiter is injected into `AppState` behind a trait so a shared
//! backend can replace the in-process counter when the service is scaled out.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateDecision {
    #[cfg(test)]
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

pub trait RateLimiter: Send + Sync {
    /// Count one request for `client` and decide whether it may proceed
    fn check(&self, client: &str) -> RateDecision;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window counter keyed by client identity
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let mut windows = self.windows.lock();

        let decision = match windows.get_mut(client) {
            Some(window) if window.reset_at > now => {
                if window.count >= self.max_requests {
                    RateDecision::Limited {
                        retry_after: window.reset_at - now,
                    }
                } else {
                    window.count += 1;
                    RateDecision::Allowed {
                        remaining: self.max_requests - window.count,
                    }
                }
            }
            _ => {
                windows.insert(
                    client.to_string(),
                    Window {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                RateDecision::Allowed {
                    remaining: self.max_requests.saturating_sub(1),
                }
            }
        };

        // Drop expired windows
        windows.retain(|_, w| w.reset_at > now);

        decision
    }

    /// Number of clients with a live window
    #[cfg(test)]
    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().len()
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_after_max_requests() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        assert_eq!(limiter.check_at("10.0.0.1", now), RateDecision::Allowed { remaining: 2 });
        assert_eq!(limiter.check_at("10.0.0.1", now), RateDecision::Allowed { remaining: 1 });
        assert_eq!(limiter.check_at("10.0.0.1", now), RateDecision::Allowed { remaining: 0 });
        assert!(!limiter.check_at("10.0.0.1", now).is_allowed());
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at("a", now).is_allowed());
        assert!(!limiter.check_at("a", now).is_allowed());
        assert!(limiter.check_at("b", now).is_allowed());
    }

    #[test]
    fn test_window_resets() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at("a", start).is_allowed());
        match limiter.check_at("a", start + Duration::from_secs(20)) {
            RateDecision::Limited { retry_after } => assert_eq!(retry_after, Duration::from_secs(40)),
            other => panic!("expected limit, got {other:?}"),
        }
        assert!(limiter.check_at("a", start + Duration::from_secs(61)).is_allowed());
    }

    #[test]
    fn test_expired_windows_pruned() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();

        limiter.check_at("a", start);
        limiter.check_at("b", start);
        assert_eq!(limiter.tracked_clients(), 2);

        limiter.check_at("c", start + Duration::from_secs(120));
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
