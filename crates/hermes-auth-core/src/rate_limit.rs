//! Public-surface IP rate limiter
//!
//! Two fixed windows per client IP: a coarse request budget and a short
//! spam window. Tripping the spam window puts the IP on a blocklist for a
//! configurable duration. All state lives behind a single mutex covering
//! two maps; losing it on restart is acceptable. Eviction is lazy: stale
//! windows are replaced when the IP next shows up, and expired blocklist
//! entries are dropped on access.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use hermes_types::{HermesError, HermesResult};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Coarse window length in seconds
    pub window_seconds: i64,
    /// Requests allowed per coarse window
    pub max_per_window: u32,
    /// Requests allowed per 10-second spam window
    pub spam_max_per_10s: u32,
    /// Blocklist duration after a spam trip, in minutes
    pub block_minutes: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            max_per_window: 120,
            spam_max_per_10s: 40,
            block_minutes: 10,
        }
    }
}

#[derive(Debug)]
struct Window {
    count: u32,
    window_end: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LimiterState {
    windows: HashMap<(IpAddr, WindowKind), Window>,
    blocked: HashMap<IpAddr, DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum WindowKind {
    Coarse,
    Spam,
}

/// Per-IP fixed-window limiter with spam blocklist
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a limiter with the given configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Admit or reject one request from `ip` at time `now`.
    ///
    /// Order matters: the blocklist is consulted first, then both windows
    /// are counted, then the spam threshold, then the coarse threshold.
    pub fn check(&self, ip: IpAddr, now: DateTime<Utc>) -> HermesResult<()> {
        let mut state = self.state.lock().expect("rate limiter mutex poisoned");

        match state.blocked.get(&ip) {
            Some(until) if now < *until => return Err(HermesError::IpBlocked),
            Some(_) => {
                // Lazy eviction of an expired block
                state.blocked.remove(&ip);
            }
            None => {}
        }

        let coarse = Self::bump(
            &mut state.windows,
            ip,
            WindowKind::Coarse,
            now,
            Duration::seconds(self.config.window_seconds),
        );
        let spam = Self::bump(
            &mut state.windows,
            ip,
            WindowKind::Spam,
            now,
            Duration::seconds(10),
        );

        if spam > self.config.spam_max_per_10s {
            state
                .blocked
                .insert(ip, now + Duration::minutes(self.config.block_minutes));
            return Err(HermesError::IpBlocked);
        }

        if coarse > self.config.max_per_window {
            return Err(HermesError::RateLimitExceeded);
        }

        Ok(())
    }

    fn bump(
        windows: &mut HashMap<(IpAddr, WindowKind), Window>,
        ip: IpAddr,
        kind: WindowKind,
        now: DateTime<Utc>,
        length: Duration,
    ) -> u32 {
        let window = windows.entry((ip, kind)).or_insert(Window {
            count: 0,
            window_end: now + length,
        });

        if now > window.window_end {
            window.count = 0;
            window.window_end = now + length;
        }

        window.count += 1;
        window.count
    }

    /// Number of IPs currently on the blocklist (expired entries included
    /// until their next access)
    pub fn blocked_count(&self) -> usize {
        self.state
            .lock()
            .expect("rate limiter mutex poisoned")
            .blocked
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    fn limiter(max_per_window: u32, spam_max: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            window_seconds: 60,
            max_per_window,
            spam_max_per_10s: spam_max,
            block_minutes: 10,
        })
    }

    #[test]
    fn test_allows_within_budget() {
        let limiter = limiter(5, 100);
        let now = Utc::now();

        for _ in 0..5 {
            assert!(limiter.check(ip(1), now).is_ok());
        }
    }

    #[test]
    fn test_rejects_over_coarse_budget() {
        let limiter = limiter(3, 100);
        let now = Utc::now();

        for _ in 0..3 {
            assert!(limiter.check(ip(1), now).is_ok());
        }
        assert!(matches!(
            limiter.check(ip(1), now),
            Err(HermesError::RateLimitExceeded)
        ));
    }

    #[test]
    fn test_window_resets() {
        let limiter = limiter(2, 100);
        let now = Utc::now();

        assert!(limiter.check(ip(1), now).is_ok());
        assert!(limiter.check(ip(1), now).is_ok());
        assert!(limiter.check(ip(1), now).is_err());

        let later = now + Duration::seconds(61);
        assert!(limiter.check(ip(1), later).is_ok());
    }

    #[test]
    fn test_spam_trips_blocklist() {
        let limiter = limiter(1000, 3);
        let now = Utc::now();

        for _ in 0..3 {
            assert!(limiter.check(ip(2), now).is_ok());
        }
        assert!(matches!(
            limiter.check(ip(2), now),
            Err(HermesError::IpBlocked)
        ));
        assert_eq!(limiter.blocked_count(), 1);

        // Still blocked shortly after, even though the spam window rolled
        let soon = now + Duration::seconds(30);
        assert!(matches!(
            limiter.check(ip(2), soon),
            Err(HermesError::IpBlocked)
        ));
    }

    #[test]
    fn test_block_expires_lazily() {
        let limiter = limiter(1000, 1);
        let now = Utc::now();

        assert!(limiter.check(ip(3), now).is_ok());
        assert!(limiter.check(ip(3), now).is_err());
        assert_eq!(limiter.blocked_count(), 1);

        let after_block = now + Duration::minutes(11);
        assert!(limiter.check(ip(3), after_block).is_ok());
        assert_eq!(limiter.blocked_count(), 0);
    }

    #[test]
    fn test_ips_are_independent() {
        let limiter = limiter(1, 100);
        let now = Utc::now();

        assert!(limiter.check(ip(4), now).is_ok());
        assert!(limiter.check(ip(4), now).is_err());
        assert!(limiter.check(ip(5), now).is_ok());
    }
}
