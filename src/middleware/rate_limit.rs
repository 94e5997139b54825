//! Fixed-window admission control.
//!
//! Each client identity gets a counter that resets when its window elapses.
//! The reset is lazy — checked on the next request from that identity, no
//! sweeper task. Identities that stop connecting keep their map entry until
//! the process restarts; at this service's scale that growth is accepted and
//! left unbounded.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::Fault;
use crate::middleware::{Flow, Stage};
use crate::request::Request;

/// Window duration and per-window request budget.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { window: Duration::from_secs(15 * 60), max_requests: 100 }
    }
}

/// Outcome of one admission check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Admission {
    Allowed,
    Rejected,
}

struct Window {
    count: u32,
    started: Instant,
}

/// The per-identity counter map.
///
/// Owned by whoever constructs the limiter and injected into it — never a
/// process-wide singleton — so tests get isolated stores and multiple
/// limiters can coexist. One lock guards the whole map, which makes every
/// admission check linearizable per identity; at a hundred requests per
/// window per client, lock contention is not a concern.
pub struct WindowStore {
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self { windows: Mutex::new(HashMap::new()) }
    }
}

impl Default for WindowStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The admission stage. `Rejected` short-circuits the pipeline: no
/// downstream stage or handler runs for that request, and the increment is
/// never rolled back, even if the client disconnects before reading the
/// response.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: WindowStore,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, store: WindowStore) -> Self {
        Self { config, store }
    }

    /// Counts one request against `client`'s current window.
    ///
    /// The first request from a new identity is always `Allowed`; the
    /// (N+1)-th within one window is the first `Rejected`. Window starts
    /// never move backwards: a window is only restarted at a strictly later
    /// `now`.
    pub fn admit(&self, client: IpAddr, now: Instant) -> Admission {
        let mut windows = self
            .store
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let window = windows
            .entry(client)
            .or_insert(Window { count: 0, started: now });

        if now.duration_since(window.started) >= self.config.window {
            window.count = 0;
            window.started = now;
        }

        window.count = window.count.saturating_add(1);
        if window.count > self.config.max_requests {
            Admission::Rejected
        } else {
            Admission::Allowed
        }
    }
}

impl Stage for RateLimiter {
    fn apply(&self, ctx: &mut Request) -> Result<Flow, Fault> {
        match self.admit(ctx.client(), Instant::now()) {
            Admission::Allowed => Ok(Flow::Continue),
            Admission::Rejected => {
                debug!(client = %ctx.client(), "admission rejected");
                Err(Fault::rate_limited())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn limiter(max_requests: u32, window: Duration) -> RateLimiter {
        RateLimiter::new(
            RateLimitConfig { window, max_requests },
            WindowStore::new(),
        )
    }

    fn client(n: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, n))
    }

    #[test]
    fn first_request_from_a_new_identity_is_allowed() {
        let limiter = limiter(1, Duration::from_secs(60));
        assert_eq!(limiter.admit(client(1), Instant::now()), Admission::Allowed);
    }

    #[test]
    fn rejection_starts_at_exactly_n_plus_one() {
        let limiter = limiter(5, Duration::from_secs(60));
        let now = Instant::now();
        for _ in 0..5 {
            assert_eq!(limiter.admit(client(1), now), Admission::Allowed);
        }
        assert_eq!(limiter.admit(client(1), now), Admission::Rejected);
        assert_eq!(limiter.admit(client(1), now), Admission::Rejected);
    }

    #[test]
    fn identities_are_counted_independently() {
        let limiter = limiter(1, Duration::from_secs(60));
        let now = Instant::now();
        assert_eq!(limiter.admit(client(1), now), Admission::Allowed);
        assert_eq!(limiter.admit(client(1), now), Admission::Rejected);
        assert_eq!(limiter.admit(client(2), now), Admission::Allowed);
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let window = Duration::from_secs(60);
        let limiter = limiter(2, window);
        let start = Instant::now();

        assert_eq!(limiter.admit(client(1), start), Admission::Allowed);
        assert_eq!(limiter.admit(client(1), start), Admission::Allowed);
        assert_eq!(limiter.admit(client(1), start), Admission::Rejected);

        // One full window later the identity starts fresh.
        let later = start + window;
        assert_eq!(limiter.admit(client(1), later), Admission::Allowed);
        assert_eq!(limiter.admit(client(1), later), Admission::Allowed);
        assert_eq!(limiter.admit(client(1), later), Admission::Rejected);
    }

    #[test]
    fn mid_window_requests_do_not_reset_the_counter() {
        let window = Duration::from_secs(60);
        let limiter = limiter(1, window);
        let start = Instant::now();

        assert_eq!(limiter.admit(client(1), start), Admission::Allowed);
        let mid = start + window / 2;
        assert_eq!(limiter.admit(client(1), mid), Admission::Rejected);
    }

    /// Concurrent admissions for one identity must neither lose nor double
    /// increments: over any number of calls, exactly `max_requests` are
    /// allowed within one window.
    #[test]
    fn concurrent_admissions_are_linearizable() {
        let limiter = Arc::new(limiter(100, Duration::from_secs(3600)));
        let allowed = Arc::new(AtomicU32::new(0));
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let allowed = Arc::clone(&allowed);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        if limiter.admit(client(1), now) == Admission::Allowed {
                            allowed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 200 attempts against a budget of 100.
        assert_eq!(allowed.load(Ordering::Relaxed), 100);
    }
}
