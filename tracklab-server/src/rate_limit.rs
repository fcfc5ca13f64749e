use std::{
    collections::VecDeque,
    net::{IpAddr, SocketAddr},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::{ServerContext, ServerError};

/// A sliding window rate limiter keyed by client address
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: DashMap<IpAddr, VecDeque<Instant>>,
    last_sweep: Mutex<Instant>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(15 * 60))
    }
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            requests: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Records a request from the address, returning false if it should be
    /// refused
    pub fn check(&self, addr: IpAddr) -> bool {
        let now = Instant::now();
        self.sweep(now);

        let mut entry = self.requests.entry(addr).or_default();

        while entry
            .front()
            .is_some_and(|&t| now.duration_since(t) > self.window)
        {
            entry.pop_front();
        }

        if entry.len() >= self.max_requests {
            return false;
        }

        entry.push_back(now);
        true
    }

    /// Drops addresses whose entire window has drained, at most once per
    /// window, so the map does not grow with every address ever seen
    fn sweep(&self, now: Instant) {
        let mut last = self.last_sweep.lock();

        if now.duration_since(*last) < self.window {
            return;
        }

        *last = now;
        drop(last);

        self.requests
            .retain(|_, timestamps| {
                timestamps
                    .back()
                    .is_some_and(|&t| now.duration_since(t) <= self.window)
            });
    }
}

pub async fn rate_limit(
    State(context): State<ServerContext>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if !context.rate_limiter.check(addr.ip()) {
        return Err(ServerError::TooManyRequests);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn refuses_after_limit_within_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let addr: IpAddr = "127.0.0.1".parse().expect("valid address");

        assert!(limiter.check(addr));
        assert!(limiter.check(addr));
        assert!(limiter.check(addr));
        assert!(!limiter.check(addr));
    }

    #[test]
    fn addresses_are_limited_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));

        let first: IpAddr = "10.0.0.1".parse().expect("valid address");
        let second: IpAddr = "10.0.0.2".parse().expect("valid address");

        assert!(limiter.check(first));
        assert!(!limiter.check(first));
        assert!(limiter.check(second));
    }

    #[test]
    fn idle_addresses_are_swept_from_the_map() {
        let limiter = RateLimiter::new(1, Duration::from_millis(1));

        let idle: IpAddr = "10.0.0.1".parse().expect("valid address");
        let active: IpAddr = "10.0.0.2".parse().expect("valid address");

        assert!(limiter.check(idle));
        std::thread::sleep(Duration::from_millis(10));

        // The next check from anyone sweeps addresses whose window drained
        assert!(limiter.check(active));

        assert!(!limiter.requests.contains_key(&idle));
        assert!(limiter.requests.contains_key(&active));
    }

    #[test]
    fn window_expiry_frees_capacity() {
        let limiter = RateLimiter::new(1, Duration::from_millis(0));
        let addr: IpAddr = "127.0.0.1".parse().expect("valid address");

        assert!(limiter.check(addr));
        std::thread::sleep(Duration::from_millis(5));
        assert!(limiter.check(addr));
    }
}
