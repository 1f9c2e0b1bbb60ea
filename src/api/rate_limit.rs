//! Server-side login rate limiting
//!
//! Fixed-window counter per client IP, held in memory behind the router
//! state. This replaces any notion of client-side throttling: the limit is
//! enforced where the attacker cannot clear it.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Keep the window map from growing without bound under address churn
const MAX_TRACKED_CLIENTS: usize = 4096;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Attempts allowed per window
    pub max_attempts: u32,
    /// Window length
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    attempts: u32,
}

/// Fixed-window in-memory rate limiter keyed by client IP
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt from `ip` and report whether it is allowed
    pub fn allow(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");

        if windows.len() >= MAX_TRACKED_CLIENTS {
            let window = self.config.window;
            windows.retain(|_, w| now.duration_since(w.started_at) < window);
        }

        let entry = windows.entry(ip).or_insert(Window {
            started_at: now,
            attempts: 0,
        });

        if now.duration_since(entry.started_at) >= self.config.window {
            entry.started_at = now;
            entry.attempts = 0;
        }

        entry.attempts += 1;
        entry.attempts <= self.config.max_attempts
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}
