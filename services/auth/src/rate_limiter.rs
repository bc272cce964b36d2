//! Login throttling keyed by account email

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,        // 5 minutes
            ban_duration_seconds: 3600, // 1 hour
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    attempts: u32,
    window_start: Instant,
    ban_expires: Option<Instant>,
}

impl RateLimiterEntry {
    /// Neither banned nor inside a live window
    fn is_idle(&self, now: Instant, window: Duration) -> bool {
        self.ban_expires.is_none_or(|ban| now >= ban)
            && now.duration_since(self.window_start) >= window
    }
}

#[derive(Debug, Default)]
struct Entries {
    by_key: HashMap<String, RateLimiterEntry>,
    last_sweep: Option<Instant>,
}

impl Entries {
    fn sweep(&mut self, now: Instant, window: Duration) -> usize {
        let before = self.by_key.len();
        self.by_key.retain(|_, entry| !entry.is_idle(now, window));
        self.last_sweep = Some(now);
        before - self.by_key.len()
    }
}

/// In-memory limiter shared by every login handler.
///
/// Idle entries are swept at most once per window, so keys that stop
/// retrying do not accumulate.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<Entries>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(Entries::default())),
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_seconds)
    }

    /// Record an attempt for `key`, returning whether it may proceed
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = self.window();

        let sweep_due = entries
            .last_sweep
            .is_none_or(|last| now.duration_since(last) >= window);
        if sweep_due {
            let removed = entries.sweep(now, window);
            if removed > 0 {
                debug!(removed, "Swept idle login attempt entries");
            }
        }

        let entry = entries
            .by_key
            .entry(key.to_string())
            .or_insert(RateLimiterEntry {
                attempts: 0,
                window_start: now,
                ban_expires: None,
            });

        if let Some(ban_expires) = entry.ban_expires {
            if now < ban_expires {
                return false;
            }
            entry.attempts = 0;
            entry.ban_expires = None;
            entry.window_start = now;
        }

        if now.duration_since(entry.window_start) >= window {
            entry.attempts = 0;
            entry.window_start = now;
        }

        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            warn!(
                "Banned key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
            return false;
        }

        entry.attempts += 1;
        true
    }

    /// Forget the history of `key` after a successful login
    pub async fn reset(&self, key: &str) {
        if self.entries.lock().await.by_key.remove(key).is_some() {
            info!("Cleared login attempts for {}", key);
        }
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.entries.lock().await.by_key.len()
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}
