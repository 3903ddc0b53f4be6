//! Fixed-window rate limiting over a pluggable counter store
//!
//! Each `(identifier, window)` key moves through Unseen → Counting →
//! Exhausted and resets at the next window boundary
//! (`window_start = floor(now / window) * window`).
//!
//! The read-increment-write sequence is not atomic across backends.
//! Concurrent checks may over-admit by a small factor; duplicate increments
//! only ever make limiting stricter. Exhaustion is a normal decision value,
//! not an error.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Limits for one fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests admitted per window
    pub max_requests: u32,
    /// Window length in seconds
    pub window_secs: i64,
}

/// Named limits for the product's write paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitPreset {
    /// Envelope publishes per identity
    Publish,
    /// Access-token issuance per subject
    TokenIssue,
    /// Payment webhook deliveries per endpoint
    WebhookIngest,
}

impl RateLimitPreset {
    /// The limits for this preset. The mapping is exhaustive; adding a
    /// preset without limits does not compile.
    pub fn config(self) -> RateLimitConfig {
        match self {
            Self::Publish => RateLimitConfig {
                max_requests: 30,
                window_secs: 60,
            },
            Self::TokenIssue => RateLimitConfig {
                max_requests: 5,
                window_secs: 3600,
            },
            Self::WebhookIngest => RateLimitConfig {
                max_requests: 120,
                window_secs: 60,
            },
        }
    }
}

/// What the limiter decided for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in this window
    pub remaining: u32,
    /// Unix timestamp when the window resets
    pub reset_at: i64,
    /// Count in this window including the current request
    pub current: u32,
}

/// Capability set the limiter needs from a counter backend.
///
/// Implementations may be process-local or a binding to a shared external
/// counter store; the limiter treats both identically and tolerates lost
/// updates (see module docs).
pub trait CounterStore {
    /// Current count for a window key, if any.
    fn get(&self, key: &str) -> Option<u32>;

    /// Store a count, expiring no earlier than `ttl` from now.
    fn put(&self, key: &str, count: u32, ttl: Duration);
}

struct CounterEntry {
    count: u32,
    expires_at: Instant,
}

/// In-process counter store with a host-driven sweep.
///
/// An explicitly-owned object, not a process-wide singleton: the host
/// constructs it, calls [`sweep`](Self::sweep) from its own scheduler
/// (roughly once a minute, independent of window sizes), and calls
/// [`shutdown`](Self::shutdown) when done.
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, CounterEntry>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Drop expired windows to bound memory.
    ///
    /// Holds the map lock for the whole pass, so concurrent `get`/`put`
    /// never observe a partially swept map.
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!(dropped, "swept expired rate-limit windows");
        }
    }

    /// Release all counters.
    pub fn shutdown(&self) {
        self.entries.lock().clear();
    }

    /// Number of live window keys (expired-but-unswept included).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStore for MemoryCounterStore {
    fn get(&self, key: &str) -> Option<u32> {
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.count)
    }

    fn put(&self, key: &str, count: u32, ttl: Duration) {
        self.entries.lock().insert(
            key.to_string(),
            CounterEntry {
                count,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

/// Fixed-window limiter bound to one counter store.
pub struct RateLimiter<S: CounterStore> {
    store: S,
}

impl<S: CounterStore> RateLimiter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store (for host-driven sweeps).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Count a request for `identifier` against `config`.
    pub fn check(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitDecision {
        self.check_at(identifier, config, chrono::Utc::now().timestamp())
    }

    /// [`check`](Self::check) with an explicit clock.
    pub fn check_at(
        &self,
        identifier: &str,
        config: &RateLimitConfig,
        now: i64,
    ) -> RateLimitDecision {
        let window_start = now - now.rem_euclid(config.window_secs);
        let reset_at = window_start + config.window_secs;
        let key = format!("{}:{}", identifier, window_start);

        let current = self.store.get(&key).unwrap_or(0).saturating_add(1);
        let ttl = Duration::from_secs((reset_at - now).max(1) as u64 + 1);
        self.store.put(&key, current, ttl);

        let allowed = current <= config.max_requests;
        if !allowed {
            debug!(identifier, current, max = config.max_requests, "rate limit exhausted");
        }

        RateLimitDecision {
            allowed,
            remaining: config.max_requests.saturating_sub(current),
            reset_at,
            current,
        }
    }
}
