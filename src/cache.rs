// src/cache.rs

use chrono::{DateTime, Duration, Utc};
use std::{
    future::Future,
    sync::{Arc, Mutex},
};
use tracing::debug;

/// Default time a loaded table stays fresh.
pub const DEFAULT_TTL_SECS: i64 = 300;

/// Source of "now" for expiry checks.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Single-slot cache: one value and the time it was loaded.
///
/// A value is served while `now - fetched_at < ttl`; after that the next
/// caller loads a fresh one.
pub struct TableCache<T, C = SystemClock> {
    value: Option<Arc<T>>,
    fetched_at: Option<DateTime<Utc>>,
    ttl: Duration,
    clock: C,
}

impl<T> TableCache<T, SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<T, C: Clock> TableCache<T, C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            value: None,
            fetched_at: None,
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Age of the cached value, if any.
    pub fn age(&self) -> Option<Duration> {
        self.fetched_at.map(|at| self.clock.now() - at)
    }

    /// The cached value if it is still fresh.
    pub fn get(&self) -> Option<Arc<T>> {
        match self.age() {
            Some(age) if age < self.ttl => self.value.clone(),
            _ => None,
        }
    }

    /// Store `value` as freshly loaded.
    pub fn put(&mut self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.value = Some(Arc::clone(&value));
        self.fetched_at = Some(self.clock.now());
        value
    }

    /// Forget the cached value; the next lookup loads again.
    pub fn invalidate(&mut self) {
        self.value = None;
        self.fetched_at = None;
    }

    /// Serve the fresh value, or await `load` and cache its result.
    /// A failed load leaves the cache empty.
    pub async fn get_or_try_load<F, Fut, E>(&mut self, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get() {
            debug!(age = ?self.age(), "cache hit");
            return Ok(hit);
        }
        debug!("cache miss, loading");
        self.invalidate();
        let value = load().await?;
        Ok(self.put(value))
    }
}
