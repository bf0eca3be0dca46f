//! Clock abstraction for time-dependent logic.
//!
//! The feature-flag cache expires entries on a TTL, and tests for that
//! need to move time forward without actually sleeping. Code that cares
//! about the passage of time takes a [`Clock`] instead of calling
//! [`Instant::now`] directly; production wires in [`RealClock`], tests
//! wire in [`TestClock`] and advance it explicitly.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Source of current time and sleep behavior.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current monotonic instant, for measuring elapsed time.
    fn now(&self) -> Instant;

    /// Current wall-clock time, for timestamps.
    fn now_system(&self) -> SystemTime;

    /// Sleeps for the given duration.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// System clock used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a new real clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_system(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Manually advanced clock for tests.
///
/// Time stands still until [`advance`](TestClock::advance) is called, so
/// a test can push a cached flag entry past its TTL deterministically.
/// Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct TestClock {
    monotonic_ns: Arc<AtomicU64>,
    system_ns: Arc<AtomicU64>,
    base_instant: Instant,
}

impl TestClock {
    /// Creates a clock starting at the current system time.
    pub fn new() -> Self {
        let system_ns = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self {
            monotonic_ns: Arc::new(AtomicU64::new(0)),
            system_ns: Arc::new(AtomicU64::new(system_ns)),
            base_instant: Instant::now(),
        }
    }

    /// Moves both monotonic and wall-clock time forward.
    pub fn advance(&self, duration: Duration) {
        let ns = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.monotonic_ns.fetch_add(ns, Ordering::SeqCst);
        self.system_ns.fetch_add(ns, Ordering::SeqCst);
    }

    /// Total time advanced since the clock was created.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.monotonic_ns.load(Ordering::SeqCst))
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.base_instant + Duration::from_nanos(self.monotonic_ns.load(Ordering::SeqCst))
    }

    fn now_system(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_nanos(self.system_ns.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        // Sleeping in tests just advances the clock; yield once so other
        // tasks get a chance to observe the new time.
        self.advance(duration);
        Box::pin(tokio::task::yield_now())
    }
}
