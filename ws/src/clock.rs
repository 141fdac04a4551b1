//! Time sources for heartbeats
//!
//! Peers' clocks are never trusted for anything but a staleness comparison
//! against a generous TTL, so any millisecond wall clock will do.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Millisecond time source
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock in unix milliseconds
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self(Arc::new(AtomicI64::new(start_millis)))
    }

    pub fn set(&self, millis: i64) {
        self.0.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(100);
        let other = clock.clone();

        clock.advance(50);
        assert_eq!(other.now_millis(), 150);

        other.set(10);
        assert_eq!(clock.now_millis(), 10);
    }

    #[test]
    fn test_system_clock_is_unix_millis() {
        // 2020-01-01
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
