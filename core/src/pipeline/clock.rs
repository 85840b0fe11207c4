use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic millisecond time base. Values wrap at `u32::MAX`.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u32;
}

/// Milliseconds since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u32 {
        // truncation is the intended wrap
        self.start.elapsed().as_millis() as u32
    }
}

/// Externally stepped clock for offline runs and tests. Clones share time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn starting_at(now_ms: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(now_ms)),
        }
    }

    pub fn set(&self, now_ms: u32) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u32) -> u32 {
        self.now
            .fetch_add(delta_ms, Ordering::SeqCst)
            .wrapping_add(delta_ms)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::starting_at(100);
        let other = clock.clone();
        assert_eq!(clock.advance(15), 115);
        assert_eq!(other.now_ms(), 115);
        other.set(u32::MAX);
        assert_eq!(clock.advance(1), 0);
    }
}
