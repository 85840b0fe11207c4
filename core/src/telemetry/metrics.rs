use serde::Serialize;
use std::sync::Mutex;

/// Counters describing pipeline activity since start-up.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineMetrics {
    pub ticks: u64,
    pub gated: u64,
    pub stored: u64,
    pub delay_fallbacks: u64,
    pub correction_builds: u64,
    pub accumulated: u64,
    pub published: u64,
    pub publish_failures: u64,
    pub drains: u64,
}

pub struct MetricsRecorder {
    inner: Mutex<PipelineMetrics>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PipelineMetrics::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut PipelineMetrics)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_tick(&self, stored: bool, delay_fallback: bool) {
        self.update(|m| {
            m.ticks += 1;
            m.stored += u64::from(stored);
            m.delay_fallbacks += u64::from(delay_fallback);
        });
    }

    pub fn record_gated(&self) {
        self.update(|m| m.gated += 1);
    }

    pub fn set_correction_builds(&self, builds: u64) {
        self.update(|m| m.correction_builds = builds);
    }

    pub fn record_accumulated(&self) {
        self.update(|m| m.accumulated += 1);
    }

    pub fn record_published(&self) {
        self.update(|m| m.published += 1);
    }

    pub fn record_publish_failure(&self) {
        self.update(|m| m.publish_failures += 1);
    }

    pub fn record_drain(&self) {
        self.update(|m| m.drains += 1);
    }

    pub fn snapshot(&self) -> PipelineMetrics {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            PipelineMetrics::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_counters_accumulate() {
        let recorder = MetricsRecorder::new();
        recorder.record_tick(true, false);
        recorder.record_tick(false, true);
        recorder.record_gated();
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.ticks, 2);
        assert_eq!(snapshot.stored, 1);
        assert_eq!(snapshot.delay_fallbacks, 1);
        assert_eq!(snapshot.gated, 1);
    }
}
