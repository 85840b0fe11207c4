use crate::math::Vector3f;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-process consumer of per-instance samples. Implementations must be
/// safe to feed from the tick context while another context drains them.
pub trait AccumulationSink: Send + Sync {
    fn accumulate(&self, instance: u8, field: Vector3f, weight: u32);

    /// Mean of everything accumulated since the last drain, if anything was.
    fn drain(&self, instance: u8) -> Option<Vector3f>;
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: Vector3f,
    count: u32,
}

/// Running-mean sink. `weight` caps the number of samples contributing to
/// the mean: once reached, sum and count are halved so the accumulator keeps
/// tracking recent readings when the consumer drains slowly. A weight of 0
/// leaves the mean uncapped; weights below 2 are raised to 2 so a halving
/// never empties the accumulator.
pub struct AveragingSink {
    inner: Mutex<HashMap<u8, Accumulator>>,
}

impl AveragingSink {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn pending(&self, instance: u8) -> u32 {
        if let Ok(accumulators) = self.inner.lock() {
            accumulators.get(&instance).map_or(0, |acc| acc.count)
        } else {
            0
        }
    }
}

impl Default for AveragingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulationSink for AveragingSink {
    fn accumulate(&self, instance: u8, field: Vector3f, weight: u32) {
        if let Ok(mut accumulators) = self.inner.lock() {
            let acc = accumulators.entry(instance).or_default();
            acc.sum += field;
            acc.count += 1;
            if weight > 0 && acc.count >= weight.max(2) {
                acc.sum *= 0.5;
                acc.count /= 2;
            }
        }
    }

    fn drain(&self, instance: u8) -> Option<Vector3f> {
        let mut accumulators = self.inner.lock().ok()?;
        let acc = accumulators.get_mut(&instance)?;
        if acc.count == 0 {
            return None;
        }
        let n = acc.count as f32;
        let mean = Vector3f::new(acc.sum.x / n, acc.sum.y / n, acc.sum.z / n);
        *acc = Accumulator::default();
        Some(mean)
    }
}
