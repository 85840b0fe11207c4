use crate::math::Vector3f;
use crate::prelude::{DELAY_LINE_CAPACITY, DELAY_VALIDITY_MS};

/// A timestamped field reading held by one delay-line slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: u32,
    pub field: Vector3f,
}

impl Sample {
    pub fn new(timestamp: u32, field: Vector3f) -> Self {
        Self { timestamp, field }
    }
}

/// Absolute distance between two wrapping millisecond timestamps.
pub fn time_distance(a: u32, b: u32) -> u32 {
    (a.wrapping_sub(b) as i32).unsigned_abs()
}

/// Fixed-capacity ring of samples used to emulate transport latency.
///
/// Slots are never reordered; lookups scan every slot in index order, so on
/// equal distances the lowest index wins.
#[derive(Debug, Clone)]
pub struct DelayLine {
    slots: [Option<Sample>; DELAY_LINE_CAPACITY],
    cursor: usize,
}

impl DelayLine {
    pub fn new() -> Self {
        Self {
            slots: [None; DELAY_LINE_CAPACITY],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        DELAY_LINE_CAPACITY
    }

    /// Index the next store will write to.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Writes at the cursor, overwriting the oldest slot once full.
    pub fn store(&mut self, sample: Sample) {
        self.slots[self.cursor] = Some(sample);
        self.cursor = (self.cursor + 1) % DELAY_LINE_CAPACITY;
    }

    /// Closest stored sample to `target` and its distance in milliseconds.
    pub fn query_nearest(&self, target: u32) -> Option<(Sample, u32)> {
        let mut best: Option<(Sample, u32)> = None;
        for sample in self.slots.iter().flatten() {
            let distance = time_distance(target, sample.timestamp);
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((*sample, distance));
            }
        }
        best
    }

    /// Nearest sample if it lies within the validity window.
    pub fn retrieve(&self, target: u32) -> Option<Sample> {
        self.query_nearest(target)
            .filter(|(_, distance)| *distance < DELAY_VALIDITY_MS)
            .map(|(sample, _)| sample)
    }
}

impl Default for DelayLine {
    fn default() -> Self {
        Self::new()
    }
}
