use serde::{Deserialize, Serialize};

/// Number of samples collected per measurement round unless configured otherwise.
pub const DEFAULT_SAMPLE_SIZE: usize = 50;

/// Fixed-capacity sample buffer producing a mean once full.
///
/// The backing buffer always has `capacity()` entries so that logs can
/// address every index; entries at or beyond `len()` read as `0.0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleAccumulator {
    samples: Vec<f64>,
    count: usize,
}

impl Default for SampleAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE)
    }
}

impl SampleAccumulator {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            count: 0,
        }
    }

    /// Drop all collected samples. Capacity is kept.
    pub fn clear(&mut self) {
        self.count = 0;
        self.samples.fill(0.0);
    }

    /// Append a sample.
    ///
    /// Returns `false` (and leaves the buffer untouched) when the accumulator
    /// is already full.
    pub fn push(&mut self, value: f64) -> bool {
        if self.is_full() {
            return false;
        }
        self.samples[self.count] = value;
        self.count += 1;
        true
    }

    /// Arithmetic mean of the collected samples, `0.0` when empty.
    pub fn average(&self) -> f64 {
        match self.count {
            0 => 0.0,
            1 => self.samples[0],
            n => self.samples[..n].iter().sum::<f64>() / n as f64,
        }
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of samples to collect.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Number of collected samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Full backing buffer, `capacity()` long.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Collected samples only.
    pub fn collected(&self) -> &[f64] {
        &self.samples[..self.count]
    }

    /// Fill ratio in `[0, 1]`. An accumulator with zero capacity reports `1.0`.
    pub fn progress(&self) -> f32 {
        if self.samples.is_empty() {
            return 1.0;
        }
        self.count as f32 / self.samples.len() as f32
    }
}
