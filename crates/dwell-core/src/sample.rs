//! Gaze/head sample window and the stability metric computed over it.
//!
//! Each sample pairs the eye gaze direction with the head forward vector.
//! Arrival order is the clock: there are no timestamps. The window is a
//! bounded FIFO, so once full every push evicts the oldest sample.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::vector::Vec3;

/// One tick's orientation pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub gaze: Vec3,
    pub head: Vec3,
}

impl Sample {
    pub fn new(gaze: Vec3, head: Vec3) -> Self {
        Self { gaze, head }
    }

    /// Angle in degrees between gaze and head forward.
    pub fn alignment(&self) -> f64 {
        self.gaze.angle_between(self.head)
    }
}

/// Bounded FIFO of samples.
#[derive(Clone, Debug)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Append a sample, evicting the oldest when at capacity.
    pub fn push(&mut self, sample: Sample) {
        if self.capacity == 0 {
            return;
        }
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Mean angular deviation in degrees, or `None` until the window is full.
    pub fn deviation(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        self.deviation_over(self.capacity)
    }

    /// Deviation over the newest `n` samples, or `None` until `n` samples
    /// have arrived since the last clear.
    pub fn deviation_over(&self, n: usize) -> Option<f64> {
        let len = self.samples.len();
        if n == 0 || len < n {
            return None;
        }
        let (front, back) = self.samples.as_slices();
        if back.len() >= n {
            Some(compute_deviation(&back[back.len() - n..]))
        } else if back.is_empty() {
            Some(compute_deviation(&front[len - n..]))
        } else {
            let tail: Vec<Sample> = self.samples.range(len - n..).copied().collect();
            Some(compute_deviation(&tail))
        }
    }

    /// Normalized mean of the gaze directions; `None` when empty or when
    /// the directions cancel out.
    pub fn centroid_gaze(&self) -> Option<Vec3> {
        self.centroid_gaze_over(self.samples.len())
    }

    /// Centroid of the newest `n` samples (all of them if fewer are held).
    pub fn centroid_gaze_over(&self, n: usize) -> Option<Vec3> {
        let len = self.samples.len();
        let n = n.min(len);
        if n == 0 {
            return None;
        }
        let mut sum = Vec3::ZERO;
        for s in self.samples.range(len - n..) {
            sum += s.gaze.normalize();
        }
        let centroid = (sum / n as f64).normalize();
        if centroid.is_degenerate() {
            None
        } else {
            Some(centroid)
        }
    }
}

/// Sum of absolute tick-to-tick changes in gaze/head alignment, divided by
/// the number of samples (not the number of differences).
///
/// Lower is steadier. Returns 0 for fewer than two samples.
pub fn compute_deviation(samples: &[Sample]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let sum: f64 = samples
        .windows(2)
        .map(|pair| (pair[1].alignment() - pair[0].alignment()).abs())
        .sum();
    sum / samples.len() as f64
}
