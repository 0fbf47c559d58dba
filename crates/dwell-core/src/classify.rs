//! Near/far partition of hit sets.

use crate::dwell::RateClass;
use crate::scene::HitRecord;

/// Splits hits at a fixed distance: `distance <= boundary` is near.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitClassifier {
    boundary: f64,
}

impl HitClassifier {
    pub fn new(boundary: f64) -> Self {
        Self { boundary }
    }

    pub fn boundary(&self) -> f64 {
        self.boundary
    }

    pub fn class_of(&self, distance: f64) -> RateClass {
        if distance <= self.boundary {
            RateClass::Near
        } else {
            RateClass::Far
        }
    }

    /// `(near, far)` subsets. Input order is preserved within each subset.
    pub fn split(&self, hits: &[HitRecord]) -> (Vec<HitRecord>, Vec<HitRecord>) {
        hits.iter()
            .copied()
            .partition(|h| self.class_of(h.distance) == RateClass::Near)
    }

    /// The subset belonging to `class`.
    pub fn select(&self, hits: &[HitRecord], class: RateClass) -> Vec<HitRecord> {
        hits.iter()
            .filter(|h| self.class_of(h.distance) == class)
            .copied()
            .collect()
    }
}
