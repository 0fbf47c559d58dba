//! Scripted gaze generator for demos, benches and tests.
//!
//! Produces one [`GazeFrame`] per tick from a list of fixations. During a
//! fixation the head points straight at the target and the eye jitters
//! around it by up to `jitter_deg`. When the target changes, the eye jumps
//! at once while the head catches up over `head_lag_ticks`, which is what
//! makes the gaze/head alignment swing and a saccade register.

use std::f64::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::accuracy::direction_to;
use crate::engine::GazeFrame;
use crate::vector::Vec3;

pub const DEFAULT_JITTER_DEG: f64 = 0.1;
pub const DEFAULT_HEAD_LAG_TICKS: usize = 10;

/// Look at `target` for `ticks` frames.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fixation {
    pub target: Vec3,
    pub ticks: usize,
}

impl Fixation {
    pub fn new(target: Vec3, ticks: usize) -> Self {
        Self { target, ticks }
    }
}

pub struct SyntheticGaze<R: Rng> {
    origin: Vec3,
    fixations: Vec<Fixation>,
    jitter_deg: f64,
    head_lag_ticks: usize,
    rng: R,
    index: usize,
    step: usize,
    previous_dir: Option<Vec3>,
}

impl<R: Rng> SyntheticGaze<R> {
    pub fn new(origin: Vec3, fixations: Vec<Fixation>, rng: R) -> Self {
        Self {
            origin,
            fixations,
            jitter_deg: DEFAULT_JITTER_DEG,
            head_lag_ticks: DEFAULT_HEAD_LAG_TICKS,
            rng,
            index: 0,
            step: 0,
            previous_dir: None,
        }
    }

    pub fn with_jitter(mut self, jitter_deg: f64) -> Self {
        self.jitter_deg = jitter_deg.max(0.0);
        self
    }

    pub fn with_head_lag(mut self, ticks: usize) -> Self {
        self.head_lag_ticks = ticks;
        self
    }

    /// Frames the whole script produces.
    pub fn total_ticks(&self) -> usize {
        self.fixations.iter().map(|f| f.ticks).sum()
    }
}

impl<R: Rng> Iterator for SyntheticGaze<R> {
    type Item = GazeFrame;

    fn next(&mut self) -> Option<GazeFrame> {
        let fixation = loop {
            let fixation = *self.fixations.get(self.index)?;
            if self.step < fixation.ticks {
                break fixation;
            }
            if fixation.ticks > 0 {
                self.previous_dir = Some(direction_to(self.origin, fixation.target));
            }
            self.index += 1;
            self.step = 0;
        };

        let target_dir = direction_to(self.origin, fixation.target);
        let head = match self.previous_dir {
            Some(prev) if self.step < self.head_lag_ticks => {
                let t = (self.step + 1) as f64 / (self.head_lag_ticks + 1) as f64;
                prev.lerp(target_dir, t).normalize()
            }
            _ => target_dir,
        };
        let gaze = jitter(target_dir, self.jitter_deg, &mut self.rng);
        self.step += 1;

        Some(GazeFrame {
            origin: self.origin,
            gaze,
            head,
        })
    }
}

/// Tilt `dir` by a random angle in `[0, max_deg]` about a random axis.
fn jitter(dir: Vec3, max_deg: f64, rng: &mut impl Rng) -> Vec3 {
    if max_deg <= 0.0 || dir.is_degenerate() {
        return dir;
    }
    let helper = if dir.y.abs() < 0.9 { Vec3::UP } else { Vec3::FORWARD };
    let u = dir.cross(helper).normalize();
    let v = dir.cross(u);
    let phi = TAU * rng.random::<f64>();
    let theta = (max_deg * rng.random::<f64>()).to_radians();
    (dir * theta.cos() + (u * phi.cos() + v * phi.sin()) * theta.sin()).normalize()
}
