//! Dual-rate dwell detection.
//!
//! Near and far targets get separate dwell durations because a distant
//! landmark takes longer to settle on than one within reach. Both classes
//! read one shared sample window sized for the longer duration; each class
//! runs the same two-state machine over its newest `n` samples:
//!
//! ```text
//!   Idle --(deviation <= threshold)--> Dwelling   emits DwellStarted
//!   Dwelling --(deviation > threshold)--> Idle    emits SaccadeStarted
//! ```
//!
//! Both events are edge-triggered. A stable window additionally requests a
//! scene probe along the centroid gaze direction. When that probe hits
//! something the shared window is cleared, so every class has to refill
//! before it can probe again.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::MIN_WINDOW_LEN;
use crate::sample::{Sample, SampleWindow};
use crate::vector::Vec3;

/// Distance class a dwell window is tuned for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateClass {
    Near,
    Far,
}

impl RateClass {
    pub const ALL: [RateClass; 2] = [RateClass::Near, RateClass::Far];

    pub fn index(self) -> usize {
        match self {
            RateClass::Near => 0,
            RateClass::Far => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RateClass::Near => "near",
            RateClass::Far => "far",
        }
    }
}

impl std::fmt::Display for RateClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Edge events broadcast by the dwell machine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DwellEvent {
    DwellStarted { class: RateClass, deviation: f64 },
    SaccadeStarted { class: RateClass, deviation: f64 },
}

impl DwellEvent {
    pub fn class(&self) -> RateClass {
        match self {
            DwellEvent::DwellStarted { class, .. } | DwellEvent::SaccadeStarted { class, .. } => {
                *class
            }
        }
    }

    pub fn is_saccade(&self) -> bool {
        matches!(self, DwellEvent::SaccadeStarted { .. })
    }
}

/// Outcome of evaluating one rate class for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Evaluation {
    /// Window not yet full; nothing evaluated.
    Accumulating,
    /// Deviation at or below threshold.
    Stable {
        deviation: f64,
        dwell_started: bool,
        /// Centroid gaze direction to probe along. `None` when a probe for
        /// this class is already in flight or the centroid is degenerate.
        probe: Option<Vec3>,
    },
    /// Deviation above threshold.
    Unstable { deviation: f64, saccade_started: bool },
}

impl Evaluation {
    /// Edge event carried by this evaluation, if any.
    pub fn event(&self, class: RateClass) -> Option<DwellEvent> {
        match *self {
            Evaluation::Stable {
                deviation,
                dwell_started: true,
                ..
            } => Some(DwellEvent::DwellStarted { class, deviation }),
            Evaluation::Unstable {
                deviation,
                saccade_started: true,
            } => Some(DwellEvent::SaccadeStarted { class, deviation }),
            _ => None,
        }
    }
}

/// Samples needed to cover `dwell_ms` at `sample_rate_hz`, never fewer than two.
pub fn window_len(dwell_ms: f64, sample_rate_hz: f64) -> usize {
    let n = (dwell_ms / 1000.0 * sample_rate_hz).round();
    if !n.is_finite() || n < MIN_WINDOW_LEN as f64 {
        return MIN_WINDOW_LEN;
    }
    n as usize
}

/// Dwell state for a single rate class. The samples live in the shared
/// [`SampleWindow`] owned by [`DwellMachine`].
#[derive(Clone, Debug)]
pub struct DwellDetector {
    class: RateClass,
    window_len: usize,
    threshold_deg: f64,
    dwelling: bool,
    saccade: bool,
    probe_pending: bool,
}

impl DwellDetector {
    pub fn new(class: RateClass, window_len: usize, threshold_deg: f64) -> Self {
        Self {
            class,
            window_len: window_len.max(MIN_WINDOW_LEN),
            threshold_deg,
            dwelling: false,
            saccade: false,
            probe_pending: false,
        }
    }

    pub fn class(&self) -> RateClass {
        self.class
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn is_dwelling(&self) -> bool {
        self.dwelling
    }

    pub fn is_saccade(&self) -> bool {
        self.saccade
    }

    /// Run the state machine once against the newest samples of `window`.
    pub fn evaluate(&mut self, window: &SampleWindow) -> Evaluation {
        let Some(deviation) = window.deviation_over(self.window_len) else {
            return Evaluation::Accumulating;
        };

        if deviation <= self.threshold_deg {
            self.saccade = false;
            let dwell_started = !self.dwelling;
            self.dwelling = true;
            if dwell_started {
                debug!(class = %self.class, deviation, "dwell started");
            }

            let probe = if self.probe_pending {
                None
            } else {
                let centroid = window.centroid_gaze_over(self.window_len);
                self.probe_pending = centroid.is_some();
                centroid
            };

            Evaluation::Stable {
                deviation,
                dwell_started,
                probe,
            }
        } else {
            let saccade_started = !self.saccade;
            self.saccade = true;
            self.dwelling = false;
            if saccade_started {
                debug!(class = %self.class, deviation, "saccade started");
            }
            Evaluation::Unstable {
                deviation,
                saccade_started,
            }
        }
    }

    /// Close the probe opened by [`evaluate`](Self::evaluate).
    pub fn finish_probe(&mut self) {
        self.probe_pending = false;
    }

    pub fn reset(&mut self) {
        self.dwelling = false;
        self.saccade = false;
        self.probe_pending = false;
    }
}

/// Near and far detectors over one shared window.
#[derive(Clone, Debug)]
pub struct DwellMachine {
    window: SampleWindow,
    /// Indexed by [`RateClass::index`].
    detectors: [DwellDetector; 2],
    /// Ascending window length; near first on a tie.
    order: [RateClass; 2],
}

impl DwellMachine {
    pub fn new(near_len: usize, far_len: usize, threshold_deg: f64) -> Self {
        let detectors = [
            DwellDetector::new(RateClass::Near, near_len, threshold_deg),
            DwellDetector::new(RateClass::Far, far_len, threshold_deg),
        ];
        let order = if detectors[1].window_len() < detectors[0].window_len() {
            [RateClass::Far, RateClass::Near]
        } else {
            [RateClass::Near, RateClass::Far]
        };
        let capacity = detectors[0].window_len().max(detectors[1].window_len());
        Self {
            window: SampleWindow::new(capacity),
            detectors,
            order,
        }
    }

    /// Rate classes in evaluation order.
    pub fn order(&self) -> [RateClass; 2] {
        self.order
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn push(&mut self, sample: Sample) {
        self.window.push(sample);
    }

    pub fn detector(&self, class: RateClass) -> &DwellDetector {
        &self.detectors[class.index()]
    }

    /// Evaluate one class against the shared window.
    pub fn evaluate(&mut self, class: RateClass) -> Evaluation {
        self.detectors[class.index()].evaluate(&self.window)
    }

    /// Close `class`'s probe. A probe that hit anything consumes the shared
    /// window.
    pub fn finish_probe(&mut self, class: RateClass, hit_anything: bool) {
        self.detectors[class.index()].finish_probe();
        if hit_anything {
            self.window.clear();
        }
    }

    /// Shared window capacity, the largest per-class length.
    pub fn capacity(&self) -> usize {
        self.window.capacity()
    }

    pub fn reset(&mut self) {
        self.window.clear();
        for d in &mut self.detectors {
            d.reset();
        }
    }
}
