//! Timed deactivation of feedback.
//!
//! Active feedback sits idle until a saccade arms its countdown. Each fixed
//! tick then adds the tick duration; once the deactivate time is reached the
//! entity is handed back for removal and its countdown disarms. A saccade
//! while counting restarts the countdown from zero.

use tracing::debug;

use crate::feedback::FeedbackLedger;
use crate::scene::EntityId;

/// Absorbs float drift from summing many fixed steps.
const ELAPSED_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeedbackTimer {
    deactivate_time: f64,
}

impl FeedbackTimer {
    pub fn new(deactivate_time: f64) -> Self {
        Self { deactivate_time }
    }

    pub fn deactivate_time(&self) -> f64 {
        self.deactivate_time
    }

    /// Arm (or restart) every active feedback countdown. Returns how many.
    pub fn arm(&self, ledger: &mut FeedbackLedger) -> usize {
        let mut armed = 0;
        for (_, countdown) in ledger.countdowns_mut() {
            countdown.armed = true;
            countdown.elapsed = 0.0;
            armed += 1;
        }
        if armed > 0 {
            debug!(armed, "feedback countdowns armed");
        }
        armed
    }

    /// Advance armed countdowns by `dt` seconds. Returns the entities whose
    /// countdown expired, sorted; their countdowns are disarmed.
    pub fn advance(&self, ledger: &mut FeedbackLedger, dt: f64) -> Vec<EntityId> {
        let mut expired = Vec::new();
        for (id, countdown) in ledger.countdowns_mut() {
            if !countdown.armed {
                continue;
            }
            countdown.elapsed += dt;
            if countdown.elapsed + ELAPSED_TOLERANCE >= self.deactivate_time {
                countdown.armed = false;
                countdown.elapsed = 0.0;
                expired.push(id);
            }
        }
        expired.sort();
        expired
    }
}
