//! Gaze dwell detection and landmark feedback engine.
//!
//! Watches a stream of eye gaze / head forward pairs through two sliding
//! windows (near and far), detects when gaze settles (dwell) or jumps
//! (saccade), and on a dwell casts into the scene to find the landmark being
//! looked at. The landmark and its linked counterpart then get highlight or
//! see-through feedback depending on how occluded they are, and that
//! feedback times out after the next saccade.
//!
//! Zero I/O. The host supplies the scene through [`SceneQuery`] and
//! [`EntityRegistry`] and drives everything with [`GazeDwellEngine::tick`].

pub mod accuracy;
pub mod classify;
pub mod config;
pub mod constants;
pub mod counterpart;
pub mod dwell;
pub mod engine;
pub mod events;
pub mod feedback;
pub mod occlusion;
pub mod sample;
pub mod scene;
pub mod synth;
pub mod timer;
pub mod vector;

#[cfg(test)]
mod test_scene;

pub use accuracy::{direction_to, gaze_angle_error_xz};
pub use classify::HitClassifier;
pub use config::{
    ConfigError, DwellTimePreset, EngineConfig, ExclusivityPolicy, LayerConfig, MarkerNames,
};
pub use constants::EPSILON;
pub use counterpart::{CounterpartResolver, LinkRole, NamingConvention};
pub use dwell::{DwellDetector, DwellEvent, DwellMachine, Evaluation, RateClass, window_len};
pub use engine::{FeedbackCounters, GazeDwellEngine, GazeFrame, ProbeReport, TickReport};
pub use events::{EventChannel, ListenerId};
pub use feedback::{
    AppliedFeedback, Arbitration, ArbitrationContext, Countdown, FeedbackArbiter, FeedbackKind,
    FeedbackLedger, FeedbackState, PreviousHits,
};
pub use occlusion::OcclusionEstimator;
pub use sample::{Sample, SampleWindow, compute_deviation};
pub use scene::{EntityId, EntityRegistry, HitRecord, Layer, LayerMask, SceneQuery};
pub use synth::{Fixation, SyntheticGaze};
pub use timer::FeedbackTimer;
pub use vector::{Aabb, Vec3};
