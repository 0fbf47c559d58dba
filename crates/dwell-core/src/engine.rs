//! Tick-driven engine tying dwell detection to feedback.
//!
//! One call to [`GazeDwellEngine::tick`] per fixed host step:
//!
//! 1. advance feedback countdowns armed by earlier saccades, removing
//!    feedback that expired,
//! 2. push the new gaze/head sample,
//! 3. evaluate each rate class in ascending window order, dispatching
//!    dwell/saccade edges (saccades arm the countdowns),
//! 4. for each stable window, cast along the centroid gaze, keep the hits in
//!    that class's distance band and arbitrate feedback for them. Any
//!    in-band hit clears the shared sample window for both classes.
//!
//! Everything runs to completion inside the call. Nothing is queued.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classify::HitClassifier;
use crate::config::{ConfigError, EngineConfig};
use crate::counterpart::CounterpartResolver;
use crate::dwell::{DwellEvent, DwellMachine, Evaluation, RateClass};
use crate::events::{EventChannel, ListenerId};
use crate::feedback::{Arbitration, ArbitrationContext, FeedbackArbiter, FeedbackState, PreviousHits};
use crate::occlusion::OcclusionEstimator;
use crate::sample::Sample;
use crate::scene::{EntityId, EntityRegistry, SceneQuery};
use crate::timer::FeedbackTimer;
use crate::vector::Vec3;

/// Orientation sampled from the host once per fixed tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GazeFrame {
    /// Gaze ray origin; also the viewpoint for occlusion checks.
    pub origin: Vec3,
    pub gaze: Vec3,
    pub head: Vec3,
}

/// Dwell probes that produced feedback, per rate class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackCounters {
    pub near: u32,
    pub far: u32,
}

impl FeedbackCounters {
    pub fn get(&self, class: RateClass) -> u32 {
        match class {
            RateClass::Near => self.near,
            RateClass::Far => self.far,
        }
    }

    fn increment(&mut self, class: RateClass) {
        match class {
            RateClass::Near => self.near = self.near.saturating_add(1),
            RateClass::Far => self.far = self.far.saturating_add(1),
        }
    }
}

/// One scene probe issued by a stable window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub class: RateClass,
    pub direction: Vec3,
    /// Hits inside this class's distance band.
    pub hits: usize,
    pub arbitration: Arbitration,
}

/// Everything that happened during one tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<DwellEvent>,
    pub probes: Vec<ProbeReport>,
    /// Entities whose feedback timed out this tick.
    pub expired: Vec<EntityId>,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        self.events.is_empty() && self.probes.is_empty() && self.expired.is_empty()
    }
}

pub struct GazeDwellEngine {
    config: EngineConfig,
    dwell: DwellMachine,
    classifier: HitClassifier,
    resolver: CounterpartResolver,
    occlusion: OcclusionEstimator,
    arbiter: FeedbackArbiter,
    timer: FeedbackTimer,
    previous: PreviousHits,
    counters: FeedbackCounters,
    events: EventChannel<DwellEvent>,
    last_frame: Option<GazeFrame>,
    ticks: u64,
}

impl GazeDwellEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let dwell = build_dwell(&config);
        info!(
            near_window = config.window_len(RateClass::Near),
            far_window = config.window_len(RateClass::Far),
            policy = %config.exclusivity_policy,
            "gaze dwell engine configured"
        );
        Ok(Self {
            dwell,
            classifier: HitClassifier::new(config.near_far_boundary),
            resolver: CounterpartResolver::new(config.naming.clone()),
            occlusion: OcclusionEstimator::new(config.occlusion_grid_resolution),
            arbiter: FeedbackArbiter::from_config(&config),
            timer: FeedbackTimer::new(config.deactivate_time_sec),
            previous: PreviousHits::new(),
            counters: FeedbackCounters::default(),
            events: EventChannel::new(),
            last_frame: None,
            ticks: 0,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the counterpart map from the current scene contents. Call after
    /// scene setup and whenever landmark sets are swapped.
    pub fn link_scene<R: EntityRegistry + ?Sized>(&mut self, registry: &R) {
        self.resolver.rebuild(registry);
    }

    pub fn resolver(&self) -> &CounterpartResolver {
        &self.resolver
    }

    /// Change dwell durations. Reallocates the sample window and drops in-flight
    /// dwell state, so detection pauses until the windows refill.
    pub fn set_dwell_times(&mut self, near_ms: f64, far_ms: f64) -> Result<(), ConfigError> {
        let candidate = EngineConfig {
            dwell_time_near_ms: near_ms,
            dwell_time_far_ms: far_ms,
            ..self.config.clone()
        };
        self.apply_dwell_config(candidate)
    }

    /// Change the deviation threshold. Resets dwell state like
    /// [`set_dwell_times`](Self::set_dwell_times).
    pub fn set_deviation_threshold(&mut self, threshold_deg: f64) -> Result<(), ConfigError> {
        let candidate = EngineConfig {
            deviation_threshold_deg: threshold_deg,
            ..self.config.clone()
        };
        self.apply_dwell_config(candidate)
    }

    fn apply_dwell_config(&mut self, candidate: EngineConfig) -> Result<(), ConfigError> {
        candidate.validate()?;
        self.config = candidate;
        self.dwell = build_dwell(&self.config);
        self.previous.clear_all();
        info!(
            near_window = self.config.window_len(RateClass::Near),
            far_window = self.config.window_len(RateClass::Far),
            threshold = self.config.deviation_threshold_deg,
            "dwell window reallocated"
        );
        Ok(())
    }

    /// Register a host listener for dwell/saccade edges.
    pub fn subscribe(&mut self, listener: impl FnMut(&DwellEvent) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn counters(&self) -> FeedbackCounters {
        self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = FeedbackCounters::default();
    }

    /// Gaze origin from the latest tick.
    pub fn gaze_origin(&self) -> Option<Vec3> {
        self.last_frame.map(|f| f.origin)
    }

    /// Gaze direction from the latest tick.
    pub fn gaze_direction(&self) -> Option<Vec3> {
        self.last_frame.map(|f| f.gaze)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_dwelling(&self, class: RateClass) -> bool {
        self.dwell.detector(class).is_dwelling()
    }

    pub fn is_saccade(&self, class: RateClass) -> bool {
        self.dwell.detector(class).is_saccade()
    }

    pub fn feedback_state(&self, id: EntityId) -> FeedbackState {
        self.arbiter.state(id)
    }

    pub fn arbiter(&self) -> &FeedbackArbiter {
        &self.arbiter
    }

    pub fn previous_hits(&self) -> &PreviousHits {
        &self.previous
    }

    /// Remove all active feedback from the scene.
    pub fn clear_feedback<S: EntityRegistry + ?Sized>(&mut self, scene: &mut S) -> Vec<EntityId> {
        self.previous.clear_all();
        self.arbiter.clear(scene)
    }

    /// Run one fixed tick. `dt` is the tick duration in seconds.
    pub fn tick<S>(&mut self, scene: &mut S, frame: GazeFrame, dt: f64) -> TickReport
    where
        S: SceneQuery + EntityRegistry + ?Sized,
    {
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            ..Default::default()
        };

        let expired = self.timer.advance(self.arbiter.ledger_mut(), dt);
        for id in &expired {
            self.arbiter.remove(scene, *id);
        }
        report.expired = expired;

        self.last_frame = Some(frame);
        self.dwell.push(Sample::new(frame.gaze, frame.head));

        for class in self.dwell.order() {
            let evaluation = self.dwell.evaluate(class);

            if let Some(event) = evaluation.event(class) {
                if event.is_saccade() {
                    self.timer.arm(self.arbiter.ledger_mut());
                }
                self.events.emit(&event);
                report.events.push(event);
            }

            if let Evaluation::Stable {
                probe: Some(direction),
                ..
            } = evaluation
            {
                let probe = self.probe(scene, class, frame.origin, direction);
                self.dwell.finish_probe(class, probe.hits > 0);
                report.probes.push(probe);
            }
        }

        report
    }

    fn probe<S>(&mut self, scene: &mut S, class: RateClass, origin: Vec3, direction: Vec3) -> ProbeReport
    where
        S: SceneQuery + EntityRegistry + ?Sized,
    {
        let all = scene.cast_all(
            origin,
            direction,
            self.config.gaze_distance(),
            self.config.layers.gaze_mask(),
        );
        let hits = self.classifier.select(&all, class);
        debug!(%class, total = all.len(), in_band = hits.len(), "dwell probe");

        let arbitration = if hits.is_empty() {
            Arbitration::default()
        } else {
            let mut ctx = ArbitrationContext {
                resolver: &mut self.resolver,
                occlusion: &self.occlusion,
                viewpoint: origin,
            };
            self.arbiter
                .arbitrate(scene, &mut ctx, class, &hits, &mut self.previous)
        };
        if !arbitration.applied.is_empty() {
            self.counters.increment(class);
        }

        ProbeReport {
            class,
            direction,
            hits: hits.len(),
            arbitration,
        }
    }
}

fn build_dwell(config: &EngineConfig) -> DwellMachine {
    DwellMachine::new(
        config.window_len(RateClass::Near),
        config.window_len(RateClass::Far),
        config.deviation_threshold_deg,
    )
}
