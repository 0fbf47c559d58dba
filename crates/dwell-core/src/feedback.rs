//! Feedback arbitration: highlight vs. see-through.
//!
//! When a dwell probe lands on a landmark, both the landmark and its linked
//! counterpart get the same feedback. If both are mostly visible (occlusion
//! below threshold) a child highlight marker is switched on. Otherwise both
//! are moved onto the see-through layer so they render through whatever
//! blocks them, and their outline marker is shown.
//!
//! Before new feedback is applied, the exclusivity policy decides whether
//! feedback from the previous dwell of the same rate class is torn down.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{EngineConfig, ExclusivityPolicy, LayerConfig, MarkerNames};
use crate::counterpart::{CounterpartResolver, LinkRole};
use crate::dwell::RateClass;
use crate::occlusion::OcclusionEstimator;
use crate::scene::{EntityId, EntityRegistry, HitRecord, Layer, SceneQuery};
use crate::vector::Vec3;

/// Deactivation countdown attached to active feedback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    pub armed: bool,
    pub elapsed: f64,
}

/// Per-entity feedback state. An entity is never highlighted and
/// see-through at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedbackState {
    #[default]
    None,
    Highlighted(Countdown),
    SeeThrough(Countdown),
}

impl FeedbackState {
    pub fn kind(&self) -> Option<FeedbackKind> {
        match self {
            FeedbackState::None => None,
            FeedbackState::Highlighted(_) => Some(FeedbackKind::Highlight),
            FeedbackState::SeeThrough(_) => Some(FeedbackKind::SeeThrough),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, FeedbackState::None)
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        match self {
            FeedbackState::None => None,
            FeedbackState::Highlighted(c) | FeedbackState::SeeThrough(c) => Some(c),
        }
    }

    pub fn countdown_mut(&mut self) -> Option<&mut Countdown> {
        match self {
            FeedbackState::None => None,
            FeedbackState::Highlighted(c) | FeedbackState::SeeThrough(c) => Some(c),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Highlight,
    SeeThrough,
}

/// Active feedback keyed by entity. Entities in `None` have no entry.
#[derive(Clone, Debug, Default)]
pub struct FeedbackLedger {
    states: HashMap<EntityId, FeedbackState>,
}

impl FeedbackLedger {
    pub fn get(&self, id: EntityId) -> FeedbackState {
        self.states.get(&id).copied().unwrap_or_default()
    }

    pub fn set(&mut self, id: EntityId, state: FeedbackState) {
        if state.is_none() {
            self.states.remove(&id);
        } else {
            self.states.insert(id, state);
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Entities with active feedback, sorted for deterministic iteration.
    pub fn entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.states.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &FeedbackState)> {
        self.states.iter().map(|(id, s)| (*id, s))
    }

    pub fn countdowns_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut Countdown)> {
        self.states
            .iter_mut()
            .filter_map(|(id, s)| s.countdown_mut().map(|c| (*id, c)))
    }
}

/// Entities hit by the most recent successful dwell, per rate class.
///
/// Owned by the caller and passed into every arbitration, so the arbiter
/// itself holds no cross-call hit history. `version` increases on every
/// change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreviousHits {
    version: u64,
    by_class: [Vec<EntityId>; 2],
}

impl PreviousHits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, class: RateClass) -> &[EntityId] {
        &self.by_class[class.index()]
    }

    pub fn replace(&mut self, class: RateClass, hits: Vec<EntityId>) {
        self.by_class[class.index()] = hits;
        self.version += 1;
    }

    pub fn clear(&mut self, class: RateClass) {
        self.by_class[class.index()].clear();
        self.version += 1;
    }

    pub fn clear_all(&mut self) {
        for v in &mut self.by_class {
            v.clear();
        }
        self.version += 1;
    }
}

/// Feedback applied to one hit and its counterpart.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedFeedback {
    pub entity: EntityId,
    pub counterpart: EntityId,
    pub kind: FeedbackKind,
    pub entity_occlusion: f64,
    pub counterpart_occlusion: f64,
}

/// What one arbitration pass did.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Arbitration {
    /// Entities whose feedback was torn down by the exclusivity policy.
    pub removed: Vec<EntityId>,
    pub applied: Vec<AppliedFeedback>,
    /// Hits skipped because no counterpart resolved.
    pub skipped: Vec<EntityId>,
}

impl Arbitration {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.applied.is_empty() && self.skipped.is_empty()
    }
}

/// Collaborators an arbitration pass borrows from the engine.
pub struct ArbitrationContext<'a> {
    pub resolver: &'a mut CounterpartResolver,
    pub occlusion: &'a OcclusionEstimator,
    pub viewpoint: Vec3,
}

pub struct FeedbackArbiter {
    policy: ExclusivityPolicy,
    occlusion_threshold: f64,
    markers: MarkerNames,
    layers: LayerConfig,
    ledger: FeedbackLedger,
    /// Layers to restore when see-through feedback is removed.
    overrides: HashMap<EntityId, Vec<(EntityId, Layer)>>,
}

impl FeedbackArbiter {
    pub fn new(
        policy: ExclusivityPolicy,
        occlusion_threshold: f64,
        markers: MarkerNames,
        layers: LayerConfig,
    ) -> Self {
        Self {
            policy,
            occlusion_threshold,
            markers,
            layers,
            ledger: FeedbackLedger::default(),
            overrides: HashMap::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.exclusivity_policy,
            config.occlusion_threshold,
            config.markers.clone(),
            config.layers,
        )
    }

    pub fn policy(&self) -> ExclusivityPolicy {
        self.policy
    }

    pub fn ledger(&self) -> &FeedbackLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut FeedbackLedger {
        &mut self.ledger
    }

    pub fn state(&self, id: EntityId) -> FeedbackState {
        self.ledger.get(id)
    }

    /// Arbitrate a single hit. Same as [`arbitrate`](Self::arbitrate) with a
    /// one-element hit set.
    pub fn apply<S>(
        &mut self,
        scene: &mut S,
        ctx: &mut ArbitrationContext<'_>,
        class: RateClass,
        hit: HitRecord,
        previous: &mut PreviousHits,
    ) -> Arbitration
    where
        S: SceneQuery + EntityRegistry + ?Sized,
    {
        self.arbitrate(scene, ctx, class, &[hit], previous)
    }

    /// Run removal, selection and bookkeeping for one dwell's hit set.
    ///
    /// Hits without a counterpart are skipped. If none resolve, nothing is
    /// removed and `previous` is left as it was.
    pub fn arbitrate<S>(
        &mut self,
        scene: &mut S,
        ctx: &mut ArbitrationContext<'_>,
        class: RateClass,
        hits: &[HitRecord],
        previous: &mut PreviousHits,
    ) -> Arbitration
    where
        S: SceneQuery + EntityRegistry + ?Sized,
    {
        let mut report = Arbitration::default();

        let mut resolved = Vec::with_capacity(hits.len());
        for hit in hits {
            match ctx.resolver.resolve(&*scene, hit.entity) {
                Some(counterpart) => resolved.push((hit.entity, counterpart)),
                None => report.skipped.push(hit.entity),
            }
        }
        if resolved.is_empty() {
            return report;
        }

        report.removed = self.removal_pass(scene, ctx.resolver, class, previous);

        let mut touched = HashSet::new();
        for (entity, counterpart) in &resolved {
            if !touched.insert(*entity) || !touched.insert(*counterpart) {
                continue;
            }
            let entity_occlusion = ctx
                .occlusion
                .occlusion_ratio(&*scene, ctx.viewpoint, *entity);
            let counterpart_occlusion =
                ctx.occlusion
                    .occlusion_ratio(&*scene, ctx.viewpoint, *counterpart);

            let kind = self.select_kind(entity_occlusion, counterpart_occlusion);
            match kind {
                FeedbackKind::Highlight => {
                    self.highlight(scene, *entity);
                    self.highlight(scene, *counterpart);
                }
                FeedbackKind::SeeThrough => {
                    let entity_role = ctx.resolver.role(&*scene, *entity);
                    let counterpart_role = ctx.resolver.role(&*scene, *counterpart);
                    self.see_through(scene, *entity, entity_role);
                    self.see_through(scene, *counterpart, counterpart_role);
                }
            }
            debug!(
                %class, %entity, %counterpart, ?kind,
                entity_occlusion, counterpart_occlusion,
                "feedback applied"
            );

            report.applied.push(AppliedFeedback {
                entity: *entity,
                counterpart: *counterpart,
                kind,
                entity_occlusion,
                counterpart_occlusion,
            });
        }

        previous.replace(class, resolved.iter().map(|(e, _)| *e).collect());
        report
    }

    /// Highlight only when both sides of the pair are visible enough;
    /// otherwise both go see-through.
    pub fn select_kind(&self, entity_occlusion: f64, counterpart_occlusion: f64) -> FeedbackKind {
        if entity_occlusion < self.occlusion_threshold && counterpart_occlusion < self.occlusion_threshold {
            FeedbackKind::Highlight
        } else {
            FeedbackKind::SeeThrough
        }
    }

    /// Tear down feedback left by the previous dwell of `class`, per policy.
    fn removal_pass<S>(
        &mut self,
        scene: &mut S,
        resolver: &mut CounterpartResolver,
        class: RateClass,
        previous: &mut PreviousHits,
    ) -> Vec<EntityId>
    where
        S: EntityRegistry + ?Sized,
    {
        let mut removed = Vec::new();
        if self.policy != ExclusivityPolicy::Concurrent {
            for prev in previous.get(class).to_vec() {
                let eligible = match self.policy {
                    ExclusivityPolicy::Concurrent => false,
                    ExclusivityPolicy::ExclusiveOnReplicas => {
                        resolver.role(&*scene, prev) == Some(LinkRole::Replica)
                    }
                    ExclusivityPolicy::ExclusiveOnAll => true,
                };
                if !eligible {
                    continue;
                }
                let counterpart = resolver.resolve(&*scene, prev);
                for id in std::iter::once(prev).chain(counterpart) {
                    if self.remove(scene, id) {
                        removed.push(id);
                    }
                }
            }
        }
        previous.clear(class);
        removed
    }

    /// Switch on the highlight marker. No-op if already highlighted.
    pub fn highlight<S>(&mut self, scene: &mut S, id: EntityId)
    where
        S: EntityRegistry + ?Sized,
    {
        match self.ledger.get(id) {
            FeedbackState::Highlighted(_) => return,
            FeedbackState::SeeThrough(_) => self.revert_see_through(scene, id),
            FeedbackState::None => {}
        }
        match scene.find_child(id, &self.markers.highlight) {
            Some(marker) => {
                if !scene.is_active(marker) {
                    scene.set_active(marker, true);
                }
            }
            None => warn!(entity = %id, marker = %self.markers.highlight, "highlight marker missing"),
        }
        self.ledger
            .set(id, FeedbackState::Highlighted(Countdown::default()));
    }

    /// Move onto the see-through layer and show the outline. Real landmarks
    /// carry the layer down their whole subtree. No-op if already see-through.
    pub fn see_through<S>(&mut self, scene: &mut S, id: EntityId, role: Option<LinkRole>)
    where
        S: EntityRegistry + ?Sized,
    {
        match self.ledger.get(id) {
            FeedbackState::SeeThrough(_) => return,
            FeedbackState::Highlighted(_) => self.hide_marker(scene, id, MarkerKind::Highlight),
            FeedbackState::None => {}
        }

        let targets = if role == Some(LinkRole::Replica) {
            vec![id]
        } else {
            scene.subtree(id)
        };
        let see_through = self.layers.see_through_layer();
        let mut saved = Vec::with_capacity(targets.len());
        for t in targets {
            if let Some(layer) = scene.layer(t) {
                saved.push((t, layer));
            }
            scene.set_layer(t, see_through);
        }
        self.overrides.insert(id, saved);

        match scene.find_child(id, &self.markers.outline) {
            Some(marker) => scene.set_active(marker, true),
            None => warn!(entity = %id, marker = %self.markers.outline, "outline marker missing"),
        }
        self.ledger
            .set(id, FeedbackState::SeeThrough(Countdown::default()));
    }

    /// Remove whatever feedback `id` has. Returns false if it had none.
    pub fn remove<S>(&mut self, scene: &mut S, id: EntityId) -> bool
    where
        S: EntityRegistry + ?Sized,
    {
        match self.ledger.get(id) {
            FeedbackState::None => return false,
            FeedbackState::Highlighted(_) => self.hide_marker(scene, id, MarkerKind::Highlight),
            FeedbackState::SeeThrough(_) => self.revert_see_through(scene, id),
        }
        self.ledger.set(id, FeedbackState::None);
        debug!(entity = %id, "feedback removed");
        true
    }

    /// Remove every active feedback.
    pub fn clear<S>(&mut self, scene: &mut S) -> Vec<EntityId>
    where
        S: EntityRegistry + ?Sized,
    {
        let ids = self.ledger.entities();
        ids.into_iter().filter(|id| self.remove(scene, *id)).collect()
    }

    fn revert_see_through<S>(&mut self, scene: &mut S, id: EntityId)
    where
        S: EntityRegistry + ?Sized,
    {
        match self.overrides.remove(&id) {
            Some(saved) => {
                for (t, layer) in saved {
                    // Skip children destroyed while see-through was active
                    if scene.name(t).is_some() {
                        scene.set_layer(t, layer);
                    }
                }
            }
            None => scene.set_layer(id, self.layers.target_layer()),
        }
        self.hide_marker(scene, id, MarkerKind::Outline);
    }

    fn hide_marker<S>(&self, scene: &mut S, id: EntityId, kind: MarkerKind)
    where
        S: EntityRegistry + ?Sized,
    {
        let name = match kind {
            MarkerKind::Highlight => &self.markers.highlight,
            MarkerKind::Outline => &self.markers.outline,
        };
        if let Some(marker) = scene.find_child(id, name)
            && scene.is_active(marker)
        {
            scene.set_active(marker, false);
        }
    }
}

#[derive(Clone, Copy)]
enum MarkerKind {
    Highlight,
    Outline,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counterpart::NamingConvention;
    use crate::test_scene::MockScene;
    use crate::vector::Aabb;

    const TARGET: u8 = 8;
    const SEE_THROUGH: u8 = 9;

    struct Fixture {
        scene: MockScene,
        resolver: CounterpartResolver,
        occlusion: OcclusionEstimator,
        previous: PreviousHits,
        a: EntityId,
        a_replica: EntityId,
        b: EntityId,
        b_replica: EntityId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut scene = MockScene::new();
            let a = scene.add_landmark("Landmark_1", Vec3::new(-10.0, 0.0, 40.0), 2.0, TARGET);
            let b = scene.add_landmark("Landmark_2", Vec3::new(10.0, 0.0, 40.0), 2.0, TARGET);
            let a_replica = scene.add_landmark(
                "LandmarkReplica_1(Clone)",
                Vec3::new(-0.2, -0.5, 1.0),
                0.1,
                TARGET,
            );
            let b_replica = scene.add_landmark(
                "LandmarkReplica_2(Clone)",
                Vec3::new(0.2, -0.5, 1.0),
                0.1,
                TARGET,
            );
            let mut resolver =
                CounterpartResolver::new(NamingConvention::new("Landmark_", "LandmarkReplica_", "(Clone)"));
            resolver.rebuild(&scene);
            Self {
                scene,
                resolver,
                occlusion: OcclusionEstimator::new(3),
                previous: PreviousHits::new(),
                a,
                a_replica,
                b,
                b_replica,
            }
        }

        fn hit(&self, entity: EntityId) -> HitRecord {
            HitRecord {
                entity,
                distance: 39.0,
                point: Vec3::ZERO,
            }
        }

        fn apply(&mut self, arbiter: &mut FeedbackArbiter, class: RateClass, entity: EntityId) -> Arbitration {
            let hit = self.hit(entity);
            let mut ctx = ArbitrationContext {
                resolver: &mut self.resolver,
                occlusion: &self.occlusion,
                viewpoint: Vec3::ZERO,
            };
            arbiter.apply(&mut self.scene, &mut ctx, class, hit, &mut self.previous)
        }

        fn marker_active(&self, id: EntityId, name: &str) -> bool {
            let m = self.scene.find_child(id, name).unwrap();
            self.scene.is_active(m)
        }
    }

    fn arbiter(policy: ExclusivityPolicy, threshold: f64) -> FeedbackArbiter {
        FeedbackArbiter::new(policy, threshold, MarkerNames::default(), LayerConfig {
            target: TARGET,
            see_through: SEE_THROUGH,
        })
    }

    fn is_highlighted(state: FeedbackState) -> bool {
        matches!(state, FeedbackState::Highlighted(_))
    }

    fn is_see_through(state: FeedbackState) -> bool {
        matches!(state, FeedbackState::SeeThrough(_))
    }

    #[test]
    fn test_visible_pair_highlighted() {
        let mut f = Fixture::new();
        let mut arb = arbiter(ExclusivityPolicy::Concurrent, 0.2);
        let report = f.apply(&mut arb, RateClass::Far, f.a);

        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.applied[0].kind, FeedbackKind::Highlight);
        assert!(is_highlighted(arb.state(f.a)));
        assert!(is_highlighted(arb.state(f.a_replica)));
        assert!(f.marker_active(f.a, "Highlight"));
        assert!(f.marker_active(f.a_replica, "Highlight"));
        assert_eq!(f.previous.get(RateClass::Far), &[f.a]);
    }

    #[test]
    fn test_occluded_counterpart_forces_see_through() {
        let mut f = Fixture::new();
        // Wall in front of the real landmark only
        f.scene.add(
            "Wall",
            Some(Aabb::from_corners(Vec3::new(-30.0, -30.0, 20.0), Vec3::new(-2.0, 30.0, 21.0))),
            0,
        );
        let mut arb = arbiter(ExclusivityPolicy::Concurrent, 0.6);
        let report = f.apply(&mut arb, RateClass::Near, f.a_replica);

        let applied = report.applied[0];
        assert!(applied.entity_occlusion < 0.6);
        assert!(applied.counterpart_occlusion >= 0.6);
        assert_eq!(applied.kind, FeedbackKind::SeeThrough);
        assert!(is_see_through(arb.state(f.a)));
        assert!(is_see_through(arb.state(f.a_replica)));
    }

    #[test]
    fn test_select_kind_needs_both_sides_visible() {
        let arb = arbiter(ExclusivityPolicy::Concurrent, 0.6);
        assert_eq!(arb.select_kind(0.5, 0.9), FeedbackKind::SeeThrough);
        assert_eq!(arb.select_kind(0.9, 0.5), FeedbackKind::SeeThrough);
        assert_eq!(arb.select_kind(0.5, 0.5), FeedbackKind::Highlight);
        assert_eq!(arb.select_kind(0.0, 0.0), FeedbackKind::Highlight);
        // At the threshold counts as occluded
        assert_eq!(arb.select_kind(0.6, 0.0), FeedbackKind::SeeThrough);
    }

    #[test]
    fn test_see_through_propagates_layer_on_real_only() {
        let mut f = Fixture::new();
        let mut arb = arbiter(ExclusivityPolicy::Concurrent, 0.2);
        arb.see_through(&mut f.scene, f.a, Some(LinkRole::Real));
        arb.see_through(&mut f.scene, f.a_replica, Some(LinkRole::Replica));

        for id in f.scene.subtree(f.a) {
            assert_eq!(f.scene.layer(id), Some(Layer(SEE_THROUGH)));
        }
        assert_eq!(f.scene.layer(f.a_replica), Some(Layer(SEE_THROUGH)));
        let replica_marker = f.scene.find_child(f.a_replica, "Highlight").unwrap();
        assert_eq!(f.scene.layer(replica_marker), Some(Layer(0)));
        assert!(f.marker_active(f.a, "Contour"));
    }

    #[test]
    fn test_remove_see_through_restores_layers() {
        let mut f = Fixture::new();
        let mut arb = arbiter(ExclusivityPolicy::Concurrent, 0.2);
        let before: Vec<Option<Layer>> = f.scene.subtree(f.a).iter().map(|id| f.scene.layer(*id)).collect();

        arb.see_through(&mut f.scene, f.a, Some(LinkRole::Real));
        assert!(arb.remove(&mut f.scene, f.a));

        let after: Vec<Option<Layer>> = f.scene.subtree(f.a).iter().map(|id| f.scene.layer(*id)).collect();
        assert_eq!(before, after);
        assert!(!f.marker_active(f.a, "Contour"));
        assert_eq!(arb.state(f.a), FeedbackState::None);
        assert!(!arb.remove(&mut f.scene, f.a));
    }

    #[test]
    fn test_highlight_is_idempotent() {
        let mut f = Fixture::new();
        let mut arb = arbiter(ExclusivityPolicy::Concurrent, 0.2);
        arb.highlight(&mut f.scene, f.a);
        if let Some(c) = arb.ledger_mut().countdowns_mut().next() {
            c.1.armed = true;
        }
        arb.highlight(&mut f.scene, f.a);
        assert_eq!(
            arb.state(f.a),
            FeedbackState::Highlighted(Countdown { armed: true, elapsed: 0.0 })
        );
    }

    #[test]
    fn test_highlight_replaces_see_through() {
        let mut f = Fixture::new();
        let mut arb = arbiter(ExclusivityPolicy::Concurrent, 0.2);
        arb.see_through(&mut f.scene, f.a, Some(LinkRole::Real));
        arb.highlight(&mut f.scene, f.a);
        assert!(is_highlighted(arb.state(f.a)));
        assert_eq!(f.scene.layer(f.a), Some(Layer(TARGET)));
        assert!(!f.marker_active(f.a, "Contour"));
        assert!(f.marker_active(f.a, "Highlight"));
    }

    #[test]
    fn test_exclusive_on_all_clears_previous_pair() {
        let mut f = Fixture::new();
        let mut arb = arbiter(ExclusivityPolicy::ExclusiveOnAll, 0.2);
        f.apply(&mut arb, RateClass::Far, f.a);
        let report = f.apply(&mut arb, RateClass::Far, f.b);

        assert_eq!(report.removed, vec![f.a, f.a_replica]);
        assert_eq!(arb.state(f.a), FeedbackState::None);
        assert_eq!(arb.state(f.a_replica), FeedbackState::None);
        assert!(!f.marker_active(f.a, "Highlight"));
        assert!(is_highlighted(arb.state(f.b)));
        assert!(is_highlighted(arb.state(f.b_replica)));
    }

    #[test]
    fn test_concurrent_keeps_previous_feedback() {
        let mut f = Fixture::new();
        let mut arb = arbiter(ExclusivityPolicy::Concurrent, 0.2);
        f.apply(&mut arb, RateClass::Far, f.a);
        let before = arb.state(f.a);
        let report = f.apply(&mut arb, RateClass::Far, f.b);

        assert!(report.removed.is_empty());
        assert_eq!(arb.state(f.a), before);
        assert!(is_highlighted(arb.state(f.b)));
    }

    #[test]
    fn test_exclusive_on_replicas_only_clears_replica_hits() {
        let mut f = Fixture::new();
        let mut arb = arbiter(ExclusivityPolicy::ExclusiveOnReplicas, 0.2);

        // Previous hit on a real landmark survives
        f.apply(&mut arb, RateClass::Near, f.a);
        let report = f.apply(&mut arb, RateClass::Near, f.b);
        assert!(report.removed.is_empty());
        assert!(is_highlighted(arb.state(f.a)));

        // Previous hit on a replica is torn down with its landmark
        f.apply(&mut arb, RateClass::Near, f.a_replica);
        let report = f.apply(&mut arb, RateClass::Near, f.b);
        assert_eq!(report.removed, vec![f.a_replica, f.a]);
        assert_eq!(arb.state(f.a), FeedbackState::None);
    }

    #[test]
    fn test_removal_scoped_to_rate_class() {
        let mut f = Fixture::new();
        let mut arb = arbiter(ExclusivityPolicy::ExclusiveOnAll, 0.2);
        f.apply(&mut arb, RateClass::Near, f.a);
        f.apply(&mut arb, RateClass::Far, f.b);
        assert!(is_highlighted(arb.state(f.a)));
        assert!(is_highlighted(arb.state(f.b)));
    }

    #[test]
    fn test_unresolved_hit_skips_everything() {
        let mut f = Fixture::new();
        let mut arb = arbiter(ExclusivityPolicy::ExclusiveOnAll, 0.2);
        f.apply(&mut arb, RateClass::Far, f.a);
        let version = f.previous.version();

        let stray = f.scene.add_box("Landmark_9", Vec3::new(0.0, 0.0, 80.0), 2.0, TARGET);
        let report = f.apply(&mut arb, RateClass::Far, stray);

        assert_eq!(report.skipped, vec![stray]);
        assert!(report.applied.is_empty());
        assert!(is_highlighted(arb.state(f.a)));
        assert_eq!(f.previous.version(), version);
    }

    #[test]
    fn test_clear_removes_all() {
        let mut f = Fixture::new();
        let mut arb = arbiter(ExclusivityPolicy::Concurrent, 0.2);
        f.apply(&mut arb, RateClass::Far, f.a);
        f.apply(&mut arb, RateClass::Far, f.b);
        assert_eq!(arb.clear(&mut f.scene).len(), 4);
        assert!(arb.ledger().is_empty());
    }
}
