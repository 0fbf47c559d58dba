//! End-to-end runs: TOML scene → engine ticks driven by synthetic gaze →
//! feedback visible in the scene graph.

use dwell_core::{
    DwellEvent, EngineConfig, EntityId, EntityRegistry, ExclusivityPolicy, FeedbackState,
    Fixation, GazeDwellEngine, Layer, NamingConvention, OcclusionEstimator, RateClass,
    SyntheticGaze, TickReport, Vec3, direction_to, gaze_angle_error_xz,
};
use dwell_scene::{Scene, SceneFile};
use rand::SeedableRng;
use rand::rngs::SmallRng;

const DT: f64 = 0.005;

const SCENE: &str = r#"
[viewpoint]
position = [0.0, 0.0, 0.0]

[[entity]]
name = "LandmarkGaze_1"
center = [-6.0, 0.0, 40.0]
size = [2.0, 2.0, 2.0]
layer = 8
markers = true

[[entity]]
name = "LandmarkGaze_2"
center = [6.0, 0.0, 40.0]
size = [2.0, 2.0, 2.0]
layer = 8
markers = true

[[entity]]
name = "LandmarkGaze_3"
center = [0.0, 0.0, 60.0]
size = [2.0, 2.0, 2.0]
layer = 8
markers = true

[[entity]]
name = "Wall"
center = [0.0, 0.0, 50.0]
size = [4.0, 4.0, 0.5]

[[entity]]
name = "LandmarkReplicasGaze_1(Clone)"
center = [-0.3, -1.0, 2.0]
size = [0.05, 0.05, 0.05]
layer = 8
markers = true

[[entity]]
name = "LandmarkReplicasGaze_2(Clone)"
center = [0.3, -1.0, 2.0]
size = [0.05, 0.05, 0.05]
layer = 8
markers = true

[[entity]]
name = "LandmarkReplicasGaze_3(Clone)"
center = [0.0, -1.0, 2.0]
size = [0.05, 0.05, 0.05]
layer = 8
markers = true
"#;

fn config(policy: ExclusivityPolicy) -> EngineConfig {
    EngineConfig {
        dwell_time_near_ms: 100.0,
        dwell_time_far_ms: 200.0,
        sample_rate_hz: 200.0,
        exclusivity_policy: policy,
        ..Default::default()
    }
}

fn setup(policy: ExclusivityPolicy) -> (Scene, GazeDwellEngine) {
    let cfg = config(policy);
    let scene = SceneFile::parse(SCENE).unwrap().build(&cfg.markers).unwrap();
    let mut engine = GazeDwellEngine::new(cfg).unwrap();
    engine.link_scene(&scene);
    (scene, engine)
}

fn id(scene: &Scene, name: &str) -> EntityId {
    scene.find(name).unwrap()
}

fn center(scene: &Scene, name: &str) -> Vec3 {
    scene.bounds(id(scene, name)).unwrap().center()
}

/// Jitter-free script: alignment is exactly zero while fixating.
fn script(fixations: Vec<Fixation>) -> SyntheticGaze<SmallRng> {
    SyntheticGaze::new(Vec3::ZERO, fixations, SmallRng::seed_from_u64(42))
        .with_jitter(0.0)
        .with_head_lag(10)
}

fn run(
    engine: &mut GazeDwellEngine,
    scene: &mut Scene,
    frames: impl Iterator<Item = dwell_core::GazeFrame>,
) -> Vec<TickReport> {
    frames.map(|f| engine.tick(scene, f, DT)).collect()
}

fn marker_active(scene: &Scene, entity: EntityId, marker: &str) -> bool {
    scene
        .find_child(entity, marker)
        .is_some_and(|m| scene.is_active(m))
}

#[test]
fn visible_landmark_is_highlighted_with_its_replica() {
    let (mut scene, mut engine) = setup(ExclusivityPolicy::Concurrent);
    let l1 = id(&scene, "LandmarkGaze_1");
    let r1 = id(&scene, "LandmarkReplicasGaze_1(Clone)");

    let frames = script(vec![Fixation::new(center(&scene, "LandmarkGaze_1"), 60)]);
    let reports = run(&mut engine, &mut scene, frames);

    let dwells: Vec<&DwellEvent> = reports
        .iter()
        .flat_map(|r| &r.events)
        .filter(|e| !e.is_saccade())
        .collect();
    assert_eq!(dwells.len(), 2, "one dwell per rate class");

    assert!(matches!(engine.feedback_state(l1), FeedbackState::Highlighted(_)));
    assert!(matches!(engine.feedback_state(r1), FeedbackState::Highlighted(_)));
    assert!(marker_active(&scene, l1, "Highlight"));
    assert!(marker_active(&scene, r1, "Highlight"));
    assert!(!marker_active(&scene, l1, "Contour"));
    assert_eq!(engine.counters().far, 1);
    assert_eq!(engine.counters().near, 0);
}

#[test]
fn occluded_landmark_goes_see_through() {
    let (mut scene, mut engine) = setup(ExclusivityPolicy::Concurrent);
    let l3 = id(&scene, "LandmarkGaze_3");
    let r3 = id(&scene, "LandmarkReplicasGaze_3(Clone)");

    let frames = script(vec![Fixation::new(center(&scene, "LandmarkGaze_3"), 60)]);
    let reports = run(&mut engine, &mut scene, frames);

    let applied: Vec<_> = reports
        .iter()
        .flat_map(|r| &r.probes)
        .flat_map(|p| &p.arbitration.applied)
        .collect();
    assert_eq!(applied.len(), 1);
    assert!(applied[0].entity_occlusion > 0.9);
    assert!(applied[0].counterpart_occlusion < 0.2);

    assert!(matches!(engine.feedback_state(l3), FeedbackState::SeeThrough(_)));
    assert!(matches!(engine.feedback_state(r3), FeedbackState::SeeThrough(_)));

    // Real landmark: whole subtree moves. Replica: only itself.
    for e in scene.subtree(l3) {
        assert_eq!(scene.layer(e), Some(Layer(9)));
    }
    assert_eq!(scene.layer(r3), Some(Layer(9)));
    let r3_marker = scene.find_child(r3, "Highlight").unwrap();
    assert_eq!(scene.layer(r3_marker), Some(Layer(0)));

    assert!(marker_active(&scene, l3, "Contour"));
    assert!(marker_active(&scene, r3, "Contour"));
}

#[test]
fn see_through_reverts_two_seconds_after_saccade() {
    let (mut scene, mut engine) = setup(ExclusivityPolicy::Concurrent);
    let l3 = id(&scene, "LandmarkGaze_3");
    let l3_highlight = scene.find_child(l3, "Highlight").unwrap();

    let frames = script(vec![
        Fixation::new(center(&scene, "LandmarkGaze_3"), 60),
        Fixation::new(center(&scene, "LandmarkGaze_1"), 500),
    ]);
    let reports = run(&mut engine, &mut scene, frames);

    let last_saccade = reports
        .iter()
        .filter(|r| r.events.iter().any(|e| e.is_saccade()))
        .map(|r| r.tick)
        .max()
        .unwrap();
    let expiries: Vec<u64> = reports
        .iter()
        .filter(|r| r.expired.contains(&l3))
        .map(|r| r.tick)
        .collect();
    assert_eq!(expiries.len(), 1, "reverts exactly once");

    // 1.9 s = 380 ticks of 5 ms: still see-through at that point
    let elapsed_ticks = expiries[0] - last_saccade;
    assert!(elapsed_ticks > 380, "reverted too early: {elapsed_ticks}");
    assert!(elapsed_ticks <= 401, "reverted too late: {elapsed_ticks}");

    assert_eq!(engine.feedback_state(l3), FeedbackState::None);
    assert_eq!(scene.layer(l3), Some(Layer(8)));
    assert_eq!(scene.layer(l3_highlight), Some(Layer(0)));
    assert!(!marker_active(&scene, l3, "Contour"));
}

#[test]
fn exclusive_on_all_replaces_previous_feedback() {
    let (mut scene, mut engine) = setup(ExclusivityPolicy::ExclusiveOnAll);
    let l1 = id(&scene, "LandmarkGaze_1");
    let r1 = id(&scene, "LandmarkReplicasGaze_1(Clone)");
    let l2 = id(&scene, "LandmarkGaze_2");

    let frames = script(vec![
        Fixation::new(center(&scene, "LandmarkGaze_1"), 60),
        Fixation::new(center(&scene, "LandmarkGaze_2"), 80),
    ]);
    let reports = run(&mut engine, &mut scene, frames);

    let removed: Vec<EntityId> = reports
        .iter()
        .flat_map(|r| &r.probes)
        .flat_map(|p| p.arbitration.removed.clone())
        .collect();
    assert!(removed.contains(&l1) && removed.contains(&r1));

    assert_eq!(engine.feedback_state(l1), FeedbackState::None);
    assert_eq!(engine.feedback_state(r1), FeedbackState::None);
    assert!(!marker_active(&scene, l1, "Highlight"));
    assert!(matches!(engine.feedback_state(l2), FeedbackState::Highlighted(_)));
}

#[test]
fn concurrent_keeps_previous_feedback() {
    let (mut scene, mut engine) = setup(ExclusivityPolicy::Concurrent);
    let l1 = id(&scene, "LandmarkGaze_1");
    let l2 = id(&scene, "LandmarkGaze_2");

    let frames = script(vec![
        Fixation::new(center(&scene, "LandmarkGaze_1"), 60),
        Fixation::new(center(&scene, "LandmarkGaze_2"), 80),
    ]);
    run(&mut engine, &mut scene, frames);

    assert!(matches!(engine.feedback_state(l1), FeedbackState::Highlighted(_)));
    assert!(matches!(engine.feedback_state(l2), FeedbackState::Highlighted(_)));
    assert_eq!(engine.counters().far, 2);
}

#[test]
fn destroyed_counterpart_skips_feedback() {
    let (mut scene, mut engine) = setup(ExclusivityPolicy::Concurrent);
    let l1 = id(&scene, "LandmarkGaze_1");
    scene.despawn(id(&scene, "LandmarkReplicasGaze_1(Clone)"));

    let frames = script(vec![Fixation::new(center(&scene, "LandmarkGaze_1"), 60)]);
    let reports = run(&mut engine, &mut scene, frames);

    let skipped: Vec<EntityId> = reports
        .iter()
        .flat_map(|r| &r.probes)
        .flat_map(|p| p.arbitration.skipped.clone())
        .collect();
    assert_eq!(skipped, vec![l1]);
    assert_eq!(engine.feedback_state(l1), FeedbackState::None);
    assert_eq!(engine.counters().far, 0);
}

#[test]
fn reconfigure_pauses_detection_until_windows_refill() {
    let (mut scene, mut engine) = setup(ExclusivityPolicy::Concurrent);
    let target = center(&scene, "LandmarkGaze_1");
    run(&mut engine, &mut scene, script(vec![Fixation::new(target, 30)]));
    assert!(engine.is_dwelling(RateClass::Near));

    engine.set_dwell_times(50.0, 100.0).unwrap();
    assert!(!engine.is_dwelling(RateClass::Near));

    let reports = run(&mut engine, &mut scene, script(vec![Fixation::new(target, 20)]));
    let first_near = reports
        .iter()
        .position(|r| r.events.iter().any(|e| e.class() == RateClass::Near))
        .unwrap();
    // 50 ms at 200 Hz = 10 samples
    assert_eq!(first_near, 9);
}

#[test]
fn occlusion_ratio_against_scene() {
    let scene = SceneFile::parse(SCENE)
        .unwrap()
        .build(&Default::default())
        .unwrap();
    let est = OcclusionEstimator::new(5);
    let vp = scene.viewpoint();
    assert_eq!(est.occlusion_ratio(&scene, vp, id(&scene, "LandmarkGaze_1")), 0.0);
    assert_eq!(est.occlusion_ratio(&scene, vp, id(&scene, "LandmarkGaze_3")), 1.0);
    // Markers carry no collider
    let marker = scene
        .find_child(id(&scene, "LandmarkGaze_1"), "Highlight")
        .unwrap();
    assert_eq!(est.occlusion_ratio(&scene, vp, marker), 0.0);
}

#[test]
fn gaze_accessors_feed_accuracy_logging() {
    let (mut scene, mut engine) = setup(ExclusivityPolicy::Concurrent);
    let target = center(&scene, "LandmarkGaze_2");
    let frames = SyntheticGaze::new(Vec3::ZERO, vec![Fixation::new(target, 5)], SmallRng::seed_from_u64(1))
        .with_jitter(0.5);
    run(&mut engine, &mut scene, frames);

    let origin = engine.gaze_origin().unwrap();
    let truth = direction_to(origin, target);
    let error = gaze_angle_error_xz(truth, engine.gaze_direction().unwrap());
    // Horizontal projection can stretch the angle very slightly
    assert!(error <= 0.501, "error {error}");
}

#[test]
fn naming_convention_round_trip_on_scene() {
    let naming = NamingConvention::default();
    let replica = naming.counterpart_name("LandmarkGaze_3").unwrap();
    assert_eq!(replica, "LandmarkReplicasGaze_3(Clone)");
    assert_eq!(naming.counterpart_name(&replica).unwrap(), "LandmarkGaze_3");

    let (scene, engine) = setup(ExclusivityPolicy::Concurrent);
    assert_eq!(engine.resolver().len(), 3);
    assert!(scene.find(&replica).is_some());
}
