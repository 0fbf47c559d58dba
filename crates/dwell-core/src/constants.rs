/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;

/// Default eye tracker sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 200.0;

/// Default dwell time for both rate classes, in milliseconds.
pub const DEFAULT_DWELL_TIME_MS: f64 = 200.0;

/// Default mean angular deviation (degrees) at or below which gaze counts as dwelling.
pub const DEFAULT_DEVIATION_THRESHOLD_DEG: f64 = 0.3;

/// Default distance (scene units) separating near hits from far hits.
pub const DEFAULT_NEAR_FAR_BOUNDARY: f64 = 20.0;

/// Default occlusion ratio below which highlight feedback is preferred.
pub const DEFAULT_OCCLUSION_THRESHOLD: f64 = 0.2;

/// Default lattice divisions per axis for occlusion sampling.
pub const DEFAULT_OCCLUSION_GRID: u32 = 5;

/// Default seconds after a saccade before feedback reverts.
pub const DEFAULT_DEACTIVATE_TIME_SEC: f64 = 2.0;

/// Smallest usable sample window: the deviation needs at least one difference.
pub const MIN_WINDOW_LEN: usize = 2;

/// Name prefix of real-world landmarks.
pub const DEFAULT_REAL_PREFIX: &str = "LandmarkGaze_";

/// Name prefix of map replicas.
pub const DEFAULT_REPLICA_PREFIX: &str = "LandmarkReplicasGaze_";

/// Suffix appended to replica names on instantiation.
pub const DEFAULT_REPLICA_SUFFIX: &str = "(Clone)";

/// Child marker toggled for highlight feedback.
pub const DEFAULT_HIGHLIGHT_MARKER: &str = "Highlight";

/// Child marker shown while see-through feedback is active.
pub const DEFAULT_OUTLINE_MARKER: &str = "Contour";

/// Layer carried by gaze-targetable landmarks at rest.
pub const DEFAULT_TARGET_LAYER: u8 = 8;

/// Layer that renders through occluders.
pub const DEFAULT_SEE_THROUGH_LAYER: u8 = 9;
