//! Engine configuration.
//!
//! Every knob is public and serde-visible so a host can load it from a file
//! and override single fields. Missing fields fall back to [`Default`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DEACTIVATE_TIME_SEC, DEFAULT_DEVIATION_THRESHOLD_DEG, DEFAULT_DWELL_TIME_MS,
    DEFAULT_HIGHLIGHT_MARKER, DEFAULT_NEAR_FAR_BOUNDARY, DEFAULT_OCCLUSION_GRID,
    DEFAULT_OCCLUSION_THRESHOLD, DEFAULT_OUTLINE_MARKER, DEFAULT_SAMPLE_RATE_HZ,
    DEFAULT_SEE_THROUGH_LAYER, DEFAULT_TARGET_LAYER,
};
use crate::counterpart::NamingConvention;
use crate::dwell::{RateClass, window_len};
use crate::scene::{Layer, LayerMask};

/// Whether new feedback clears feedback left by the previous dwell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusivityPolicy {
    /// Feedback accumulates.
    #[default]
    Concurrent,
    /// Only feedback that started from a replica hit is cleared.
    #[serde(alias = "exclusive_map")]
    ExclusiveOnReplicas,
    /// All previous feedback is cleared.
    #[serde(alias = "exclusive_all")]
    ExclusiveOnAll,
}

impl ExclusivityPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ExclusivityPolicy::Concurrent => "concurrent",
            ExclusivityPolicy::ExclusiveOnReplicas => "exclusive_on_replicas",
            ExclusivityPolicy::ExclusiveOnAll => "exclusive_on_all",
        }
    }
}

impl fmt::Display for ExclusivityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExclusivityPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "concurrent" => Ok(ExclusivityPolicy::Concurrent),
            "exclusive_on_replicas" | "exclusive_map" => Ok(ExclusivityPolicy::ExclusiveOnReplicas),
            "exclusive_on_all" | "exclusive_all" => Ok(ExclusivityPolicy::ExclusiveOnAll),
            other => Err(ConfigError::UnknownName {
                kind: "exclusivity policy",
                value: other.to_string(),
            }),
        }
    }
}

/// Standard dwell durations used when blocking sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DwellTimePreset {
    Short,
    Medium,
    Long,
}

impl DwellTimePreset {
    pub const ALL: [DwellTimePreset; 3] = [
        DwellTimePreset::Short,
        DwellTimePreset::Medium,
        DwellTimePreset::Long,
    ];

    pub fn millis(self) -> f64 {
        match self {
            DwellTimePreset::Short => 200.0,
            DwellTimePreset::Medium => 500.0,
            DwellTimePreset::Long => 800.0,
        }
    }
}

impl FromStr for DwellTimePreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "short" => Ok(DwellTimePreset::Short),
            "medium" => Ok(DwellTimePreset::Medium),
            "long" => Ok(DwellTimePreset::Long),
            other => Err(ConfigError::UnknownName {
                kind: "dwell time preset",
                value: other.to_string(),
            }),
        }
    }
}

/// Names of the child markers feedback toggles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerNames {
    pub highlight: String,
    pub outline: String,
}

impl Default for MarkerNames {
    fn default() -> Self {
        Self {
            highlight: DEFAULT_HIGHLIGHT_MARKER.to_string(),
            outline: DEFAULT_OUTLINE_MARKER.to_string(),
        }
    }
}

/// Layer assignments for gaze targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Layer landmarks carry at rest.
    pub target: u8,
    /// Layer that renders through occluders.
    pub see_through: u8,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET_LAYER,
            see_through: DEFAULT_SEE_THROUGH_LAYER,
        }
    }
}

impl LayerConfig {
    pub fn target_layer(&self) -> Layer {
        Layer(self.target)
    }

    pub fn see_through_layer(&self) -> Layer {
        Layer(self.see_through)
    }

    /// Gaze casts must still hit a landmark while it is rendered see-through.
    pub fn gaze_mask(&self) -> LayerMask {
        LayerMask::of(&[self.target_layer(), self.see_through_layer()])
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dwell_time_near_ms: f64,
    pub dwell_time_far_ms: f64,
    pub sample_rate_hz: f64,
    pub deviation_threshold_deg: f64,
    pub near_far_boundary: f64,
    /// Gaze cast length; unbounded when absent.
    pub max_gaze_distance: Option<f64>,
    pub occlusion_threshold: f64,
    pub occlusion_grid_resolution: u32,
    pub deactivate_time_sec: f64,
    pub exclusivity_policy: ExclusivityPolicy,
    pub naming: NamingConvention,
    pub markers: MarkerNames,
    pub layers: LayerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dwell_time_near_ms: DEFAULT_DWELL_TIME_MS,
            dwell_time_far_ms: DEFAULT_DWELL_TIME_MS,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            deviation_threshold_deg: DEFAULT_DEVIATION_THRESHOLD_DEG,
            near_far_boundary: DEFAULT_NEAR_FAR_BOUNDARY,
            max_gaze_distance: None,
            occlusion_threshold: DEFAULT_OCCLUSION_THRESHOLD,
            occlusion_grid_resolution: DEFAULT_OCCLUSION_GRID,
            deactivate_time_sec: DEFAULT_DEACTIVATE_TIME_SEC,
            exclusivity_policy: ExclusivityPolicy::default(),
            naming: NamingConvention::default(),
            markers: MarkerNames::default(),
            layers: LayerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Window length for `class` at the configured sample rate.
    pub fn window_len(&self, class: RateClass) -> usize {
        let ms = match class {
            RateClass::Near => self.dwell_time_near_ms,
            RateClass::Far => self.dwell_time_far_ms,
        };
        window_len(ms, self.sample_rate_hz)
    }

    pub fn gaze_distance(&self) -> f64 {
        self.max_gaze_distance.unwrap_or(f64::INFINITY)
    }

    pub fn with_dwell_presets(mut self, near: DwellTimePreset, far: DwellTimePreset) -> Self {
        self.dwell_time_near_ms = near.millis();
        self.dwell_time_far_ms = far.millis();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("sample_rate_hz", self.sample_rate_hz)?;
        positive("dwell_time_near_ms", self.dwell_time_near_ms)?;
        positive("dwell_time_far_ms", self.dwell_time_far_ms)?;
        positive("deactivate_time_sec", self.deactivate_time_sec)?;
        non_negative("deviation_threshold_deg", self.deviation_threshold_deg)?;
        non_negative("near_far_boundary", self.near_far_boundary)?;
        if let Some(d) = self.max_gaze_distance {
            positive("max_gaze_distance", d)?;
        }
        if !(0.0..=1.0).contains(&self.occlusion_threshold) {
            return Err(ConfigError::invalid(
                "occlusion_threshold",
                format!("must be within [0, 1], got {}", self.occlusion_threshold),
            ));
        }
        if self.occlusion_grid_resolution == 0 {
            return Err(ConfigError::invalid("occlusion_grid_resolution", "must be at least 1"));
        }
        if self.layers.target >= 32 || self.layers.see_through >= 32 {
            return Err(ConfigError::invalid("layers", "layer indices must be below 32"));
        }
        if self.layers.target == self.layers.see_through {
            return Err(ConfigError::invalid(
                "layers",
                "see_through must differ from target",
            ));
        }
        if self.naming.real_prefix.is_empty() || self.naming.replica_prefix.is_empty() {
            return Err(ConfigError::invalid("naming", "prefixes must not be empty"));
        }
        if self.naming.real_prefix == self.naming.replica_prefix {
            return Err(ConfigError::invalid(
                "naming",
                "real and replica prefixes must differ",
            ));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be non-negative, got {value}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid { field: &'static str, reason: String },
    UnknownName { kind: &'static str, value: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
            ConfigError::UnknownName { kind, value } => write!(f, "unknown {kind}: {value}"),
        }
    }
}

impl std::error::Error for ConfigError {}
