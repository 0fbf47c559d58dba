//! Reference host for `dwell-core`: an in-memory scene graph plus loaders
//! for scene files, engine config and recorded gaze traces.

pub mod config;
pub mod error;
pub mod format;
pub mod scene;
pub mod trace;

pub use config::{load_config, parse_config};
pub use error::{Result, SceneError};
pub use format::{EntitySpec, SceneFile, ViewpointSpec, load_scene};
pub use scene::Scene;
pub use trace::{load_trace, parse_trace, write_trace};
