//! JSON gaze traces: an array of `{"origin": [..], "gaze": [..], "head": [..]}`.

use std::path::Path;

use dwell_core::GazeFrame;
use tracing::info;

use crate::error::{Result, SceneError};

pub fn parse_trace(text: &str) -> Result<Vec<GazeFrame>> {
    let frames: Vec<GazeFrame> = serde_json::from_str(text)?;
    for (i, f) in frames.iter().enumerate() {
        let finite = [f.origin, f.gaze, f.head]
            .iter()
            .flat_map(|v| v.to_array())
            .all(f64::is_finite);
        if !finite {
            return Err(SceneError::InvalidData(format!(
                "frame {i} has a non-finite component"
            )));
        }
    }
    Ok(frames)
}

pub fn load_trace(path: &Path) -> Result<Vec<GazeFrame>> {
    let text = std::fs::read_to_string(path)?;
    let frames = parse_trace(&text)?;
    info!(path = %path.display(), frames = frames.len(), "trace loaded");
    Ok(frames)
}

pub fn write_trace(path: &Path, frames: &[GazeFrame]) -> Result<()> {
    let text = serde_json::to_string_pretty(frames)?;
    std::fs::write(path, text)?;
    info!(path = %path.display(), frames = frames.len(), "trace written");
    Ok(())
}
