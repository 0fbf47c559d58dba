//! Engine configuration from TOML. Missing keys take their defaults.

use std::path::Path;

use dwell_core::EngineConfig;
use tracing::info;

use crate::error::Result;

pub fn parse_config(text: &str) -> Result<EngineConfig> {
    let config: EngineConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let text = std::fs::read_to_string(path)?;
    let config = parse_config(&text)?;
    info!(path = %path.display(), policy = %config.exclusivity_policy, "config loaded");
    Ok(config)
}
